//! Various utilities functions and types

pub(crate) mod ids;
pub mod signaling;

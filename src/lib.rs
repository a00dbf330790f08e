#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
// Allow acronyms like XWM
#![allow(clippy::upper_case_acronyms)]

//! # xwayland-wm: a minimal X11 window manager for XWayland
//!
//! An XWayland server refuses to accept X11 clients until some X11 client has become its
//! window manager. This crate provides that window manager as a library, for wayland compositors
//! that want to display X11 windows without implementing the full X11 window management protocols.
//!
//! ## Structure of the crate
//!
//! The [`xwayland`] module contains the window manager itself, see [`xwayland::X11Wm`]. It
//! acknowledges X11 configure and map requests as they come, tracks every X11 window and pairs it
//! with the wl_surface XWayland creates for it on the wayland side.
//!
//! ## General principles
//!
//! ### The event loop and state handling
//!
//! The window manager is driven by [`calloop`], a callback-oriented event loop. Instead of keeping
//! its own reference to the compositor state, the [`X11Wm`](xwayland::X11Wm) is stored inside of it,
//! and found again through [`XwmHandler::xwm_state`](xwayland::XwmHandler::xwm_state) whenever the
//! X11 connection becomes readable. The same handler trait notifies the compositor about windows
//! that became displayable or were destroyed.
//!
//! ### Logging
//!
//! This crate makes extensive use of [`tracing`] for its internal logging.
//!
//! For release builds it is recommended to limit the log level during compile time.
//! This can be done by adding a dependency to [`tracing`] and enabling the corresponding features.
//! For example to enable `trace` messages for debug builds, but limit release builds to `debug` add
//! the following in your binary crate `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tracing = { version = "0.1", features = ["max_level_trace", "release_max_level_debug"] }
//! ```
//!
//! If you do not want to use [`tracing`] for your compositor, refer to [`log compatibility`](tracing#log-compatibility)
//! for how to forward the debug output to other `log` compatible frameworks.

pub mod utils;
pub mod xwayland;

pub mod reexports;

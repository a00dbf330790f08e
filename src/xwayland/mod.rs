//! XWayland utilities
//!
//! This module contains helpers to act as the X11 window manager of an already running
//! XWayland instance, in order to support running X11 apps.
//!
//! You need to treat XWayland (and all its X11 apps) as one special client. The X11 side of
//! its connection is handed to an [`X11Wm`], which tracks the X11 windows and tells your
//! [`XwmHandler`] once a window is paired with its wl_surface and ready to be displayed.
//!
//! Launching the XWayland server itself is up to the compositor.
pub mod xwm;

pub use self::xwm::{X11Surface, X11Wm, XwmHandler};

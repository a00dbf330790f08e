use std::sync::{Arc, Mutex};

use tracing::trace;
use x11rb::protocol::xproto::Window as X11Window;

use crate::utils::signaling::OnceSignal;

use super::XwmId;

/// Position and size of an X11 window, in X11 protocol units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Geometry {
    /// x coordinate relative to the parent window
    pub x: i16,
    /// y coordinate relative to the parent window
    pub y: i16,
    /// width in pixels
    pub width: u16,
    /// height in pixels
    pub height: u16,
}

impl Geometry {
    /// Geometry used for windows first seen through a map notification
    pub const PLACEHOLDER: Geometry = Geometry {
        x: 0,
        y: 0,
        width: 1,
        height: 1,
    };
}

/// X11 window tracked by an [`X11Wm`](super::X11Wm)
///
/// This is a cheap handle, clones refer to the same window. `S` is the type of
/// the wayland surface the window gets paired with.
#[derive(Debug)]
pub struct X11Surface<S> {
    xwm: XwmId,
    window: X11Window,
    pub(super) state: Arc<Mutex<SharedSurfaceState<S>>>,
}

#[derive(Debug)]
pub(super) struct SharedSurfaceState<S> {
    geometry: Geometry,
    override_redirect: bool,
    surface_id: Option<u32>,
    // The associated wayland surface, only set while the window is displayable.
    surface: Option<S>,
    destroyed: OnceSignal<X11Window>,
}

impl<S> Clone for X11Surface<S> {
    fn clone(&self) -> Self {
        X11Surface {
            xwm: self.xwm,
            window: self.window,
            state: self.state.clone(),
        }
    }
}

impl<S> PartialEq for X11Surface<S> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.xwm == other.xwm && self.window == other.window && Arc::ptr_eq(&self.state, &other.state)
    }
}

impl<S> X11Surface<S> {
    pub(super) fn new(xwm: XwmId, window: X11Window, geometry: Geometry, override_redirect: bool) -> Self {
        X11Surface {
            xwm,
            window,
            state: Arc::new(Mutex::new(SharedSurfaceState {
                geometry,
                override_redirect,
                surface_id: None,
                surface: None,
                destroyed: OnceSignal::default(),
            })),
        }
    }

    /// Id of the [`X11Wm`](super::X11Wm) tracking this window
    pub fn xwm_id(&self) -> XwmId {
        self.xwm
    }

    /// X11 id of the window
    pub fn window_id(&self) -> X11Window {
        self.window
    }

    /// Last geometry requested by the client or reported by the server
    pub fn geometry(&self) -> Geometry {
        self.state.lock().unwrap().geometry
    }

    /// Whether the window bypasses window manager placement
    pub fn is_override_redirect(&self) -> bool {
        self.state.lock().unwrap().override_redirect
    }

    /// Protocol id of the wayland surface announced for this window, if any
    pub fn surface_id(&self) -> Option<u32> {
        self.state.lock().unwrap().surface_id
    }

    /// Returns `false` once the window was destroyed
    pub fn is_alive(&self) -> bool {
        !self.state.lock().unwrap().destroyed.has_fired()
    }

    /// Register a callback invoked once when this window is destroyed.
    ///
    /// If the window is already gone the callback runs immediately.
    pub fn on_destroy<F>(&self, callback: F)
    where
        F: FnOnce(X11Window) + Send + 'static,
    {
        let late = self
            .state
            .lock()
            .unwrap()
            .destroyed
            .subscribe(move |window| callback(*window));
        if let Some(listener) = late {
            listener(&self.window);
        }
    }

    pub(super) fn set_geometry(&self, geometry: Geometry) {
        self.state.lock().unwrap().geometry = geometry;
    }

    pub(super) fn set_override_redirect(&self, override_redirect: bool) {
        self.state.lock().unwrap().override_redirect = override_redirect;
    }

    pub(super) fn set_surface_id(&self, surface_id: u32) {
        self.state.lock().unwrap().surface_id = Some(surface_id);
    }

    pub(super) fn set_surface(&self, surface: S) {
        self.state.lock().unwrap().surface = Some(surface);
    }

    /// Marks the window dead, drops the paired surface and fires the destroy listeners.
    ///
    /// Returns `false` if the window was destroyed before.
    pub(super) fn destroy(&self) -> bool {
        let listeners = {
            let mut state = self.state.lock().unwrap();
            state.surface = None;
            state.destroyed.take_for_emit()
        };
        let Some(listeners) = listeners else {
            return false;
        };
        trace!(window = self.window, listeners = listeners.len(), "X11 window destroyed");
        for listener in listeners {
            listener(&self.window);
        }
        true
    }
}

impl<S: Clone> X11Surface<S> {
    /// The wayland surface paired with this window.
    ///
    /// Only set while the window is displayable.
    pub fn wl_surface(&self) -> Option<S> {
        self.state.lock().unwrap().surface.clone()
    }
}

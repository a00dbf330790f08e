use std::fmt;

use tracing::trace;
use x11rb::protocol::xproto::Window as X11Window;

use super::{Geometry, X11Surface, XwmId};

/// Lifecycle state of a tracked X11 window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowState {
    /// Created, no wayland surface announced yet
    New,
    /// A wayland surface id was announced, but the surface does not exist yet
    Unpaired,
    /// Paired with its wayland surface
    Displayable,
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WindowState::New => "new",
            WindowState::Unpaired => "unpaired",
            WindowState::Displayable => "displayable",
        })
    }
}

// Displayable windows receive most of the configure and property traffic.
const LOOKUP_ORDER: [WindowState; 3] = [WindowState::Displayable, WindowState::Unpaired, WindowState::New];

/// All windows of an [`X11Wm`](super::X11Wm), one list per [`WindowState`].
///
/// A window id is contained in at most one list at any time.
#[derive(Debug)]
pub(super) struct WindowRegistry<S> {
    xwm: XwmId,
    new: Vec<X11Surface<S>>,
    unpaired: Vec<X11Surface<S>>,
    displayable: Vec<X11Surface<S>>,
}

impl<S> WindowRegistry<S> {
    pub fn new(xwm: XwmId) -> Self {
        WindowRegistry {
            xwm,
            new: Vec::new(),
            unpaired: Vec::new(),
            displayable: Vec::new(),
        }
    }

    fn list(&self, state: WindowState) -> &Vec<X11Surface<S>> {
        match state {
            WindowState::New => &self.new,
            WindowState::Unpaired => &self.unpaired,
            WindowState::Displayable => &self.displayable,
        }
    }

    fn list_mut(&mut self, state: WindowState) -> &mut Vec<X11Surface<S>> {
        match state {
            WindowState::New => &mut self.new,
            WindowState::Unpaired => &mut self.unpaired,
            WindowState::Displayable => &mut self.displayable,
        }
    }

    /// Find a window in any state
    pub fn lookup(&self, window: X11Window) -> Option<(WindowState, &X11Surface<S>)> {
        LOOKUP_ORDER
            .iter()
            .find_map(|state| self.lookup_in(*state, window).map(|surface| (*state, surface)))
    }

    /// Find a window in the given state only
    pub fn lookup_in(&self, state: WindowState, window: X11Window) -> Option<&X11Surface<S>> {
        self.list(state).iter().find(|s| s.window_id() == window)
    }

    /// Find an unpaired window waiting for the surface with the given protocol id
    pub fn find_unpaired(&self, surface_id: u32) -> Option<&X11Surface<S>> {
        self.unpaired.iter().find(|s| s.surface_id() == Some(surface_id))
    }

    /// Windows in the given state, oldest first
    pub fn windows(&self, state: WindowState) -> impl Iterator<Item = &X11Surface<S>> {
        self.list(state).iter()
    }

    /// Number of windows tracked in all states
    pub fn len(&self) -> usize {
        self.new.len() + self.unpaired.len() + self.displayable.len()
    }

    /// Start tracking a new window.
    ///
    /// Returns `None` if the window id is already tracked.
    pub fn create(
        &mut self,
        window: X11Window,
        geometry: Geometry,
        override_redirect: bool,
    ) -> Option<X11Surface<S>> {
        if self.lookup(window).is_some() {
            return None;
        }
        let surface = X11Surface::new(self.xwm, window, geometry, override_redirect);
        self.new.push(surface.clone());
        Some(surface)
    }

    /// Move a window into `new_state`.
    ///
    /// Returns the state the window was in, or `None` if it is not tracked.
    pub fn move_to(&mut self, window: X11Window, new_state: WindowState) -> Option<WindowState> {
        let (old_state, surface) = self.remove(window)?;
        trace!(window, from = %old_state, to = %new_state, "X11 window changed state");
        self.list_mut(new_state).push(surface);
        Some(old_state)
    }

    fn remove(&mut self, window: X11Window) -> Option<(WindowState, X11Surface<S>)> {
        LOOKUP_ORDER.iter().find_map(|state| {
            let list = self.list_mut(*state);
            let pos = list.iter().position(|s| s.window_id() == window)?;
            Some((*state, list.remove(pos)))
        })
    }

    /// Stop tracking a window and fire its destroy notification.
    pub fn destroy(&mut self, window: X11Window) -> Option<X11Surface<S>> {
        let (state, surface) = self.remove(window)?;
        trace!(window, %state, "Destroying X11 window");
        surface.destroy();
        Some(surface)
    }

    /// Destroy every tracked window.
    pub fn clear(&mut self) -> Vec<X11Surface<S>> {
        let mut removed = Vec::with_capacity(self.len());
        for state in [WindowState::Displayable, WindowState::New, WindowState::Unpaired] {
            for surface in self.list_mut(state).drain(..) {
                surface.destroy();
                removed.push(surface);
            }
        }
        removed
    }
}

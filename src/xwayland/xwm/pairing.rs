//! Pairing of X11 windows with the wayland surfaces Xwayland creates for them.
//!
//! Xwayland announces the wl_surface of a window with a `WL_SURFACE_ID` client message
//! on the X11 connection, while the surface itself is created on the wayland socket.
//! Both happen at roughly the same time over different sockets, so either side may
//! be seen first. A window whose surface does not exist yet is parked as
//! [`Unpaired`](WindowState::Unpaired) until [`surface_created`] finds it.

use tracing::{debug, info, warn};
use x11rb::protocol::xproto::Window as X11Window;

use super::{registry::WindowState, X11Surface, XwmHandler, XwmId, XwmSurface};

/// Handle a `WL_SURFACE_ID` client message for `window`.
pub(super) fn surface_id_message<D: XwmHandler>(state: &mut D, xwm: XwmId, window: X11Window, surface_id: u32) {
    let Some(surface) = state
        .xwm_state(xwm)
        .windows
        .lookup_in(WindowState::New, window)
        .cloned()
    else {
        debug!(window, surface_id, "Client message WL_SURFACE_ID but no new window, ignoring");
        return;
    };

    info!(window, surface_id, "X11 window corresponds to wl_surface");
    surface.set_surface_id(surface_id);

    match state.surface_for_id(xwm, surface_id) {
        Some(wl_surface) => map_surface(state, xwm, surface, wl_surface),
        None => {
            state.xwm_state(xwm).windows.move_to(window, WindowState::Unpaired);
        }
    }
}

/// Handle a new wl_surface of the Xwayland client.
///
/// Returns `true` if an unpaired window was waiting for this surface.
pub(super) fn surface_created<D: XwmHandler>(state: &mut D, xwm: XwmId, wl_surface: D::Surface) -> bool {
    let surface_id = wl_surface.protocol_id();
    let Some(surface) = state.xwm_state(xwm).windows.find_unpaired(surface_id).cloned() else {
        return false;
    };

    map_surface(state, xwm, surface, wl_surface);
    // not driven by the X11 event source, so nobody else flushes for us
    if let Err(err) = state.xwm_state(xwm).flush() {
        warn!(?err, "Failed to flush X11 connection");
    }
    true
}

fn map_surface<D: XwmHandler>(state: &mut D, xwm: XwmId, surface: X11Surface<D::Surface>, wl_surface: D::Surface) {
    info!(window = surface.window_id(), ?wl_surface, "Matched X11 window to wl_surface");
    surface.set_surface(wl_surface);
    state
        .xwm_state(xwm)
        .windows
        .move_to(surface.window_id(), WindowState::Displayable);
    state.new_surface(xwm, surface);
}

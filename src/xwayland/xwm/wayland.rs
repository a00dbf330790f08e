use wayland_server::{protocol::wl_surface::WlSurface, Client, DisplayHandle, Resource};

use super::XwmSurface;

impl XwmSurface for WlSurface {
    fn protocol_id(&self) -> u32 {
        self.id().protocol_id()
    }
}

/// The wl_surface of the Xwayland `client` with the given protocol id.
///
/// Meant to back [`XwmHandler::surface_for_id`](super::XwmHandler::surface_for_id).
pub fn xwayland_surface(dh: &DisplayHandle, client: &Client, surface_id: u32) -> Option<WlSurface> {
    client.object_from_protocol_id::<WlSurface>(dh, surface_id).ok()
}

/// Whether `surface` belongs to the Xwayland `client`.
///
/// Surfaces for which this holds should be passed to [`X11Wm::surface_created`](super::X11Wm::surface_created).
pub fn is_xwayland_surface(surface: &WlSurface, client: &Client) -> bool {
    surface.client().map_or(false, |owner| owner.id() == client.id())
}

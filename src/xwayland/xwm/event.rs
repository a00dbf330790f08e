use x11rb::protocol::{
    xproto::{Atom, Window as X11Window},
    Event,
};

/// An X11 event as seen by the window manager.
///
/// Only the events the window manager reacts to are decoded, everything else
/// ends up as [`XwmEvent::Other`] carrying its response type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum XwmEvent {
    /// A window was created
    CreateNotify {
        window: X11Window,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        override_redirect: bool,
    },
    /// A window was destroyed
    DestroyNotify { window: X11Window },
    /// A client asks for a new window geometry
    ConfigureRequest {
        window: X11Window,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
    },
    /// A client asks for a window to be mapped
    MapRequest { window: X11Window },
    /// A window was mapped
    MapNotify {
        window: X11Window,
        override_redirect: bool,
    },
    /// A window was unmapped
    UnmapNotify { window: X11Window },
    /// A property of a window changed
    PropertyNotify { window: X11Window, atom: Atom },
    /// A client message, only 32-bit payloads are of interest
    ClientMessage {
        window: X11Window,
        type_: Atom,
        data: [u32; 5],
    },
    /// Error of an earlier request, that was not checked
    Error {
        error_code: u8,
        sequence: u16,
        major_opcode: u8,
    },
    /// Any event not handled by the window manager
    Other { response_type: u8 },
}

impl From<Event> for XwmEvent {
    fn from(event: Event) -> Self {
        match event {
            Event::CreateNotify(n) => XwmEvent::CreateNotify {
                window: n.window,
                x: n.x,
                y: n.y,
                width: n.width,
                height: n.height,
                override_redirect: n.override_redirect,
            },
            Event::DestroyNotify(n) => XwmEvent::DestroyNotify { window: n.window },
            Event::ConfigureRequest(r) => XwmEvent::ConfigureRequest {
                window: r.window,
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
            },
            Event::MapRequest(r) => XwmEvent::MapRequest { window: r.window },
            Event::MapNotify(n) => XwmEvent::MapNotify {
                window: n.window,
                override_redirect: n.override_redirect,
            },
            Event::UnmapNotify(n) => XwmEvent::UnmapNotify { window: n.window },
            Event::PropertyNotify(n) => XwmEvent::PropertyNotify {
                window: n.window,
                atom: n.atom,
            },
            Event::ClientMessage(msg) => XwmEvent::ClientMessage {
                window: msg.window,
                type_: msg.type_,
                data: msg.data.as_data32(),
            },
            Event::Error(err) => XwmEvent::Error {
                error_code: err.error_code,
                sequence: err.sequence,
                major_opcode: err.major_opcode,
            },
            other => XwmEvent::Other {
                response_type: other.response_type(),
            },
        }
    }
}

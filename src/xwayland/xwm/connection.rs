//! X11 requests issued by the window manager
//!
//! [`XwmConnection`] is the outbound half of the connection to the Xwayland server
//! plus the event queue. It is implemented for [`RustConnection`]; the window manager
//! itself only ever talks to the server through this trait.

use std::fmt;

use x11rb::{
    connection::Connection,
    errors::{ConnectionError, ReplyError, ReplyOrIdError},
    protocol::{
        composite::{self, Redirect},
        xproto::{
            self, Atom, ChangeWindowAttributesAux, ClientMessageEvent, ConfigureWindowAux,
            CreateWindowAux, EventMask, InputFocus, PropMode, Visualid, Window as X11Window, WindowClass,
        },
    },
    rust_connection::RustConnection,
    x11_utils::X11Error,
    COPY_DEPTH_FROM_PARENT, CURRENT_TIME,
};

use super::event::XwmEvent;

/// The parts of the root screen the window manager cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootScreen {
    /// Root window of the screen
    pub root: X11Window,
    /// Visual of the root window
    pub root_visual: Visualid,
}

/// Connection to the X server as used by [`X11Wm`](super::X11Wm)
///
/// Methods returning [`ReplyError`] are checked requests: they wait for the server
/// to acknowledge the request. All others are only queued and need a [`flush`](XwmConnection::flush);
/// errors for those are delivered through the event queue.
pub trait XwmConnection: fmt::Debug {
    /// Screen 0, the only screen Xwayland exposes
    fn root_screen(&self) -> RootScreen;
    /// Allocate a new resource id
    fn generate_id(&self) -> Result<u32, ReplyOrIdError>;
    /// Intern all given atom names.
    ///
    /// All requests are sent before the first reply is awaited. The outer error is a
    /// failure of the connection itself, the inner ones are per-name protocol errors.
    fn intern_atoms(&self, names: &[&str]) -> Result<Vec<Result<Atom, X11Error>>, ConnectionError>;

    /// Change attributes of a window
    fn change_window_attributes(
        &self,
        window: X11Window,
        aux: &ChangeWindowAttributesAux,
    ) -> Result<(), ReplyError>;
    /// Redirect all subwindows of `window` into offscreen storage with manual updates
    fn composite_redirect_subwindows(&self, window: X11Window) -> Result<(), ReplyError>;
    /// Create a 1x1 input-output window at the origin of `parent`
    fn create_window(
        &self,
        window: X11Window,
        parent: X11Window,
        visual: Visualid,
        aux: &CreateWindowAux,
    ) -> Result<(), ReplyError>;
    /// Replace a 32-bit property
    fn change_property32(
        &self,
        window: X11Window,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), ReplyError>;
    /// Claim a selection at the current server time
    fn set_selection_owner(&self, owner: X11Window, selection: Atom) -> Result<(), ReplyError>;
    /// Map a window
    fn map_window(&self, window: X11Window) -> Result<(), ReplyError>;

    /// Queue a configure request
    fn configure_window(&self, window: X11Window, aux: &ConfigureWindowAux) -> Result<(), ConnectionError>;
    /// Queue a client message for `destination`
    fn send_client_message(
        &self,
        destination: X11Window,
        event_mask: EventMask,
        event: ClientMessageEvent,
    ) -> Result<(), ConnectionError>;
    /// Queue an input focus change at the current server time, reverting to pointer root
    fn set_input_focus(&self, window: X11Window) -> Result<(), ConnectionError>;

    /// Send all queued requests to the server
    fn flush(&self) -> Result<(), ConnectionError>;
    /// Fetch and decode the next queued event without blocking
    fn poll_for_event(&self) -> Result<Option<XwmEvent>, ConnectionError>;
}

impl XwmConnection for RustConnection {
    fn root_screen(&self) -> RootScreen {
        let screen = &self.setup().roots[0];
        RootScreen {
            root: screen.root,
            root_visual: screen.root_visual,
        }
    }

    fn generate_id(&self) -> Result<u32, ReplyOrIdError> {
        Connection::generate_id(self)
    }

    fn intern_atoms(&self, names: &[&str]) -> Result<Vec<Result<Atom, X11Error>>, ConnectionError> {
        let cookies = names
            .iter()
            .map(|name| xproto::ConnectionExt::intern_atom(self, false, name.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;

        cookies
            .into_iter()
            .map(|cookie| match cookie.reply() {
                Ok(reply) => Ok(Ok(reply.atom)),
                Err(ReplyError::X11Error(err)) => Ok(Err(err)),
                Err(ReplyError::ConnectionError(err)) => Err(err),
            })
            .collect()
    }

    fn change_window_attributes(
        &self,
        window: X11Window,
        aux: &ChangeWindowAttributesAux,
    ) -> Result<(), ReplyError> {
        xproto::ConnectionExt::change_window_attributes(self, window, aux)?.check()
    }

    fn composite_redirect_subwindows(&self, window: X11Window) -> Result<(), ReplyError> {
        composite::ConnectionExt::composite_redirect_subwindows(self, window, Redirect::MANUAL)?.check()
    }

    fn create_window(
        &self,
        window: X11Window,
        parent: X11Window,
        visual: Visualid,
        aux: &CreateWindowAux,
    ) -> Result<(), ReplyError> {
        xproto::ConnectionExt::create_window(
            self,
            COPY_DEPTH_FROM_PARENT,
            window,
            parent,
            // x, y, width, height, border width
            0,
            0,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            aux,
        )?
        .check()
    }

    fn change_property32(
        &self,
        window: X11Window,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), ReplyError> {
        x11rb::wrapper::ConnectionExt::change_property32(self, PropMode::REPLACE, window, property, type_, data)?
            .check()
    }

    fn set_selection_owner(&self, owner: X11Window, selection: Atom) -> Result<(), ReplyError> {
        xproto::ConnectionExt::set_selection_owner(self, owner, selection, CURRENT_TIME)?.check()
    }

    fn map_window(&self, window: X11Window) -> Result<(), ReplyError> {
        xproto::ConnectionExt::map_window(self, window)?.check()
    }

    fn configure_window(&self, window: X11Window, aux: &ConfigureWindowAux) -> Result<(), ConnectionError> {
        xproto::ConnectionExt::configure_window(self, window, aux)?;
        Ok(())
    }

    fn send_client_message(
        &self,
        destination: X11Window,
        event_mask: EventMask,
        event: ClientMessageEvent,
    ) -> Result<(), ConnectionError> {
        xproto::ConnectionExt::send_event(self, false, destination, event_mask, event)?;
        Ok(())
    }

    fn set_input_focus(&self, window: X11Window) -> Result<(), ConnectionError> {
        xproto::ConnectionExt::set_input_focus(self, InputFocus::POINTER_ROOT, window, CURRENT_TIME)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), ConnectionError> {
        Connection::flush(self)
    }

    fn poll_for_event(&self) -> Result<Option<XwmEvent>, ConnectionError> {
        Ok(Connection::poll_for_event(self)?.map(XwmEvent::from))
    }
}


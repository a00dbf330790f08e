//!
//! Xwayland Window Manager module
//!
//! Provides an [`X11Wm`] type, which registers itself as the window manager of an already running
//! Xwayland instance and pairs its X11 windows with the wayland surfaces Xwayland creates for them.
//!
//! The compositor hands over the X11 side of the Xwayland connection, and stores the returned
//! [`X11Wm`] in its state, where the [`XwmHandler`] implementation can find it again.
//!
//! ```no_run
//! #  use std::os::unix::net::UnixStream;
//! #  use xwayland_wm::xwayland::{X11Wm, X11Surface, XwmHandler, xwm::{XwmId, XwmSurface}};
//! #  #[derive(Debug, Clone)]
//! #  struct Surface(u32);
//! #  impl XwmSurface for Surface {
//! #      fn protocol_id(&self) -> u32 { self.0 }
//! #  }
//! #
//! struct State { wm: Option<X11Wm<Surface>>, /* ... */ }
//! impl XwmHandler for State {
//!     type Surface = Surface;
//!
//!     fn xwm_state(&mut self, xwm: XwmId) -> &mut X11Wm<Surface> {
//!         self.wm.as_mut().unwrap()
//!     }
//!     fn surface_for_id(&mut self, xwm: XwmId, surface_id: u32) -> Option<Surface> {
//!         // look up the surface of the Xwayland client by its protocol id
//! #       None
//!     }
//!     fn new_surface(&mut self, xwm: XwmId, window: X11Surface<Surface>) { /* map it */ }
//! }
//! #
//! # let handle: xwayland_wm::reexports::calloop::LoopHandle<'static, State> = unreachable!();
//! # let connection: UnixStream = unreachable!();
//!
//! let wm = X11Wm::start_wm(handle, connection).expect("Failed to attach X11 Window Manager");
//! // store the WM in `State`
//! ```
//!
//! Whenever the Xwayland client creates a wl_surface, pass it to [`X11Wm::surface_created`], so
//! windows that were announced before their surface existed get paired.

use std::{fmt, os::unix::net::UnixStream, panic::Location, sync::Arc};

use calloop::{
    generic::Generic,
    ping::{make_ping, Ping},
    Interest, LoopHandle, Mode, PostAction,
};
use tracing::{debug, error, info, trace, trace_span, warn};
use x11rb::{
    errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError},
    protocol::xproto::{
        AtomEnum, ChangeWindowAttributesAux, ClientMessageEvent, ConfigureWindowAux, CreateWindowAux,
        EventMask, StackMode, Window as X11Window,
    },
    rust_connection::{DefaultStream, RustConnection},
    CURRENT_TIME,
};

use crate::utils::ids::id_type;

mod atoms;
mod connection;
mod event;
mod pairing;
mod registry;
mod surface;
#[cfg(test)]
pub(crate) mod testing;
#[cfg(feature = "wayland_frontend")]
mod wayland;

pub use self::atoms::Atoms;
pub use self::connection::{RootScreen, XwmConnection};
pub use self::event::XwmEvent;
pub use self::registry::WindowState;
pub use self::surface::{Geometry, X11Surface};
#[cfg(feature = "wayland_frontend")]
pub use self::wayland::{is_xwayland_surface, xwayland_surface};

use self::registry::WindowRegistry;

id_type! {
    /// Id of an X11 WM
    pub struct XwmId;
}

/// Wayland surface an X11 window can be paired with
pub trait XwmSurface: Clone + fmt::Debug + Send + 'static {
    /// Protocol id of the surface, as announced by Xwayland in `WL_SURFACE_ID`
    fn protocol_id(&self) -> u32;
}

/// Handler trait for X11Wm interactions
pub trait XwmHandler {
    /// Type of the wayland surfaces windows are paired with
    type Surface: XwmSurface;

    /// [`X11Wm`] corresponding to the given [`XwmId`].
    fn xwm_state(&mut self, xwm: XwmId) -> &mut X11Wm<Self::Surface>;

    /// Surface of the Xwayland client with the given protocol id, if it exists yet.
    fn surface_for_id(&mut self, xwm: XwmId, surface_id: u32) -> Option<Self::Surface>;

    /// A window was paired with its wayland surface and can be displayed.
    fn new_surface(&mut self, xwm: XwmId, window: X11Surface<Self::Surface>);

    /// A window was destroyed or unmapped and is no longer tracked.
    fn destroyed_window(&mut self, xwm: XwmId, window: X11Surface<Self::Surface>) {
        let _ = (xwm, window);
    }
}

/// Errors when starting an [`X11Wm`]
#[derive(Debug, thiserror::Error)]
pub enum XwmError {
    /// The connection socket could not be duplicated
    #[error("Failed to duplicate the X11 connection: {0}")]
    Io(#[from] std::io::Error),
    /// Connecting to the X server failed
    #[error("Failed to connect to the X server: {0}")]
    Connect(#[from] ConnectError),
    /// The connection broke down during startup
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// The window manager window could not be allocated
    #[error("Failed to allocate the window manager window: {0}")]
    Id(#[from] ReplyOrIdError),
    /// The event source could not be inserted into the event loop
    #[error("Failed to insert the X11 event source: {0}")]
    EventLoop(#[source] calloop::Error),
}

struct EventSource(Box<dyn FnOnce()>);

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventSource").finish_non_exhaustive()
    }
}

/// The runtime state of the XWayland window manager.
#[derive(Debug)]
pub struct X11Wm<S> {
    id: XwmId,
    conn: Arc<dyn XwmConnection>,
    screen: RootScreen,
    wm_window: X11Window,
    atoms: Atoms,
    windows: WindowRegistry<S>,
    source: Option<EventSource>,
    wakeup: Option<Ping>,
}

impl<S> Drop for X11Wm<S> {
    fn drop(&mut self) {
        if let Some(EventSource(remove)) = self.source.take() {
            remove();
        }
        let windows = self.windows.clear();
        debug!(xwm = ?self.id, windows = windows.len(), "X11 WM stopped");
        self.id.release();
    }
}

impl<S> X11Wm<S> {
    /// Id of this window manager
    pub fn id(&self) -> XwmId {
        self.id
    }

    /// Window used to own the window manager selections
    pub fn wm_window(&self) -> X11Window {
        self.wm_window
    }

    /// Root screen managed by this window manager
    pub fn root_screen(&self) -> RootScreen {
        self.screen
    }

    /// Atoms resolved at startup
    pub fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    /// Tracked window with the given id, in any state
    pub fn window(&self, window: X11Window) -> Option<&X11Surface<S>> {
        self.windows.lookup(window).map(|(_, surface)| surface)
    }

    /// Lifecycle state of a tracked window
    pub fn window_state(&self, window: X11Window) -> Option<WindowState> {
        self.windows.lookup(window).map(|(state, _)| state)
    }

    /// All tracked windows in the given state, oldest first
    pub fn windows(&self, state: WindowState) -> impl Iterator<Item = &X11Surface<S>> {
        self.windows.windows(state)
    }

    /// Give input focus to `window` and raise it to the top of the stack.
    ///
    /// The window is offered `WM_TAKE_FOCUS` as well, for clients that manage focus themselves.
    pub fn activate(&self, window: &X11Surface<S>) -> Result<(), ConnectionError> {
        let id = window.window_id();
        let event = ClientMessageEvent::new(
            32,
            id,
            self.atoms.WM_PROTOCOLS,
            [self.atoms.WM_TAKE_FOCUS, CURRENT_TIME, 0, 0, 0],
        );

        let result = (|| {
            self.conn
                .send_client_message(id, EventMask::SUBSTRUCTURE_REDIRECT, event)?;
            self.conn.set_input_focus(id)?;
            self.conn
                .configure_window(id, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
            self.flush()
        })();
        match &result {
            Ok(()) => debug!(window = id, "Activated X11 window"),
            Err(err) => warn!(window = id, ?err, "Failed to activate X11 window"),
        }
        result
    }

    /// Wake up `ping` whenever events may be waiting that the connection fd will not signal.
    ///
    /// Flushing outside of [`X11Wm::dispatch_events`] can read events off the socket into the
    /// connection's queue. Hosts using [`X11Wm::with_connection`] should run
    /// [`X11Wm::dispatch_events`] from the source of `ping`. [`X11Wm::start_wm`] sets this up itself.
    pub fn set_wakeup(&mut self, ping: Ping) {
        self.wakeup = Some(ping);
    }

    /// Flush outside of event dispatching, and schedule a drain for events read meanwhile.
    pub(super) fn flush(&self) -> Result<(), ConnectionError> {
        let result = self.conn.flush();
        if let Some(ping) = &self.wakeup {
            ping.ping();
        }
        result
    }
}

impl<S: XwmSurface> X11Wm<S> {
    /// Start a new window manager on the X11 side of an Xwayland connection.
    ///
    /// Incoming events are dispatched from the given event loop until the returned
    /// [`X11Wm`] is dropped, or the connection fails.
    pub fn start_wm<D>(handle: LoopHandle<'static, D>, connection: UnixStream) -> Result<Self, XwmError>
    where
        D: XwmHandler<Surface = S> + 'static,
    {
        // Xwayland only uses screen 0.
        let readiness = connection.try_clone()?;
        let stream = DefaultStream::from_unix_stream(connection)?.0;
        let conn = RustConnection::connect_to_stream(stream, 0)?;
        let mut wm = Self::with_connection(Arc::new(conn))?;
        let id = wm.id;

        let fd_token = handle
            .insert_source(
                Generic::new(readiness, Interest::READ, Mode::Level),
                move |_, _, data: &mut D| match X11Wm::<S>::dispatch_events(data, id) {
                    Ok(_) => Ok(PostAction::Continue),
                    Err(err) => {
                        error!(xwm = ?id, ?err, "X11 connection failed, no longer dispatching events");
                        Ok(PostAction::Remove)
                    }
                },
            )
            .map_err(|err| XwmError::EventLoop(err.error))?;

        // Events x11rb already read into its queue never make the fd readable again.
        let (ping, ping_source) = make_ping()?;
        let ping_token = handle.insert_source(ping_source, move |_, _, data: &mut D| {
            if let Err(err) = X11Wm::<S>::dispatch_events(data, id) {
                error!(xwm = ?id, ?err, "X11 connection failed");
            }
        });
        let ping_token = match ping_token {
            Ok(token) => token,
            Err(err) => {
                handle.remove(fd_token);
                return Err(XwmError::EventLoop(err.error));
            }
        };

        let remover = handle.clone();
        wm.source = Some(EventSource(Box::new(move || {
            remover.remove(fd_token);
            remover.remove(ping_token);
        })));

        // Replies awaited during startup may have pulled events off the socket already.
        ping.ping();
        wm.set_wakeup(ping);

        Ok(wm)
    }

    /// Become the window manager over an already established connection.
    ///
    /// Events are not read by this method, the caller has to run [`X11Wm::dispatch_events`]
    /// whenever the connection becomes readable.
    pub fn with_connection(conn: Arc<dyn XwmConnection>) -> Result<Self, XwmError> {
        let atoms = Atoms::resolve_all(&*conn)?;
        let screen = conn.root_screen();
        let wm_window = init_wm(&*conn, screen, &atoms)?;

        let id = XwmId::next();
        info!(xwm = ?id, root = screen.root, wm_window, "X11 WM started");
        Ok(X11Wm {
            id,
            conn,
            screen,
            wm_window,
            atoms,
            windows: WindowRegistry::new(id),
            source: None,
            wakeup: None,
        })
    }

    /// Handle all events currently queued on the connection, then flush.
    ///
    /// The connection is flushed once, unless flushing read further events, which are
    /// handled and flushed again. Returns the number of handled events. An error means
    /// the connection is unusable.
    pub fn dispatch_events<D>(state: &mut D, xwm: XwmId) -> Result<usize, ConnectionError>
    where
        D: XwmHandler<Surface = S>,
    {
        let _span = trace_span!("xwm", id = ?xwm).entered();
        let conn = state.xwm_state(xwm).conn.clone();

        let mut count = 0;
        loop {
            while let Some(event) = conn.poll_for_event()? {
                count += 1;
                handle_event(state, xwm, event);
            }
            conn.flush()?;
            let Some(event) = conn.poll_for_event()? else {
                break;
            };
            count += 1;
            handle_event(state, xwm, event);
        }
        trace!(events = count, "Dispatched X11 events");
        Ok(count)
    }

    /// Notify the window manager about a new wl_surface of the Xwayland client.
    ///
    /// Returns `true` if a window was waiting for this surface and is now displayable.
    pub fn surface_created<D>(state: &mut D, xwm: XwmId, surface: S) -> bool
    where
        D: XwmHandler<Surface = S>,
    {
        pairing::surface_created(state, xwm, surface)
    }
}

fn init_wm(conn: &dyn XwmConnection, screen: RootScreen, atoms: &Atoms) -> Result<X11Window, XwmError> {
    let win = conn.generate_id()?;

    // Actually become the WM by redirecting some operations
    check(conn.change_window_attributes(
        screen.root,
        &ChangeWindowAttributesAux::new().event_mask(
            EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT | EventMask::PROPERTY_CHANGE,
        ),
    ));
    check(conn.composite_redirect_subwindows(screen.root));

    check(conn.create_window(
        win,
        screen.root,
        screen.root_visual,
        &CreateWindowAux::new().event_mask(EventMask::PROPERTY_CHANGE),
    ));
    check(conn.change_property32(
        screen.root,
        atoms._NET_SUPPORTED,
        AtomEnum::ATOM.into(),
        &[atoms._NET_WM_STATE],
    ));

    // Xwayland accepts no X11 clients before somebody owns WM_S0.
    check(conn.set_selection_owner(win, atoms.WM_S0));
    check(conn.set_selection_owner(win, atoms._NET_WM_S0));

    conn.flush()?;
    Ok(win)
}

/// Log the failure of a checked request at the caller's location.
#[track_caller]
fn check(result: Result<(), ReplyError>) {
    let Err(err) = result else {
        return;
    };
    let location = Location::caller();
    match err {
        ReplyError::X11Error(err) => error!(
            at = %location,
            error_code = err.error_code,
            major_opcode = err.major_opcode,
            "X11 request failed"
        ),
        ReplyError::ConnectionError(err) => error!(at = %location, ?err, "X11 request failed"),
    }
}

fn handle_event<D: XwmHandler>(state: &mut D, id: XwmId, event: XwmEvent) {
    let xwm = state.xwm_state(id);
    trace!(?event, "X11: Got event");

    match event {
        XwmEvent::CreateNotify {
            window,
            x,
            y,
            width,
            height,
            override_redirect,
        } => {
            let geometry = Geometry { x, y, width, height };
            if xwm.windows.create(window, geometry, override_redirect).is_some() {
                debug!(window, ?geometry, override_redirect, "New X11 window");
            } else {
                warn!(window, "CreateNotify for an already tracked window, ignoring");
            }
        }
        XwmEvent::DestroyNotify { window } => {
            debug!(window, "X11 window destroyed");
            forget_window(state, id, window);
        }
        XwmEvent::UnmapNotify { window } => {
            debug!(window, "X11 window unmapped");
            forget_window(state, id, window);
        }
        XwmEvent::ConfigureRequest {
            window,
            x,
            y,
            width,
            height,
        } => {
            let Some((_, surface)) = xwm.windows.lookup(window) else {
                debug!(window, "ConfigureRequest for an unknown window, ignoring");
                return;
            };
            surface.set_geometry(Geometry { x, y, width, height });

            // Grant the request as is
            let aux = ConfigureWindowAux::new()
                .x(i32::from(x))
                .y(i32::from(y))
                .width(u32::from(width))
                .height(u32::from(height))
                .border_width(0);
            if let Err(err) = xwm.conn.configure_window(window, &aux) {
                warn!(window, ?err, "Failed to acknowledge configure request");
            }
        }
        XwmEvent::MapRequest { window } => {
            debug!(window, "X11 window requests to be mapped");
            check(xwm.conn.change_window_attributes(
                window,
                &ChangeWindowAttributesAux::new().event_mask(EventMask::FOCUS_CHANGE | EventMask::PROPERTY_CHANGE),
            ));
            check(xwm.conn.map_window(window));
        }
        XwmEvent::MapNotify {
            window,
            override_redirect,
        } => match xwm.windows.lookup(window) {
            Some((_, surface)) => surface.set_override_redirect(override_redirect),
            None => {
                // mapped without us ever seeing it being created
                debug!(window, override_redirect, "MapNotify for an unknown window");
                xwm.windows.create(window, Geometry::PLACEHOLDER, override_redirect);
            }
        },
        XwmEvent::PropertyNotify { window, atom } => {
            trace!(window, atom, "X11 window property changed");
        }
        XwmEvent::ClientMessage { window, type_, data } => {
            if Atoms::matches(xwm.atoms.WL_SURFACE_ID, type_) {
                pairing::surface_id_message(state, id, window, data[0]);
            } else {
                trace!(window, type_, "Unhandled client message");
            }
        }
        XwmEvent::Error {
            error_code,
            sequence,
            major_opcode,
        } => {
            warn!(error_code, sequence, major_opcode, "X11 request failed");
        }
        XwmEvent::Other { response_type } => {
            trace!(response_type, "Ignoring X11 event");
        }
    }
}

fn forget_window<D: XwmHandler>(state: &mut D, id: XwmId, window: X11Window) {
    if let Some(surface) = state.xwm_state(id).windows.destroy(window) {
        state.destroyed_window(id, surface);
    }
}

//! In-memory X server connection and handler used by the unit tests.

use std::{
    cell::RefCell,
    collections::VecDeque,
    sync::{Arc, Once},
};

use x11rb::{
    errors::{ConnectionError, ReplyError, ReplyOrIdError},
    protocol::{
        xproto::{
            Atom, ChangeWindowAttributesAux, ClientMessageEvent, ConfigureWindowAux, CreateWindowAux, EventMask,
            Visualid, Window as X11Window,
        },
        ErrorKind,
    },
    x11_utils::X11Error,
};

use super::{RootScreen, X11Surface, X11Wm, XwmConnection, XwmError, XwmEvent, XwmHandler, XwmId, XwmSurface};

const ROOT: RootScreen = RootScreen {
    root: 0x100,
    root_visual: 0x21,
};
const FIRST_ATOM: Atom = 300;
const FIRST_ID: u32 = 0x20_0000;

/// A request sent to the [`MockConnection`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Request {
    ChangeWindowAttributes {
        window: X11Window,
        event_mask: Option<EventMask>,
    },
    CompositeRedirectSubwindows {
        window: X11Window,
    },
    CreateWindow {
        window: X11Window,
        parent: X11Window,
        visual: Visualid,
        event_mask: Option<EventMask>,
    },
    ChangeProperty32 {
        window: X11Window,
        property: Atom,
        type_: Atom,
        data: Vec<u32>,
    },
    SetSelectionOwner {
        owner: X11Window,
        selection: Atom,
    },
    MapWindow {
        window: X11Window,
    },
    ConfigureWindow {
        window: X11Window,
        aux: ConfigureWindowAux,
    },
    SendEvent {
        destination: X11Window,
        event_mask: EventMask,
        type_: Atom,
        data: [u32; 5],
    },
    SetInputFocus {
        window: X11Window,
    },
}

#[derive(Debug, Default)]
struct MockState {
    requests: Vec<Request>,
    events: VecDeque<XwmEvent>,
    read_on_flush: Vec<XwmEvent>,
    interned: Vec<String>,
    failing_atoms: Vec<String>,
    failing_windows: Vec<X11Window>,
    broken: bool,
    flushes: usize,
    next_id: u32,
}

/// Records every request and replays queued events
#[derive(Debug, Default)]
pub(crate) struct MockConnection {
    state: RefCell<MockState>,
}

fn x11_error(error_kind: ErrorKind, error_code: u8, bad_value: u32) -> X11Error {
    X11Error {
        error_kind,
        error_code,
        sequence: 0,
        bad_value,
        minor_opcode: 0,
        major_opcode: 0,
        extension_name: None,
        request_name: None,
    }
}

impl MockConnection {
    /// Atom names in the order they were interned
    pub fn interned(&self) -> Vec<String> {
        self.state.borrow().interned.clone()
    }

    /// Atom values handed out for the given names
    pub fn atom_values(&self, names: &[&str]) -> Vec<Atom> {
        let state = self.state.borrow();
        names
            .iter()
            .map(|name| {
                let pos = state.interned.iter().position(|interned| interned == name).unwrap();
                FIRST_ATOM + pos as Atom
            })
            .collect()
    }

    /// Make interning `name` fail with BadAtom
    pub fn fail_atom(&self, name: &str) {
        self.state.borrow_mut().failing_atoms.push(name.to_owned());
    }

    /// Make checked requests on `window` fail with BadWindow
    pub fn fail_window(&self, window: X11Window) {
        self.state.borrow_mut().failing_windows.push(window);
    }

    /// Make every following call fail
    pub fn break_connection(&self) {
        self.state.borrow_mut().broken = true;
    }

    pub fn push_events(&self, events: impl IntoIterator<Item = XwmEvent>) {
        self.state.borrow_mut().events.extend(events);
    }

    /// Queue `events` as if the next flush had read them off the socket
    pub fn read_on_flush(&self, events: impl IntoIterator<Item = XwmEvent>) {
        self.state.borrow_mut().read_on_flush.extend(events);
    }

    pub fn take_requests(&self) -> Vec<Request> {
        std::mem::take(&mut self.state.borrow_mut().requests)
    }

    pub fn flushes(&self) -> usize {
        self.state.borrow().flushes
    }

    pub fn root_screen_value(&self) -> RootScreen {
        ROOT
    }

    fn unchecked(&self, request: Request) -> Result<(), ConnectionError> {
        let mut state = self.state.borrow_mut();
        if state.broken {
            return Err(ConnectionError::UnknownError);
        }
        state.requests.push(request);
        Ok(())
    }

    fn checked(&self, window: X11Window, request: Request) -> Result<(), ReplyError> {
        self.unchecked(request)?;
        if self.state.borrow().failing_windows.contains(&window) {
            // BadWindow
            return Err(ReplyError::X11Error(x11_error(ErrorKind::Window, 3, window)));
        }
        Ok(())
    }
}

impl XwmConnection for MockConnection {
    fn root_screen(&self) -> RootScreen {
        ROOT
    }

    fn generate_id(&self) -> Result<u32, ReplyOrIdError> {
        let mut state = self.state.borrow_mut();
        if state.broken {
            return Err(ConnectionError::UnknownError.into());
        }
        let id = FIRST_ID + state.next_id;
        state.next_id += 1;
        Ok(id)
    }

    fn intern_atoms(&self, names: &[&str]) -> Result<Vec<Result<Atom, X11Error>>, ConnectionError> {
        let mut state = self.state.borrow_mut();
        if state.broken {
            return Err(ConnectionError::UnknownError);
        }
        let mut replies = Vec::with_capacity(names.len());
        for name in names {
            let atom = FIRST_ATOM + state.interned.len() as Atom;
            state.interned.push((*name).to_owned());
            if state.failing_atoms.iter().any(|failing| failing == name) {
                // BadAtom
                replies.push(Err(x11_error(ErrorKind::Atom, 5, 0)));
            } else {
                replies.push(Ok(atom));
            }
        }
        Ok(replies)
    }

    fn change_window_attributes(
        &self,
        window: X11Window,
        aux: &ChangeWindowAttributesAux,
    ) -> Result<(), ReplyError> {
        self.checked(
            window,
            Request::ChangeWindowAttributes {
                window,
                event_mask: aux.event_mask,
            },
        )
    }

    fn composite_redirect_subwindows(&self, window: X11Window) -> Result<(), ReplyError> {
        self.checked(window, Request::CompositeRedirectSubwindows { window })
    }

    fn create_window(
        &self,
        window: X11Window,
        parent: X11Window,
        visual: Visualid,
        aux: &CreateWindowAux,
    ) -> Result<(), ReplyError> {
        self.checked(
            parent,
            Request::CreateWindow {
                window,
                parent,
                visual,
                event_mask: aux.event_mask,
            },
        )
    }

    fn change_property32(
        &self,
        window: X11Window,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), ReplyError> {
        self.checked(
            window,
            Request::ChangeProperty32 {
                window,
                property,
                type_,
                data: data.to_vec(),
            },
        )
    }

    fn set_selection_owner(&self, owner: X11Window, selection: Atom) -> Result<(), ReplyError> {
        self.checked(owner, Request::SetSelectionOwner { owner, selection })
    }

    fn map_window(&self, window: X11Window) -> Result<(), ReplyError> {
        self.checked(window, Request::MapWindow { window })
    }

    fn configure_window(&self, window: X11Window, aux: &ConfigureWindowAux) -> Result<(), ConnectionError> {
        self.unchecked(Request::ConfigureWindow { window, aux: *aux })
    }

    fn send_client_message(
        &self,
        destination: X11Window,
        event_mask: EventMask,
        event: ClientMessageEvent,
    ) -> Result<(), ConnectionError> {
        assert_eq!(event.format, 32);
        self.unchecked(Request::SendEvent {
            destination,
            event_mask,
            type_: event.type_,
            data: event.data.as_data32(),
        })
    }

    fn set_input_focus(&self, window: X11Window) -> Result<(), ConnectionError> {
        self.unchecked(Request::SetInputFocus { window })
    }

    fn flush(&self) -> Result<(), ConnectionError> {
        let mut state = self.state.borrow_mut();
        if state.broken {
            return Err(ConnectionError::UnknownError);
        }
        state.flushes += 1;
        let read = std::mem::take(&mut state.read_on_flush);
        state.events.extend(read);
        Ok(())
    }

    fn poll_for_event(&self) -> Result<Option<XwmEvent>, ConnectionError> {
        let mut state = self.state.borrow_mut();
        if state.broken {
            return Err(ConnectionError::UnknownError);
        }
        Ok(state.events.pop_front())
    }
}

/// Stand-in for a wl_surface, identified by its protocol id
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TestSurface(pub u32);

impl XwmSurface for TestSurface {
    fn protocol_id(&self) -> u32 {
        self.0
    }
}

/// Compositor state driving an [`X11Wm`] over a [`MockConnection`]
#[derive(Debug)]
pub(crate) struct TestState {
    pub wm: X11Wm<TestSurface>,
    pub conn: Arc<MockConnection>,
    /// Surfaces the Xwayland client has created so far
    pub surfaces: Vec<TestSurface>,
    pub new_surfaces: Vec<X11Surface<TestSurface>>,
    pub destroyed: Vec<X11Window>,
}

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

impl TestState {
    fn start(conn: MockConnection) -> Result<Self, XwmError> {
        init_logging();
        let conn = Arc::new(conn);
        let wm = X11Wm::with_connection(conn.clone())?;
        Ok(TestState {
            wm,
            conn,
            surfaces: Vec::new(),
            new_surfaces: Vec::new(),
            destroyed: Vec::new(),
        })
    }

    pub fn new() -> Self {
        Self::start(MockConnection::default()).unwrap()
    }

    /// Every checked request on the root window fails
    pub fn with_failing_root() -> Self {
        let conn = MockConnection::default();
        conn.fail_window(ROOT.root);
        Self::start(conn).unwrap()
    }

    pub fn try_new_broken() -> Result<Self, XwmError> {
        let conn = MockConnection::default();
        conn.break_connection();
        Self::start(conn)
    }

    pub fn try_dispatch(&mut self) -> Result<usize, ConnectionError> {
        let id = self.wm.id();
        X11Wm::dispatch_events(self, id)
    }

    /// Queue `events` and run a single dispatch over them
    pub fn dispatch(&mut self, events: impl IntoIterator<Item = XwmEvent>) -> usize {
        self.conn.push_events(events);
        self.try_dispatch().unwrap()
    }

    /// Simulate the Xwayland client creating a wl_surface
    pub fn create_surface(&mut self, surface_id: u32) -> bool {
        let surface = TestSurface(surface_id);
        self.surfaces.push(surface.clone());
        let id = self.wm.id();
        X11Wm::surface_created(self, id, surface)
    }
}

impl XwmHandler for TestState {
    type Surface = TestSurface;

    fn xwm_state(&mut self, _xwm: XwmId) -> &mut X11Wm<TestSurface> {
        &mut self.wm
    }

    fn surface_for_id(&mut self, _xwm: XwmId, surface_id: u32) -> Option<TestSurface> {
        self.surfaces.iter().find(|s| s.0 == surface_id).cloned()
    }

    fn new_surface(&mut self, _xwm: XwmId, window: X11Surface<TestSurface>) {
        self.new_surfaces.push(window);
    }

    fn destroyed_window(&mut self, _xwm: XwmId, window: X11Surface<TestSurface>) {
        self.destroyed.push(window.window_id());
    }
}

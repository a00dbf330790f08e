//! Single-fire notification helpers

use std::fmt;

type Listener<E> = Box<dyn FnOnce(&E) + Send>;

/// A signal that is emitted at most once.
///
/// Listeners registered before the emission are handed out once, in registration order.
/// Listeners registered after the emission are handed back right away.
pub struct OnceSignal<E> {
    listeners: Vec<Listener<E>>,
    fired: bool,
}

impl<E> fmt::Debug for OnceSignal<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceSignal")
            .field("listeners", &self.listeners.len())
            .field("fired", &self.fired)
            .finish()
    }
}

impl<E> Default for OnceSignal<E> {
    fn default() -> Self {
        OnceSignal {
            listeners: Vec::new(),
            fired: false,
        }
    }
}

impl<E> OnceSignal<E> {
    /// Whether the signal already fired
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Register a listener.
    ///
    /// Returns the listener back if the signal already fired, so the caller can invoke it
    /// outside of whatever lock protects this signal.
    pub fn subscribe<F>(&mut self, listener: F) -> Option<Listener<E>>
    where
        F: FnOnce(&E) + Send + 'static,
    {
        if self.fired {
            return Some(Box::new(listener));
        }
        self.listeners.push(Box::new(listener));
        None
    }

    /// Mark the signal as fired and hand out the pending listeners.
    ///
    /// Returns `None` if the signal fired before.
    pub fn take_for_emit(&mut self) -> Option<Vec<Listener<E>>> {
        if self.fired {
            return None;
        }
        self.fired = true;
        Some(std::mem::take(&mut self.listeners))
    }
}

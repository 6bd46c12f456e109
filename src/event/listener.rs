use std::fmt;

use tracing::debug;

use super::ListEvent;

/// Callback invoked with every published batch.
pub type ListenerFn = Box<dyn FnMut(&ListEvent)>;

/// Token returned on registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered set of listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(ListenerId, ListenerFn)>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it is called after the ones already registered.
    pub fn add<L>(&mut self, listener: L) -> ListenerId
    where
        L: FnMut(&ListEvent) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Unregister a listener. Returns false for unknown ids.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(candidate, _)| *candidate != id);
        self.listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True when nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `event` to every listener, in registration order.
    pub fn notify(&mut self, event: &ListEvent) {
        debug!(
            changes = event.len(),
            listeners = self.listeners.len(),
            "publishing list event"
        );
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

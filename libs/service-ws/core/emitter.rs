//! String-keyed event listener registry.
//!
//! The dispatch model maps event names to the set of registered listener
//! callbacks. Listeners for one name fire in registration order; `once`
//! listeners are removed after their first invocation.
//!
//! The registry lock is never held while a callback runs: emission snapshots
//! the subscriber list first, so a callback is free to subscribe or
//! unsubscribe. A listener added during an emission fires from the next
//! emission on; a listener removed during an emission still sees the current
//! one.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Handle returned by a subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub(crate) type Callback = Arc<Mutex<Box<dyn FnMut(&Value) + Send>>>;

struct Listener {
    id: ListenerId,
    once: bool,
    callback: Callback,
}

/// Event listener multimap: event name -> registered callbacks
#[derive(Default)]
pub struct EventEmitter {
    listeners: HashMap<String, Vec<Listener>>,
    next_id: u64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribe(
        &mut self,
        name: &str,
        callback: Box<dyn FnMut(&Value) + Send>,
        once: bool,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.entry(name.to_string()).or_default().push(Listener {
            id,
            once,
            callback: Arc::new(Mutex::new(callback)),
        });
        id
    }

    /// Subscribe to `name`; the callback fires on every emission
    pub fn on<F>(&mut self, name: &str, callback: F) -> ListenerId
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.subscribe(name, Box::new(callback), false)
    }

    /// Subscribe to `name`; the callback fires on the next emission only
    pub fn once<F>(&mut self, name: &str, callback: F) -> ListenerId
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.subscribe(name, Box::new(callback), true)
    }

    /// Remove one subscription; returns whether it was found
    pub fn off(&mut self, name: &str, id: ListenerId) -> bool {
        match self.listeners.get_mut(name) {
            Some(listeners) => {
                let before = listeners.len();
                listeners.retain(|l| l.id != id);
                before != listeners.len()
            }
            None => false,
        }
    }

    /// Number of listeners currently registered for `name`
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map_or(0, Vec::len)
    }

    /// Snapshot the subscribers for `name` in registration order
    ///
    /// The emitter invokes the snapshot outside the registry lock.
    pub(crate) fn snapshot(&self, name: &str) -> Vec<(ListenerId, bool, Callback)> {
        self.listeners
            .get(name)
            .map(|listeners| {
                listeners
                    .iter()
                    .map(|l| (l.id, l.once, Arc::clone(&l.callback)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop the `once` subscriptions that fired in the last emission
    pub(crate) fn remove_fired(&mut self, name: &str, fired: &[ListenerId]) {
        if let Some(listeners) = self.listeners.get_mut(name) {
            listeners.retain(|l| !fired.contains(&l.id));
        }
    }
}

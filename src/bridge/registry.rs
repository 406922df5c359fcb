use std::fmt;
use std::sync::Arc;

use crate::{BridgeError, Result, Snapshot};

/// Callback invoked for every matching event notification.
pub type EventCallback = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Handle for one event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Listener {
    id: SubscriptionId,
    event_name: String,
    callback: EventCallback,
}

/// Event subscriptions in registration order.
#[derive(Default)]
pub(crate) struct EventRegistry {
    listeners: Vec<Listener>,
    next_id: u64,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject empty names and names containing whitespace or control
    /// characters.
    pub fn validate_event_name(event_name: &str) -> Result<()> {
        // ---
        if event_name.is_empty() {
            return Err(BridgeError::InvalidArgument("event name is empty".into()));
        }
        if event_name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(BridgeError::InvalidArgument(format!(
                "event name {event_name:?} is not a symbolic name"
            )));
        }
        Ok(())
    }

    /// Whether any subscription exists for `event_name`.
    pub fn has_listener(&self, event_name: &str) -> bool {
        self.listeners.iter().any(|l| l.event_name == event_name)
    }

    /// Store a subscription.
    ///
    /// Returns its id and whether it is the first one for `event_name`.
    pub fn insert(&mut self, event_name: &str, callback: EventCallback) -> (SubscriptionId, bool) {
        // ---
        let first = !self.has_listener(event_name);
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        self.listeners.push(Listener {
            id,
            event_name: event_name.to_string(),
            callback,
        });
        (id, first)
    }

    /// Remove one subscription; returns its event name if it existed.
    pub fn remove(&mut self, id: SubscriptionId) -> Option<String> {
        // ---
        let index = self.listeners.iter().position(|l| l.id == id)?;
        Some(self.listeners.remove(index).event_name)
    }

    /// Callbacks subscribed to `event_name`, in registration order.
    pub fn matching(&self, event_name: &str) -> Vec<EventCallback> {
        self.listeners
            .iter()
            .filter(|l| l.event_name == event_name)
            .map(|l| l.callback.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

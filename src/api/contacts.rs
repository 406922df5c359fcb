//! `navigator.contacts` address book access.

use serde_json::{json, Value};

use crate::{Bridge, BridgeConfig, PendingReply, Result, Snapshot, SubscriptionId, TransportPtr};

/// Address book operations.
#[derive(Debug, Clone)]
pub struct Contacts {
    bridge: Bridge,
}

impl Contacts {
    /// The address book changed outside this app.
    pub const ON_CONTACTS_CHANGE: &'static str = "oncontactschange";

    /// Bridge over `transport` with the `navigator.contacts` preset.
    pub fn new(transport: TransportPtr) -> Result<Self> {
        Ok(Self::with_bridge(Bridge::new(transport, BridgeConfig::contacts())?))
    }

    /// Wrap an existing bridge.
    pub fn with_bridge(bridge: Bridge) -> Self {
        Self { bridge }
    }

    /// Underlying bridge.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Insert or update `contact`; resolves with the stored contact.
    pub fn save(&self, contact: Value) -> PendingReply {
        self.bridge.send("save", json!({ "contact": contact }))
    }

    /// Query contacts; resolves with the matches.
    pub fn find(&self, options: Value) -> PendingReply {
        self.bridge.send("find", json!({ "options": options }))
    }

    /// Delete the contact with `contact_id`.
    pub fn remove(&self, contact_id: &str) -> PendingReply {
        self.bridge.send("remove", json!({ "contactId": contact_id }))
    }

    /// Subscribe to [`ON_CONTACTS_CHANGE`](Self::ON_CONTACTS_CHANGE).
    pub fn add_event_listener<F>(&self, event_name: &str, callback: F) -> Result<SubscriptionId>
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.bridge.subscribe(event_name, callback)
    }
}

// src/domain/transport.rs

//! Host transport abstraction.
//!
//! The embedding runtime hands each extension a message channel with two
//! primitives: a fire-and-forget `postMessage` and a single inbound message
//! listener. Some runtimes add a blocking `sendSyncMessage`. This module
//! models exactly that surface and nothing more; correlation, event fan-out
//! and payload snapshots live in the bridge.
//!
//! Concrete implementations live under `src/transport/`.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::{BridgeError, Result};

/// Inbound message handler installed on a transport.
pub type MessageListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Shared base state for transport implementations.
///
/// Holds the transport id used in logs and the single listener slot, so the
/// default [`HostTransport`] methods can delegate here.
pub struct TransportBase {
    /// Identifier used in log lines.
    pub transport_id: String,
    listener: OnceLock<MessageListener>,
}

impl TransportBase {
    /// Base for a transport identified by `transport_id`, no listener yet.
    pub fn new(transport_id: impl Into<String>) -> Self {
        // ---
        Self {
            transport_id: transport_id.into(),
            listener: OnceLock::new(),
        }
    }

    /// Install the listener.
    ///
    /// # Errors
    ///
    /// [`BridgeError::ListenerAlreadySet`] if one is already installed.
    pub fn install_listener(&self, listener: MessageListener) -> Result<()> {
        self.listener
            .set(listener)
            .map_err(|_| BridgeError::ListenerAlreadySet)
    }

    /// The installed listener, if any.
    pub fn listener(&self) -> Option<&MessageListener> {
        self.listener.get()
    }
}

impl fmt::Debug for TransportBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportBase")
            .field("transport_id", &self.transport_id)
            .field("has_listener", &self.listener.get().is_some())
            .finish()
    }
}

/// Message channel between the bridge and a native extension.
///
/// Implementations must not call the installed listener synchronously from
/// inside [`post_message`](HostTransport::post_message); replies are always
/// delivered later, from the transport's own delivery path.
pub trait HostTransport: Send + Sync {
    // ---
    /// Returns a reference to the shared base state.
    fn base(&self) -> &TransportBase;

    /// Identifier of this transport instance.
    fn transport_id(&self) -> &str {
        &self.base().transport_id
    }

    /// Send one serialized envelope. No delivery acknowledgment.
    fn post_message(&self, message: String) -> Result<()>;

    /// Register the inbound handler. Only one may ever be installed.
    fn set_message_listener(&self, listener: MessageListener) -> Result<()> {
        self.base().install_listener(listener)
    }

    /// Blocking round trip for immediate queries.
    ///
    /// The default implementation reports [`BridgeError::SyncUnsupported`].
    fn send_sync_message(&self, _message: String) -> Result<String> {
        Err(BridgeError::SyncUnsupported)
    }
}

/// Shared transport pointer.
pub type TransportPtr = Arc<dyn HostTransport>;

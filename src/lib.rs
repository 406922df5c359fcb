//! Asynchronous request/reply bridge to native platform extensions.
//!
//! A host runtime exposes a message channel to each native extension: text
//! goes out with `post_message` and comes back through a single listener.
//! This library layers request/reply semantics on top of that channel. It
//! tags each outbound command with a correlation id, matches replies back to
//! the waiting caller, rejects on remote errors and fans unsolicited event
//! notifications out to subscribers. Payloads are delivered as read-only
//! snapshots.
//!

// Import all sub modules once...
mod macros;

mod api;
mod bridge;
mod domain;
mod transport;

mod bridge_builder;
mod bridge_config;

mod correlation;
mod error;
mod snapshot;

pub mod protocol;

pub(crate) use macros::{log_debug, log_error, log_info, log_trace, log_warn};

// Re-export main types
pub use bridge::{Bridge, EventCallback, Outcome, PendingReply, Settler, SubscriptionId};

pub use bridge_builder::BridgeBuilder;
pub use bridge_config::BridgeConfig;

pub use api::{ArDrone, Contacts, DeviceCapabilities};

pub use correlation::{CorrelationId, IdFormat};
pub use error::{BridgeError, Result};
pub use snapshot::{Field, Record, Snapshot};

pub use transport::{
    // ---
    create_channel_transport,
    create_memory_transport,
    MemoryHost,
    NativeEndpoint,
    SyncResponder,
};

// --- public re-exports
pub use domain::{
    //
    HostTransport,
    MessageListener,
    TransportBase,
    TransportPtr,
};

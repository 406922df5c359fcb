use serde_json::Value;
use thiserror::Error;

use crate::CorrelationId;

/// Errors that can occur while talking to a native extension.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Caller supplied a malformed argument (empty command, bad event name).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The native side answered with an error value.
    ///
    /// The value is passed through unmodified.
    #[error("remote error: {0}")]
    Remote(Value),

    /// A pending request was settled a second time.
    #[error("request {0} already settled")]
    AlreadySettled(CorrelationId),

    /// Attempted to mutate a frozen snapshot field.
    #[error("field is read-only: {0}")]
    ReadOnly(String),

    /// Inbound text could not be classified as a reply or an event.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// JSON serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The host transport refused or failed an operation.
    #[error("transport error: {0}")]
    Transport(String),

    /// A message listener is already installed on this transport.
    #[error("message listener already set")]
    ListenerAlreadySet,

    /// The transport has no synchronous round-trip primitive.
    #[error("synchronous messaging not supported by transport")]
    SyncUnsupported,

    /// Request timed out waiting for a reply
    #[error("request timed out")]
    Timeout,

    /// The bridge went away before the request settled.
    #[error("bridge closed before reply arrived")]
    Closed,
}

impl BridgeError {
    /// True when the error came from the far side of the transport.
    pub fn is_remote(&self) -> bool {
        matches!(self, BridgeError::Remote(_))
    }

    /// The remote error value, if this is a [`BridgeError::Remote`].
    pub fn remote_value(&self) -> Option<&Value> {
        match self {
            BridgeError::Remote(value) => Some(value),
            _ => None,
        }
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

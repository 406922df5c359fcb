//! Per-extension bridge configuration.
//!
//! One [`BridgeConfig`] describes how a single native extension frames its
//! messages. The presets cover the extensions shipped with the runtime; other
//! extensions can be described in JSON and loaded with `serde_json`.

use std::time::Duration;

use serde::Deserialize;

use crate::protocol::WireFormat;
use crate::IdFormat;

/// Configuration for one bridge instance.
///
/// # Example
///
/// ```
/// use extension_bridge::{BridgeConfig, IdFormat};
///
/// let config: BridgeConfig = serde_json::from_str(
///     r#"{ "extension": "navigator.battery", "correlation_field": "requestId", "id_format": "number" }"#,
/// ).unwrap();
///
/// assert_eq!(config.wire.correlation_field, "requestId");
/// assert_eq!(config.wire.id_format, IdFormat::Number);
/// assert_eq!(config.activation_command, "addEventListener");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Extension name, used in log lines.
    pub extension: String,

    /// Message framing.
    #[serde(flatten)]
    pub wire: WireFormat,

    /// Command sent once per event name when its first subscriber arrives.
    pub activation_command: String,

    /// Per-request timeout in milliseconds; absent means wait forever.
    pub request_timeout_ms: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            extension: "extension".into(),
            wire: WireFormat::default(),
            activation_command: "addEventListener".into(),
            request_timeout_ms: None,
        }
    }
}

impl BridgeConfig {
    /// Config with default framing under the given extension name.
    pub fn named(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            ..Self::default()
        }
    }

    /// `navigator.system`: string ids in `_promise_id`.
    pub fn device_capabilities() -> Self {
        Self::named("navigator.system")
    }

    /// `navigator.contacts`: string ids in `_promise_id`.
    pub fn contacts() -> Self {
        Self::named("navigator.contacts")
    }

    /// `navigator.ardrone`: numeric ids in `asyncCallId`.
    pub fn ardrone() -> Self {
        let mut config = Self::named("navigator.ardrone");
        config.wire.correlation_field = "asyncCallId".into();
        config.wire.id_format = IdFormat::Number;
        config
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// The per-request timeout, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

//! Bridge builder.
//!
//! Fluent API for configuring a [`Bridge`] over a transport.

use std::time::Duration;

use crate::{Bridge, BridgeConfig, IdFormat, Result, TransportPtr};

/// Builder for [`Bridge`] instances.
///
/// # Example
///
/// ```
/// use extension_bridge::{create_memory_transport, BridgeBuilder, IdFormat};
/// use std::time::Duration;
///
/// # fn example() -> extension_bridge::Result<()> {
/// let (transport, _host) = create_memory_transport("drone");
///
/// let bridge = BridgeBuilder::new(transport)
///     .extension("navigator.ardrone")
///     .correlation_field("asyncCallId")
///     .id_format(IdFormat::Number)
///     .request_timeout(Duration::from_secs(5))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct BridgeBuilder {
    // ---
    transport: TransportPtr,
    config: BridgeConfig,
}

impl BridgeBuilder {
    /// Start from the default configuration.
    pub fn new(transport: TransportPtr) -> Self {
        Self {
            transport,
            config: BridgeConfig::default(),
        }
    }

    /// Replace the whole configuration, e.g. with a preset.
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Extension name used in log lines.
    pub fn extension(mut self, name: impl Into<String>) -> Self {
        self.config.extension = name.into();
        self
    }

    /// Field carrying correlation ids.
    pub fn correlation_field(mut self, field: impl Into<String>) -> Self {
        self.config.wire.correlation_field = field.into();
        self
    }

    /// Encoding of correlation ids on the wire.
    pub fn id_format(mut self, format: IdFormat) -> Self {
        self.config.wire.id_format = format;
        self
    }

    /// Field carrying the command name. Default: `cmd`.
    pub fn command_field(mut self, field: impl Into<String>) -> Self {
        self.config.wire.command_field = field.into();
        self
    }

    /// Command sent when an event gets its first subscriber.
    ///
    /// Default: `addEventListener`.
    pub fn activation_command(mut self, command: impl Into<String>) -> Self {
        self.config.activation_command = command.into();
        self
    }

    /// Fail requests that get no reply within `timeout`.
    ///
    /// Default: wait forever.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_request_timeout(timeout);
        self
    }

    /// Build the bridge and install its listener on the transport.
    ///
    /// # Errors
    ///
    /// Whatever the transport returns from `set_message_listener`, typically
    /// [`BridgeError::ListenerAlreadySet`](crate::BridgeError::ListenerAlreadySet).
    pub fn build(self) -> Result<Bridge> {
        Bridge::new(self.transport, self.config)
    }
}

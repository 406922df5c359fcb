//! Channel-backed host transport.
//!
//! Bridges to a native side that runs as its own task: outbound messages go
//! into an unbounded tokio channel read by the [`NativeEndpoint`], and
//! messages the endpoint posts back are drained into the bridge's listener by
//! the inbound pump from [`runner`](super::runner).

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::runner::spawn_inbound_pump;
use crate::bridge::lock_ignore_poison;
use crate::protocol::WireFormat;
use crate::{
    // ---
    log_trace,
    BridgeError,
    HostTransport,
    MessageListener,
    Result,
    TransportBase,
    TransportPtr,
};

struct ChannelTransport {
    base: TransportBase,
    outbound: mpsc::UnboundedSender<String>,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<String>>>,

    /// Inbound pump; ends on its own when the endpoint goes away.
    _pump: Mutex<Option<JoinHandle<()>>>,
}

impl HostTransport for ChannelTransport {
    // ---
    fn base(&self) -> &TransportBase {
        &self.base
    }

    fn post_message(&self, message: String) -> Result<()> {
        // ---
        log_trace!("{}: post {message}", self.transport_id());
        self.outbound.send(message).map_err(|_| {
            BridgeError::Transport(format!("{}: native endpoint closed", self.transport_id()))
        })
    }

    /// Install the listener and start the inbound pump.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Transport`] when called outside a tokio runtime.
    /// - [`BridgeError::ListenerAlreadySet`] on a second call.
    fn set_message_listener(&self, listener: MessageListener) -> Result<()> {
        // ---
        let runtime = Handle::try_current().map_err(|e| {
            BridgeError::Transport(format!("{}: no tokio runtime: {e}", self.transport_id()))
        })?;

        self.base.install_listener(listener.clone())?;

        let inbox = lock_ignore_poison(&self.inbound)
            .take()
            .ok_or(BridgeError::ListenerAlreadySet)?;

        let handle = spawn_inbound_pump(&runtime, self.transport_id().to_string(), inbox, listener);
        *lock_ignore_poison(&self._pump) = Some(handle);
        Ok(())
    }
}

/// Native side of a channel transport.
pub struct NativeEndpoint {
    /// Messages posted by the bridge.
    pub outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<String>,
}

impl NativeEndpoint {
    /// Next message posted by the bridge; `None` once the transport is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    /// Next message posted by the bridge, parsed as JSON.
    ///
    /// Unparsable messages yield a [`BridgeError::MalformedEnvelope`].
    pub async fn recv_json(&mut self) -> Option<Result<Value>> {
        let text = self.recv().await?;
        Some(
            serde_json::from_str(&text)
                .map_err(|e| BridgeError::MalformedEnvelope(format!("invalid JSON: {e}"))),
        )
    }

    /// Send raw text to the bridge.
    pub fn post(&self, message: impl Into<String>) -> Result<()> {
        self.inbound
            .send(message.into())
            .map_err(|_| BridgeError::Transport("bridge side closed".into()))
    }

    /// Send a JSON message to the bridge.
    pub fn post_json(&self, message: &Value) -> Result<()> {
        self.post(serde_json::to_string(message)?)
    }

    /// Answer `request` with `data`, echoing its correlation field.
    pub fn reply(&self, request: &Value, wire: &WireFormat, data: Value) -> Result<()> {
        // ---
        let id = request.get(&wire.correlation_field).cloned().ok_or_else(|| {
            BridgeError::MalformedEnvelope(format!("request lacks {}", wire.correlation_field))
        })?;

        let mut reply = serde_json::Map::new();
        reply.insert(wire.correlation_field.clone(), id);
        reply.insert(wire.data_field.clone(), data);
        self.post_json(&Value::Object(reply))
    }

    /// Answer `request` with an error carried inside the payload.
    pub fn reply_error(&self, request: &Value, wire: &WireFormat, error: Value) -> Result<()> {
        let mut data = serde_json::Map::new();
        data.insert(wire.error_field.clone(), error);
        self.reply(request, wire, Value::Object(data))
    }
}

/// Create a channel transport and its native endpoint.
pub fn create_transport(transport_id: impl Into<String>) -> (TransportPtr, NativeEndpoint) {
    // ---
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::unbounded_channel();

    let transport = ChannelTransport {
        base: TransportBase::new(transport_id),
        outbound: out_tx,
        inbound: Mutex::new(Some(in_rx)),
        _pump: Mutex::new(None),
    };

    let endpoint = NativeEndpoint {
        outbound: out_rx,
        inbound: in_tx,
    };
    (Arc::new(transport), endpoint)
}

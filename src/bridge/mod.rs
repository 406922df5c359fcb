//! Request/reply correlator.
//!
//! A [`Bridge`] owns the pending-request table and the event registry for one
//! native extension. Outbound calls get a fresh correlation id and a
//! [`PendingReply`]; inbound replies are matched back by id and settle that
//! reply exactly once. Event notifications fan out to every subscriber of the
//! named event.
//!
//! # Concurrency
//!
//! The tables sit behind uncontended mutexes. No lock is held while a
//! callback runs or while the transport is called, so continuations and
//! event callbacks may call back into the bridge.

mod pending;
mod registry;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::time::Instant;

pub use pending::{Outcome, PendingReply, Settler};
pub(crate) use pending::lock_ignore_poison;
pub use registry::{EventCallback, SubscriptionId};

use pending::{PendingRequests, SharedPending};
use registry::EventRegistry;

use crate::correlation::IdAllocator;
use crate::protocol::{CommandEnvelope, Inbound};
use crate::{
    // ---
    log_debug,
    log_error,
    log_info,
    log_trace,
    log_warn,
    BridgeConfig,
    BridgeError,
    CorrelationId,
    Result,
    Snapshot,
    TransportPtr,
};

/// Asynchronous bridge to one native extension.
///
/// Cheap to clone (internally `Arc`-backed); clones share the same tables.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    transport: TransportPtr,
    config: BridgeConfig,
    ids: IdAllocator,
    pending: SharedPending,
    registry: Mutex<EventRegistry>,
}

impl Bridge {
    // ---
    /// Create a bridge and install its message listener on `transport`.
    ///
    /// The listener holds only a weak reference; once every clone of the
    /// bridge is dropped, inbound messages are ignored.
    ///
    /// # Errors
    ///
    /// Propagates the transport's `set_message_listener` error, e.g.
    /// [`BridgeError::ListenerAlreadySet`] when another bridge already owns
    /// the transport.
    pub fn new(transport: TransportPtr, config: BridgeConfig) -> Result<Self> {
        // ---
        let inner = Arc::new(Inner {
            transport,
            config,
            ids: IdAllocator::new(),
            pending: Arc::new(Mutex::new(PendingRequests::new())),
            registry: Mutex::new(EventRegistry::new()),
        });

        let weak = Arc::downgrade(&inner);
        inner
            .transport
            .set_message_listener(Arc::new(move |message: &str| match weak.upgrade() {
                Some(inner) => Bridge { inner }.on_reply(message),
                None => log_debug!("bridge dropped, ignoring inbound message"),
            }))?;

        log_info!(
            "{}: bridge ready on transport {}",
            inner.config.extension,
            inner.transport.transport_id()
        );

        Ok(Self { inner })
    }

    /// Configuration this bridge was built with.
    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Send a command and return a future for its reply.
    ///
    /// `payload` must serialize to a JSON object (its fields travel next to
    /// the command) or to `null` (no extra fields); `()` works for commands
    /// without arguments.
    ///
    /// Never blocks and never fails synchronously. An empty command, a bad
    /// payload or a failed post all produce a future that is already
    /// rejected. Uses the configured request timeout, if any.
    pub fn send<P: Serialize>(&self, command: &str, payload: P) -> PendingReply {
        // ---
        let reply = self.dispatch_request(command, payload);
        match self.inner.config.request_timeout() {
            Some(timeout) => reply.with_timeout(timeout),
            None => reply,
        }
    }

    /// Like [`send`](Self::send) with an explicit timeout for this request.
    pub fn send_with_timeout<P: Serialize>(
        &self,
        command: &str,
        payload: P,
        timeout: Duration,
    ) -> PendingReply {
        self.dispatch_request(command, payload).with_timeout(timeout)
    }

    fn dispatch_request<P: Serialize>(&self, command: &str, payload: P) -> PendingReply {
        // ---
        let id = CorrelationId::new(self.inner.ids.allocate());

        let text = match self.encode_request(id, command, payload) {
            Ok(text) => text,
            Err(e) => {
                log_warn!("{}: request {id} ({command}) rejected: {e}", self.inner.config.extension);
                return PendingReply::failed(id, e);
            }
        };

        let (settler, reply) = Settler::channel(id);
        lock_ignore_poison(&self.inner.pending).register(settler);

        log_trace!("{}: send {command} as request {id}", self.inner.config.extension);

        if let Err(e) = self.inner.transport.post_message(text) {
            log_error!("{}: failed to post {command}: {e}", self.inner.config.extension);
            let settler = lock_ignore_poison(&self.inner.pending).take(id);
            if let Some(mut settler) = settler {
                let _ = settler.fail(e);
            }
        }

        reply.attach_table(&self.inner.pending)
    }

    fn encode_request<P: Serialize>(&self, id: CorrelationId, command: &str, payload: P) -> Result<String> {
        // ---
        if command.is_empty() {
            return Err(BridgeError::InvalidArgument("command is empty".into()));
        }
        let envelope = CommandEnvelope::request(command, id, payload_fields(payload)?);
        envelope.to_wire(&self.inner.config.wire)
    }

    /// Blocking round trip through the transport's synchronous primitive.
    ///
    /// Bypasses correlation entirely; the reply text is parsed as JSON.
    ///
    /// # Errors
    ///
    /// [`BridgeError::SyncUnsupported`] if the transport has no synchronous
    /// channel, plus argument, serialization and transport errors.
    pub fn send_sync<P: Serialize>(&self, command: &str, payload: P) -> Result<Value> {
        // ---
        if command.is_empty() {
            return Err(BridgeError::InvalidArgument("command is empty".into()));
        }
        let envelope = CommandEnvelope::notification(command, payload_fields(payload)?);
        let text = envelope.to_wire(&self.inner.config.wire)?;

        let reply = self.inner.transport.send_sync_message(text)?;
        Ok(serde_json::from_str(&reply)?)
    }

    /// Handle one inbound message.
    ///
    /// Installed as the transport's listener; public so hosts with their own
    /// delivery loop can feed messages directly. Never panics on bad input:
    /// malformed messages, fault reports and replies for unknown or already
    /// settled ids are logged and dropped.
    pub fn on_reply(&self, message: &str) {
        // ---
        match Inbound::parse(message, &self.inner.config.wire) {
            Ok(Inbound::Reply {
                correlation_id,
                outcome,
            }) => self.settle(correlation_id, outcome),
            Ok(Inbound::Event { event_name, body }) => self.dispatch(&event_name, &body),
            Ok(Inbound::Fault { error }) => {
                log_warn!("{}: native side reported: {error}", self.inner.config.extension);
            }
            Err(e) => {
                log_warn!("{}: dropping inbound message: {e}", self.inner.config.extension);
            }
        }
    }

    fn settle(&self, id: CorrelationId, outcome: std::result::Result<Value, Value>) {
        // ---
        self.expire_overdue();

        let settler = lock_ignore_poison(&self.inner.pending).take(id);
        let Some(mut settler) = settler else {
            log_debug!("{}: no pending request for id {id}, dropped", self.inner.config.extension);
            return;
        };

        let settled = match outcome {
            Ok(payload) => settler.resolve(Snapshot::freeze(&payload)),
            Err(error) => settler.reject(error),
        };

        if let Err(e) = settled {
            // Entries leave the table before settling, so this means the
            // table handed out a settler twice.
            log_error!("{}: {e}", self.inner.config.extension);
        }
    }

    /// Subscribe `callback` to notifications named `event_name`.
    ///
    /// The first subscriber for a name triggers one activation command
    /// (`{"cmd": "addEventListener", "eventName": ...}` by default); later
    /// subscribers for the same name do not.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidArgument`] for an empty or non-symbolic name;
    ///   the registry is left unchanged.
    /// - The transport error if the activation command cannot be posted; the
    ///   subscription is rolled back.
    pub fn subscribe<F>(&self, event_name: &str, callback: F) -> Result<SubscriptionId>
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        // ---
        if let Err(e) = EventRegistry::validate_event_name(event_name) {
            log_warn!("{}: subscribe rejected: {e}", self.inner.config.extension);
            return Err(e);
        }

        let (id, first) = lock_ignore_poison(&self.inner.registry).insert(event_name, Arc::new(callback));

        if first {
            if let Err(e) = self.activate(event_name) {
                lock_ignore_poison(&self.inner.registry).remove(id);
                return Err(e);
            }
        }

        Ok(id)
    }

    fn activate(&self, event_name: &str) -> Result<()> {
        // ---
        let wire = &self.inner.config.wire;
        let mut fields = Map::new();
        fields.insert(wire.event_field.clone(), Value::String(event_name.to_string()));

        let envelope = CommandEnvelope::notification(self.inner.config.activation_command.as_str(), fields);
        self.inner.transport.post_message(envelope.to_wire(wire)?)?;

        log_debug!("{}: activated event {event_name}", self.inner.config.extension);
        Ok(())
    }

    /// Remove one subscription. Returns `false` if it did not exist.
    ///
    /// No command is sent to the native side.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        lock_ignore_poison(&self.inner.registry).remove(id).is_some()
    }

    /// Deliver `payload` to every subscriber of `event_name`, in
    /// registration order, as one shared read-only snapshot.
    ///
    /// Does nothing when there are no subscribers.
    pub fn dispatch(&self, event_name: &str, payload: &Value) {
        // ---
        let callbacks = lock_ignore_poison(&self.inner.registry).matching(event_name);
        if callbacks.is_empty() {
            log_trace!("{}: no subscribers for {event_name}", self.inner.config.extension);
            return;
        }

        let snapshot = Snapshot::freeze(payload);
        for callback in callbacks {
            callback(&snapshot);
        }
    }

    /// Number of requests still waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.expire_overdue();
        lock_ignore_poison(&self.inner.pending).len()
    }

    /// Whether the request with `id` is still waiting for a reply.
    pub fn is_pending(&self, id: CorrelationId) -> bool {
        self.expire_overdue();
        lock_ignore_poison(&self.inner.pending).contains(id)
    }

    /// Fail every request whose timeout has passed, polled or not.
    fn expire_overdue(&self) {
        // ---
        let expired = lock_ignore_poison(&self.inner.pending).take_expired(Instant::now());
        for mut settler in expired {
            log_debug!("{}: request {} timed out", self.inner.config.extension, settler.id());
            let _ = settler.fail(BridgeError::Timeout);
        }
    }

    /// Number of live event subscriptions.
    pub fn subscription_count(&self) -> usize {
        lock_ignore_poison(&self.inner.registry).len()
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("extension", &self.inner.config.extension)
            .field("transport", &self.inner.transport.transport_id())
            .field("pending", &self.pending_count())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

/// Flatten a payload into envelope fields.
fn payload_fields<P: Serialize>(payload: P) -> Result<Map<String, Value>> {
    // ---
    match serde_json::to_value(payload)? {
        Value::Null => Ok(Map::new()),
        Value::Object(fields) => Ok(fields),
        other => Err(BridgeError::InvalidArgument(format!(
            "payload must be a JSON object, got {other}"
        ))),
    }
}

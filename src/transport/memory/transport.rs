// src/transport/memory/transport.rs

//! In-memory host transport.
//!
//! The transport half is handed to the bridge; the [`MemoryHost`] half plays
//! the native extension. Both share one [`MemoryState`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::bridge::lock_ignore_poison;
use crate::{
    // ---
    log_debug,
    log_trace,
    BridgeError,
    HostTransport,
    Result,
    TransportBase,
    TransportPtr,
};

/// Answers synchronous round trips on behalf of the native side.
pub type SyncResponder = Arc<dyn Fn(&str) -> Result<String> + Send + Sync>;

struct MemoryState {
    base: TransportBase,
    outbox: Mutex<Vec<String>>,
    sync_responder: Mutex<Option<SyncResponder>>,
    offline: AtomicBool,
}

struct MemoryTransport {
    // ---
    state: Arc<MemoryState>,
}

impl HostTransport for MemoryTransport {
    // ---
    fn base(&self) -> &TransportBase {
        &self.state.base
    }

    /// Append the message to the outbox.
    ///
    /// Never calls the listener, so the caller's locks are never re-entered.
    fn post_message(&self, message: String) -> Result<()> {
        // ---
        if self.state.offline.load(Ordering::Acquire) {
            return Err(BridgeError::Transport(format!(
                "{}: host offline",
                self.transport_id()
            )));
        }

        log_trace!("{}: post {message}", self.transport_id());
        lock_ignore_poison(&self.state.outbox).push(message);
        Ok(())
    }

    fn send_sync_message(&self, message: String) -> Result<String> {
        // ---
        // Called unlocked; a responder may replace itself.
        let responder = lock_ignore_poison(&self.state.sync_responder).clone();
        match responder {
            Some(respond) => respond(&message),
            None => Err(BridgeError::SyncUnsupported),
        }
    }
}

/// Native-side handle of an in-memory transport.
///
/// Inspects what the bridge posted and delivers inbound messages to the
/// installed listener on the calling thread.
#[derive(Clone)]
pub struct MemoryHost {
    state: Arc<MemoryState>,
}

impl MemoryHost {
    /// All messages posted so far, oldest first.
    pub fn posted(&self) -> Vec<String> {
        lock_ignore_poison(&self.state.outbox).clone()
    }

    /// Posted messages parsed as JSON; unparsable ones are skipped.
    pub fn posted_json(&self) -> Vec<Value> {
        self.posted()
            .iter()
            .filter_map(|text| serde_json::from_str(text).ok())
            .collect()
    }

    /// Most recent posted message parsed as JSON.
    pub fn last_posted_json(&self) -> Option<Value> {
        self.posted_json().pop()
    }

    /// Drain the outbox.
    pub fn take_posted(&self) -> Vec<String> {
        std::mem::take(&mut *lock_ignore_poison(&self.state.outbox))
    }

    /// Deliver inbound text to the bridge.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Transport`] if no listener has been installed.
    pub fn deliver(&self, message: &str) -> Result<()> {
        // ---
        let listener = self.state.base.listener().ok_or_else(|| {
            BridgeError::Transport(format!(
                "{}: no message listener installed",
                self.state.base.transport_id
            ))
        })?;

        log_trace!("{}: deliver {message}", self.state.base.transport_id);
        listener(message);
        Ok(())
    }

    /// Serialize `message` and deliver it.
    pub fn deliver_json(&self, message: &Value) -> Result<()> {
        self.deliver(&serde_json::to_string(message)?)
    }

    /// Install the responder used for synchronous round trips.
    pub fn on_sync<F>(&self, responder: F)
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        *lock_ignore_poison(&self.state.sync_responder) = Some(Arc::new(responder));
    }

    /// Make every subsequent post fail, or succeed again.
    pub fn set_offline(&self, offline: bool) {
        self.state.offline.store(offline, Ordering::Release);
    }

    /// Whether the bridge has installed its listener.
    pub fn has_listener(&self) -> bool {
        self.state.base.listener().is_some()
    }
}

/// Create an in-memory transport.
///
/// Returns the transport for the bridge and the host handle for the caller
/// playing the native side. Always available; requires no runtime.
pub fn create_transport(transport_id: impl Into<String>) -> (TransportPtr, MemoryHost) {
    // ---
    let state = Arc::new(MemoryState {
        base: TransportBase::new(transport_id),
        outbox: Mutex::new(Vec::new()),
        sync_responder: Mutex::new(None),
        offline: AtomicBool::new(false),
    });

    log_debug!("{}: create memory transport", state.base.transport_id);

    let transport = MemoryTransport {
        state: state.clone(),
    };
    (Arc::new(transport), MemoryHost { state })
}

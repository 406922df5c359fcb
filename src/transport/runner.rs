//! Inbound delivery loop.
//!
//! Glue between an asynchronous inbox and the single message listener a
//! bridge installs. The loop is spawned once, when the listener is set, and
//! runs until every sender of the inbox is gone.
//!
//! The listener is called sequentially, one message at a time, so the bridge
//! sees inbound traffic in arrival order on one logical thread.

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{log_debug, MessageListener};

/// Spawn the receive loop on `runtime`.
///
/// Dropping the returned handle does not stop the loop.
pub(crate) fn spawn_inbound_pump(
    runtime: &Handle,
    transport_id: String,
    mut inbox: mpsc::UnboundedReceiver<String>,
    listener: MessageListener,
) -> JoinHandle<()> {
    // ---
    runtime.spawn(async move {
        log_debug!("{transport_id}: inbound pump started");

        while let Some(message) = inbox.recv().await {
            listener(&message);
        }

        log_debug!("{transport_id}: inbound pump stopped, native side closed");
    })
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_pump_preserves_order_and_stops() {
        // ---
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_listener = seen.clone();
        let listener: MessageListener =
            Arc::new(move |m: &str| seen_by_listener.lock().unwrap().push(m.to_string()));

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_inbound_pump(&Handle::current(), "pump".into(), rx, listener);

        tx.send("a".to_string()).unwrap();
        tx.send("b".to_string()).unwrap();
        drop(tx);

        handle.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }
}

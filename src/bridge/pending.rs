use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::{Instant, Sleep};

use crate::{log_debug, BridgeError, CorrelationId, Result, Snapshot};

/// What a pending request settles with.
pub type Outcome = Result<Snapshot>;

/// Shared pending table.
pub(crate) type SharedPending = Arc<Mutex<PendingRequests>>;

/// Acquire a mutex guard, ignoring poisoning.
///
/// The guarded tables hold no invariants spanning entries; the worst outcome
/// of a poisoned lock is a dropped or unmatched reply.
pub(crate) fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // ---
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Settling half of a pending request.
///
/// Settles at most once. A second `resolve`/`reject`/`fail` returns
/// [`BridgeError::AlreadySettled`] and leaves the first outcome in place.
#[derive(Debug)]
pub struct Settler {
    id: CorrelationId,
    tx: Option<oneshot::Sender<Outcome>>,
}

impl Settler {
    /// Create a settler and the future it settles.
    pub fn channel(id: CorrelationId) -> (Settler, PendingReply) {
        // ---
        let (tx, rx) = oneshot::channel();
        let settler = Settler { id, tx: Some(tx) };
        (settler, PendingReply::new(id, rx))
    }

    /// Correlation id this settler answers.
    pub fn id(&self) -> CorrelationId {
        self.id
    }

    /// Whether an outcome has already been delivered.
    pub fn is_settled(&self) -> bool {
        self.tx.is_none()
    }

    /// Resolve with a payload.
    pub fn resolve(&mut self, payload: Snapshot) -> Result<()> {
        self.settle(Ok(payload))
    }

    /// Reject with an error value supplied by the far side.
    pub fn reject(&mut self, error: Value) -> Result<()> {
        self.settle(Err(BridgeError::Remote(error)))
    }

    /// Reject with a local error.
    pub fn fail(&mut self, error: BridgeError) -> Result<()> {
        self.settle(Err(error))
    }

    fn settle(&mut self, outcome: Outcome) -> Result<()> {
        // ---
        let tx = self.tx.take().ok_or(BridgeError::AlreadySettled(self.id))?;
        if tx.send(outcome).is_err() {
            // Caller dropped the future; the request still counts as settled.
            log_debug!("request {} settled after its future was dropped", self.id);
        }
        Ok(())
    }
}

/// Tracks requests waiting for replies, keyed by correlation id.
#[derive(Debug, Default)]
pub(crate) struct PendingRequests {
    requests: HashMap<CorrelationId, Entry>,
}

#[derive(Debug)]
struct Entry {
    settler: Settler,
    deadline: Option<Instant>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a settler under its id.
    pub fn register(&mut self, settler: Settler) {
        self.requests.insert(
            settler.id(),
            Entry {
                settler,
                deadline: None,
            },
        );
    }

    /// Expire `id` at `deadline`. No-op if it is not pending.
    pub fn set_deadline(&mut self, id: CorrelationId, deadline: Instant) {
        if let Some(entry) = self.requests.get_mut(&id) {
            entry.deadline = Some(deadline);
        }
    }

    /// Remove and return the settler for `id`, if still pending.
    pub fn take(&mut self, id: CorrelationId) -> Option<Settler> {
        self.requests.remove(&id).map(|entry| entry.settler)
    }

    /// Remove and return every settler whose deadline is at or before `now`.
    pub fn take_expired(&mut self, now: Instant) -> Vec<Settler> {
        // ---
        let expired: Vec<CorrelationId> = self
            .requests
            .iter()
            .filter(|(_, entry)| entry.deadline.is_some_and(|deadline| deadline <= now))
            .map(|(id, _)| *id)
            .collect();

        expired.into_iter().filter_map(|id| self.take(id)).collect()
    }

    /// Whether `id` is still waiting for a reply.
    pub fn contains(&self, id: CorrelationId) -> bool {
        self.requests.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }
}

/// Future returned by [`Bridge::send`](crate::Bridge::send).
///
/// Resolves with the reply payload as a [`Snapshot`], or fails with
/// [`BridgeError::Remote`] carrying the far side's error value.
///
/// Without a timeout, a request that is never answered never completes.
/// Awaiting a reply with a timeout needs a tokio runtime with the time
/// driver enabled.
#[must_use = "a pending reply does nothing unless awaited"]
pub struct PendingReply {
    id: CorrelationId,
    rx: oneshot::Receiver<Outcome>,
    deadline: Option<Instant>,
    sleep: Option<Pin<Box<Sleep>>>,
    table: Weak<Mutex<PendingRequests>>,
}

impl PendingReply {
    fn new(id: CorrelationId, rx: oneshot::Receiver<Outcome>) -> Self {
        // ---
        Self {
            id,
            rx,
            deadline: None,
            sleep: None,
            table: Weak::new(),
        }
    }

    /// A reply that has already failed.
    pub(crate) fn failed(id: CorrelationId, error: BridgeError) -> Self {
        // ---
        let (mut settler, reply) = Settler::channel(id);
        // A fresh settler cannot already be settled.
        let _ = settler.fail(error);
        reply
    }

    pub(crate) fn attach_table(mut self, table: &SharedPending) -> Self {
        self.table = Arc::downgrade(table);
        self
    }

    /// Correlation id of the request.
    pub fn id(&self) -> CorrelationId {
        self.id
    }

    /// Give up `timeout` from now.
    ///
    /// The clock runs whether or not the future is being polled. On expiry
    /// the request leaves the pending table, so a late reply is dropped as
    /// stale, and the future fails with [`BridgeError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        // ---
        let deadline = Instant::now() + timeout;
        if let Some(table) = self.table.upgrade() {
            lock_ignore_poison(&table).set_deadline(self.id, deadline);
        }
        self.deadline = Some(deadline);
        self.sleep = None;
        self
    }

    /// Await the reply and deserialize its payload.
    pub async fn decode<T: DeserializeOwned>(self) -> Result<T> {
        self.await?.decode()
    }

    fn expire(&self) {
        // ---
        if let Some(table) = self.table.upgrade() {
            lock_ignore_poison(&table).take(self.id);
        }
        log_debug!("request {} timed out", self.id);
    }
}

impl Future for PendingReply {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // ---
        if let Poll::Ready(received) = Pin::new(&mut self.rx).poll(cx) {
            return Poll::Ready(received.unwrap_or(Err(BridgeError::Closed)));
        }

        let Some(deadline) = self.deadline else {
            return Poll::Pending;
        };
        let sleep = self
            .sleep
            .get_or_insert_with(|| Box::pin(tokio::time::sleep_until(deadline)));

        if sleep.as_mut().poll(cx).is_pending() {
            return Poll::Pending;
        }

        self.expire();
        Poll::Ready(Err(BridgeError::Timeout))
    }
}

impl std::fmt::Debug for PendingReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReply")
            .field("id", &self.id)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_take() {
        // ---
        let mut pending = PendingRequests::new();
        let (settler, mut rx) = Settler::channel(CorrelationId::new(0));

        pending.register(settler);
        assert_eq!(pending.len(), 1);
        assert!(pending.contains(CorrelationId::new(0)));

        let mut settler = pending.take(CorrelationId::new(0)).expect("registered");
        assert_eq!(pending.len(), 0);

        settler.resolve(Snapshot::freeze(&json!({"ok": true}))).unwrap();
        let outcome = rx.rx.try_recv().unwrap().unwrap();
        assert_eq!(outcome, json!({"ok": true}));
    }

    #[test]
    fn test_take_unknown_id() {
        // ---
        let mut pending = PendingRequests::new();
        assert!(pending.take(CorrelationId::new(99)).is_none());
    }

    #[test]
    fn test_double_settle_is_fault() {
        // ---
        let (mut settler, mut rx) = Settler::channel(CorrelationId::new(5));

        settler.resolve(Snapshot::freeze(&json!(1))).unwrap();
        assert!(settler.is_settled());

        let second = settler.reject(json!("late"));
        assert!(matches!(second, Err(BridgeError::AlreadySettled(id)) if id.get() == 5));

        // First outcome is untouched
        let outcome = rx.rx.try_recv().unwrap().unwrap();
        assert_eq!(outcome, json!(1));
    }

    #[test]
    fn test_settle_after_future_dropped() {
        // ---
        let (mut settler, rx) = Settler::channel(CorrelationId::new(1));
        drop(rx);
        assert!(settler.resolve(Snapshot::empty()).is_ok());
        assert!(settler.fail(BridgeError::Closed).is_err());
    }

    #[tokio::test]
    async fn test_dropped_settler_closes_future() {
        // ---
        let (settler, rx) = Settler::channel(CorrelationId::new(2));
        drop(settler);
        assert!(matches!(rx.await, Err(BridgeError::Closed)));
    }

    #[tokio::test]
    async fn test_timeout_removes_entry() {
        // ---
        let table: SharedPending = Arc::new(Mutex::new(PendingRequests::new()));
        let (settler, reply) = Settler::channel(CorrelationId::new(3));
        lock_ignore_poison(&table).register(settler);

        let reply = reply
            .attach_table(&table)
            .with_timeout(Duration::from_millis(10));

        assert!(matches!(reply.await, Err(BridgeError::Timeout)));
        assert_eq!(lock_ignore_poison(&table).len(), 0);
    }

    #[tokio::test]
    async fn test_deadline_runs_before_first_poll() {
        // ---
        let table: SharedPending = Arc::new(Mutex::new(PendingRequests::new()));
        let (settler, reply) = Settler::channel(CorrelationId::new(4));
        lock_ignore_poison(&table).register(settler);

        let reply = reply
            .attach_table(&table)
            .with_timeout(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(50)).await;

        let expired = lock_ignore_poison(&table).take_expired(Instant::now());
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id().get(), 4);
        assert_eq!(lock_ignore_poison(&table).len(), 0);

        let outcome = tokio::time::timeout(Duration::from_millis(5), reply)
            .await
            .expect("deadline already passed");
        assert!(matches!(outcome, Err(BridgeError::Timeout)));
    }

    #[test]
    fn test_take_expired_skips_open_entries() {
        // ---
        let mut pending = PendingRequests::new();
        let (early, _early_rx) = Settler::channel(CorrelationId::new(1));
        let (open, _open_rx) = Settler::channel(CorrelationId::new(2));
        let (late, _late_rx) = Settler::channel(CorrelationId::new(3));
        pending.register(early);
        pending.register(open);
        pending.register(late);

        let now = Instant::now();
        pending.set_deadline(CorrelationId::new(1), now);
        pending.set_deadline(CorrelationId::new(3), now + Duration::from_secs(60));

        let expired = pending.take_expired(now);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id().get(), 1);
        assert_eq!(pending.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_reply() {
        // ---
        let reply = PendingReply::failed(CorrelationId::new(8), BridgeError::Transport("down".into()));
        assert_eq!(reply.id().get(), 8);
        assert!(matches!(reply.await, Err(BridgeError::Transport(_))));
    }
}

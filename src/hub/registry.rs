//! Subscription registry and event publisher for cart updates.
//!
//! Each session gets at most one live subscriber backed by a bounded
//! `mpsc` mailbox. Publishing never blocks the caller: when the mailbox is
//! full the event is dropped (freshness is sacrificed, not latency), and
//! when no subscriber is registered the event is discarded outright —
//! there is no buffering for future subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::models::cart::{CartEvent, CartSnapshot};

struct SubscriberSlot {
    id: u64,
    tx: mpsc::Sender<CartEvent>,
    cancel: CancellationToken,
}

struct HubInner {
    subscribers: Mutex<HashMap<String, SubscriberSlot>>,
    capacity: usize,
    next_id: AtomicU64,
}

impl HubInner {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SubscriberSlot>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove a registration, but only if it is still the current one.
    fn unregister(&self, session_id: &str, subscription_id: u64) {
        let mut subscribers = self.lock();
        if subscribers
            .get(session_id)
            .is_some_and(|slot| slot.id == subscription_id)
        {
            subscribers.remove(session_id);
            debug!(session_id, subscription_id, "subscriber unregistered");
        }
    }
}

/// Registry of per-session update mailboxes with a fire-and-forget
/// publish path.
#[derive(Clone)]
pub struct CartUpdateHub {
    inner: Arc<HubInner>,
}

impl CartUpdateHub {
    /// Create a hub whose mailboxes hold at most `capacity` pending events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: Mutex::new(HashMap::new()),
                capacity,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a subscriber for a session, displacing any previous one.
    ///
    /// The displaced handle's cancellation token fires so its owner can
    /// observe the invalidation and terminate.
    #[must_use]
    pub fn register(&self, session_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let cancel = CancellationToken::new();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let displaced = self.inner.lock().insert(
            session_id.to_owned(),
            SubscriberSlot {
                id,
                tx,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = displaced {
            debug!(
                session_id,
                displaced_id = previous.id,
                "replacing existing subscriber"
            );
            previous.cancel.cancel();
        }

        Subscription {
            session_id: session_id.to_owned(),
            id,
            rx,
            cancel,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Publish a fresh cart snapshot to a session's mailbox.
    ///
    /// Never blocks. A missing subscriber discards the event; a full
    /// mailbox drops it with a warning.
    pub fn publish(&self, session_id: &str, snapshot: CartSnapshot) {
        let event = CartEvent::from_snapshot(snapshot);

        let tx = {
            let subscribers = self.inner.lock();
            let Some(slot) = subscribers.get(session_id) else {
                debug!(session_id, "no subscriber registered, discarding event");
                return;
            };
            slot.tx.clone()
        };

        match tx.try_send(event) {
            Ok(()) => debug!(session_id, "cart update enqueued"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(session_id, "mailbox full, dropping cart update");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(session_id, "mailbox closed, discarding event");
            }
        }
    }

    /// Whether a subscriber is currently registered for the session.
    #[must_use]
    pub fn has_subscriber(&self, session_id: &str) -> bool {
        self.inner.lock().contains_key(session_id)
    }
}

/// Live mailbox handle held by exactly one streaming consumer.
///
/// Dropping the subscription releases the registration, unless a newer
/// registration has already displaced it.
pub struct Subscription {
    session_id: String,
    id: u64,
    rx: mpsc::Receiver<CartEvent>,
    cancel: CancellationToken,
    inner: Arc<HubInner>,
}

impl Subscription {
    /// Await the next event, or `None` on invalidation.
    ///
    /// Returns `None` when the handle has been displaced by a newer
    /// registration (its cancellation token fired) or the hub side of the
    /// mailbox is gone.
    pub async fn next(&mut self) -> Option<CartEvent> {
        tokio::select! {
            () = self.cancel.cancelled() => None,
            event = self.rx.recv() => event,
        }
    }

    /// The session this subscription belongs to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether this handle has been invalidated by a newer registration.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inner.unregister(&self.session_id, self.id);
    }
}

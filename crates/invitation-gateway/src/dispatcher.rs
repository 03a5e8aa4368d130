use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::broadcast;

use invitation_types::events::GuestbookEvent;

/// Fans guestbook events out to every live subscriber.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<GuestbookEvent>,

    /// Open WebSocket subscribers
    subscribers: AtomicUsize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                subscribers: AtomicUsize::new(0),
            }),
        }
    }

    /// Subscribe to guestbook events. Subscribe before reading the snapshot
    /// so nothing written in between is missed.
    pub fn subscribe(&self) -> broadcast::Receiver<GuestbookEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all subscribers. Having none is not an error.
    pub fn broadcast(&self, event: GuestbookEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Number of connected WebSocket subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.load(Ordering::Relaxed)
    }

    /// Count a connection for as long as the returned guard lives.
    pub fn track(&self) -> SubscriberGuard {
        self.inner.subscribers.fetch_add(1, Ordering::Relaxed);
        SubscriberGuard {
            inner: self.inner.clone(),
        }
    }
}

pub struct SubscriberGuard {
    inner: Arc<DispatcherInner>,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.inner.subscribers.fetch_sub(1, Ordering::Relaxed);
    }
}

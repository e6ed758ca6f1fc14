//! Publish/subscribe hub for worker events
//!
//! The stdout reader is the only publisher. Callers register interest in an
//! event type *before* they write the command that triggers it; registration
//! is synchronous so a fast reply can never be missed. Every subscription
//! handle removes itself from the bus when dropped, so a timed-out wait leaves
//! nothing behind for a late event to resolve.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use shared::GenEvent;
use tokio::sync::{mpsc, oneshot};

/// Outcome of a bounded wait on a one-shot subscription
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome<T> {
    Resolved(T),
    TimedOut,
}

#[derive(Default)]
struct Subscribers {
    once: HashMap<String, Vec<(u64, oneshot::Sender<GenEvent>)>>,
    streams: HashMap<String, Vec<(u64, mpsc::UnboundedSender<GenEvent>)>>,
}

/// Event bus keyed by event type string
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Subscribers>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn subscribers(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver `event` to every current subscriber of `kind`
    ///
    /// One-shot subscribers are consumed. Returns how many subscribers
    /// received the event; nothing is buffered for later subscribers.
    pub fn publish(&self, kind: &str, event: GenEvent) -> usize {
        let mut subscribers = self.subscribers();
        let mut delivered = 0;

        if let Some(waiters) = subscribers.once.remove(kind) {
            for (_, sender) in waiters {
                if sender.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }

        if let Some(streams) = subscribers.streams.get_mut(kind) {
            streams.retain(|(_, sender)| sender.send(event.clone()).is_ok());
            delivered += streams.len();
            if streams.is_empty() {
                subscribers.streams.remove(kind);
            }
        }

        delivered
    }

    /// Register for the next event of `kind`
    pub fn subscribe_once(self: &Arc<Self>, kind: &str) -> OnceSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.subscribers()
            .once
            .entry(kind.to_string())
            .or_default()
            .push((id, tx));

        OnceSubscription {
            bus: Arc::clone(self),
            kind: kind.to_string(),
            id,
            rx,
        }
    }

    /// Register for every event of `kind` until the handle is dropped
    pub fn subscribe(self: &Arc<Self>, kind: &str) -> StreamSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers()
            .streams
            .entry(kind.to_string())
            .or_default()
            .push((id, tx));

        StreamSubscription {
            bus: Arc::clone(self),
            kind: kind.to_string(),
            id,
            rx,
        }
    }

    /// Number of live subscriptions (both flavours) for `kind`
    pub fn subscriber_count(&self, kind: &str) -> usize {
        let subscribers = self.subscribers();
        subscribers.once.get(kind).map_or(0, Vec::len) + subscribers.streams.get(kind).map_or(0, Vec::len)
    }

    fn remove(&self, kind: &str, id: u64) {
        let mut subscribers = self.subscribers();

        if let Some(waiters) = subscribers.once.get_mut(kind) {
            waiters.retain(|(waiter_id, _)| *waiter_id != id);
            if waiters.is_empty() {
                subscribers.once.remove(kind);
            }
        }

        if let Some(streams) = subscribers.streams.get_mut(kind) {
            streams.retain(|(stream_id, _)| *stream_id != id);
            if streams.is_empty() {
                subscribers.streams.remove(kind);
            }
        }
    }
}

/// Handle for the next occurrence of one event type
pub struct OnceSubscription {
    bus: Arc<EventBus>,
    kind: String,
    id: u64,
    rx: oneshot::Receiver<GenEvent>,
}

impl OnceSubscription {
    /// Wait for the event or the timeout, whichever comes first
    pub async fn wait(mut self, timeout: Duration) -> WaitOutcome<GenEvent> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(event)) => WaitOutcome::Resolved(event),
            // The sender only disappears through our own removal
            Ok(Err(_)) | Err(_) => WaitOutcome::TimedOut,
        }
    }
}

impl Drop for OnceSubscription {
    fn drop(&mut self) {
        self.bus.remove(&self.kind, self.id);
    }
}

/// Handle receiving every event of one type
pub struct StreamSubscription {
    bus: Arc<EventBus>,
    kind: String,
    id: u64,
    rx: mpsc::UnboundedReceiver<GenEvent>,
}

impl StreamSubscription {
    pub async fn next(&mut self) -> Option<GenEvent> {
        self.rx.recv().await
    }

    /// Take an already delivered event without waiting
    pub fn try_next(&mut self) -> Option<GenEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        self.bus.remove(&self.kind, self.id);
    }
}

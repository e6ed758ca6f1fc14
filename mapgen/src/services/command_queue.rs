//! Serialises access to the worker conversation
//!
//! A single-permit tokio semaphore. Its waiters are served in FIFO order, so
//! requests reach the worker in the order they arrived.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;

use crate::error::{MapError, MapResult};

pub struct CommandQueue {
    permit: Semaphore,
    waiting: AtomicUsize,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            permit: Semaphore::new(1),
            waiting: AtomicUsize::new(0),
        }
    }

    /// Run `task` once every earlier task has finished
    pub async fn run<F, T>(&self, task: F) -> MapResult<T>
    where
        F: Future<Output = MapResult<T>>,
    {
        let admitted = {
            let _waiting = WaitingGuard::enter(&self.waiting);
            self.permit.acquire().await
        };

        let _permit = admitted.map_err(|_| MapError::QueueClosed)?;
        task.await
    }

    /// Requests waiting for their turn, not counting the one in flight
    pub fn pending(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Whether a task currently holds the worker
    pub fn is_busy(&self) -> bool {
        self.permit.available_permits() == 0
    }

    /// Refuse every queued and future task
    pub fn close(&self) {
        self.permit.close();
    }
}

/// Counts a caller as waiting until admitted or cancelled
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

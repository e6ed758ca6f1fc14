//! Map service facade
//!
//! Puts the result cache in front of a generator and funnels every miss
//! through the command queue, so at most one batch is in flight at a time.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;

use shared::{process_debug, process_info, MapBatch, MapRequest, ProcessId, WorkerStatus};

use crate::error::MapResult;
use crate::services::{CommandQueue, LruCache};
use crate::traits::MapGenerator;

/// Snapshot served by the health endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceHealth {
    pub worker: WorkerStatus,
    pub cached_batches: usize,
    pub pending_requests: usize,

    /// A batch is being generated right now
    pub generating: bool,
    pub uptime_seconds: u64,
}

pub struct MapService<G: MapGenerator> {
    generator: G,
    queue: CommandQueue,
    cache: Mutex<LruCache<Arc<MapBatch>>>,
    started_at: Instant,
}

impl<G: MapGenerator> MapService<G> {
    pub fn new(generator: G, cache_capacity: usize) -> Self {
        Self {
            generator,
            queue: CommandQueue::new(),
            cache: Mutex::new(LruCache::new(cache_capacity)),
            started_at: Instant::now(),
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Maps for `(seed, difficulty, act_id)`, a negative act id meaning no act
    pub async fn map_by_id(&self, seed: u32, difficulty: u8, act_id: i32) -> MapResult<Arc<MapBatch>> {
        let request = MapRequest::try_new(seed, difficulty, act_id)?;
        self.map(request).await
    }

    /// Cached batch for `request`, generating it on a miss
    ///
    /// Hits never touch the queue. A miss re-checks the cache once it is
    /// admitted, so requests queued behind an identical one reuse its result.
    /// Failures are not cached.
    pub async fn map(&self, request: MapRequest) -> MapResult<Arc<MapBatch>> {
        let key = request.key();

        if let Some(batch) = self.cache.lock().await.get(key.as_str()) {
            process_debug!(ProcessId::Service, "Cache hit for {}", key);
            return Ok(batch);
        }

        self.queue
            .run(async {
                if let Some(batch) = self.cache.lock().await.get(key.as_str()) {
                    process_debug!(ProcessId::Service, "Cache filled while queued for {}", key);
                    return Ok(batch);
                }

                let batch = Arc::new(self.generator.generate(request).await?);
                self.cache.lock().await.set(key.clone(), Arc::clone(&batch));
                Ok(batch)
            })
            .await
    }

    pub async fn cached_batches(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Requests waiting behind the one being generated
    pub fn pending_requests(&self) -> usize {
        self.queue.pending()
    }

    pub async fn health(&self) -> ServiceHealth {
        ServiceHealth {
            worker: self.generator.status().await,
            cached_batches: self.cached_batches().await,
            pending_requests: self.pending_requests(),
            generating: self.queue.is_busy(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }

    /// Refuse further misses and stop the worker
    ///
    /// Queued requests fail with `QueueClosed`; cache hits keep being served.
    pub async fn shutdown(&self) -> MapResult<()> {
        process_info!(ProcessId::Service, "Shutting down map worker");
        self.queue.close();
        self.generator.shutdown().await
    }
}

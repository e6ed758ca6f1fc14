//! One `$map` cycle on the supervised worker

use async_trait::async_trait;
use std::time::Duration;

use shared::{
    process_debug, process_info, GenEvent, MapBatch, MapRequest, ObjectKind, ProcessId, Setting, WorkerCommand,
    WorkerStatus,
};

use super::event_bus::{OnceSubscription, StreamSubscription, WaitOutcome};
use super::process_manager::WorkerSupervisor;
use crate::error::{MapError, MapResult};
use crate::traits::{AssetCatalog, CommandRunner, MapGenerator, WorkerLauncher};

#[async_trait]
impl<L, R, C> MapGenerator for WorkerSupervisor<L, R, C>
where
    L: WorkerLauncher,
    R: CommandRunner,
    C: AssetCatalog,
{
    async fn generate(&self, request: MapRequest) -> MapResult<MapBatch> {
        self.restart_if_exhausted().await?;

        // Session state is re-asserted every time, the worker may have been restarted
        self.send_setting(Setting::Seed, request.seed.into()).await?;
        self.send_setting(Setting::Difficulty, request.difficulty.into()).await?;
        if let Some(act) = request.act {
            self.send_setting(Setting::Act, act.into()).await?;
        }

        let maps = self.event_bus().subscribe(GenEvent::MAP);
        let done = self.event_bus().subscribe_once(GenEvent::DONE);

        let generation = self.record_generation().await;
        self.write_command(WorkerCommand::GenerateMap).await?;

        let mut batch = collect_batch(maps, done, self.config().batch_timeout).await?;
        resolve_names(&mut batch, self.catalog());

        process_info!(
            ProcessId::Service,
            "🗺️ Generated {} maps for {} (batch {} on this worker)",
            batch.len(),
            request.key(),
            generation
        );
        Ok(batch)
    }

    async fn status(&self) -> WorkerStatus {
        if self.is_running() {
            WorkerStatus::Running
        } else {
            WorkerStatus::Stopped
        }
    }

    async fn shutdown(&self) -> MapResult<()> {
        self.stop().await
    }
}

/// Accumulate streamed maps until `done` or the batch timeout
///
/// Both subscriptions are dropped on return, which unregisters them.
async fn collect_batch(
    mut maps: StreamSubscription,
    done: OnceSubscription,
    timeout: Duration,
) -> MapResult<MapBatch> {
    let mut batch = MapBatch::new();

    let done_wait = done.wait(timeout);
    tokio::pin!(done_wait);

    loop {
        tokio::select! {
            biased;

            Some(event) = maps.next() => {
                if let GenEvent::Map(map) = event {
                    batch.insert(map);
                }
            }
            outcome = &mut done_wait => match outcome {
                WaitOutcome::Resolved(_) => break,
                WaitOutcome::TimedOut => {
                    return Err(MapError::timeout(
                        format!("'done' after {} maps", batch.len()),
                        timeout,
                    ));
                }
            },
        }
    }

    // `done` is published after every map of the batch, anything left is already queued
    while let Some(event) = maps.try_next() {
        if let GenEvent::Map(map) = event {
            batch.insert(map);
        }
    }

    Ok(batch)
}

/// Label placed objects from the catalog
///
/// A missing entry keeps whatever name the worker sent.
pub(crate) fn resolve_names<C: AssetCatalog + ?Sized>(batch: &mut MapBatch, catalog: &C) {
    let mut resolved = 0usize;

    for object in batch.objects_mut() {
        let name = match object.kind {
            ObjectKind::Npc => catalog.monster_name(object.id),
            ObjectKind::Object => catalog.object_name(object.id),
            ObjectKind::Exit => catalog.level_name(object.id),
            ObjectKind::Other => None,
        };

        if let Some(name) = name {
            object.name = Some(name.trim().to_string());
            resolved += 1;
        }
    }

    process_debug!(ProcessId::Service, "Resolved {} object names", resolved);
}

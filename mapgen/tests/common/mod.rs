//! Common test utilities and infrastructure
//!
//! Shared fixtures and builders for the mapgen integration suites.

#![allow(dead_code)]

pub mod stub_worker;

use std::sync::Arc;
use std::time::Duration;

use mapgen::services::{CatalogTables, RealAssetCatalog};
use mapgen::traits::MockCommandRunner;
use mapgen::{MapService, WorkerConfig, WorkerSupervisor};

pub use stub_worker::{StubBehavior, StubWorker};

/// Supervisor over the in-memory worker
pub type StubSupervisor = WorkerSupervisor<StubWorker, MockCommandRunner, RealAssetCatalog>;

/// Short timeouts and no compatibility shim
pub fn test_config() -> WorkerConfig {
    WorkerConfig::default()
        .with_compat_shim(None)
        .with_timeout(Duration::from_millis(500))
}

/// Catalog naming monster 5, object 2 and level 8
pub fn test_catalog() -> RealAssetCatalog {
    let mut tables = CatalogTables::default();
    tables.monsters.insert(5, " Zombie ".to_string());
    tables.objects.insert(2, "Chest\n".to_string());
    tables.levels.insert(8, "Den of Evil".to_string());
    RealAssetCatalog::from_tables(tables)
}

pub fn supervisor(stub: &StubWorker) -> StubSupervisor {
    supervisor_with(stub, test_config())
}

pub fn supervisor_with(stub: &StubWorker, config: WorkerConfig) -> StubSupervisor {
    WorkerSupervisor::new(config, stub.clone(), MockCommandRunner::new(), test_catalog())
}

pub fn service(stub: &StubWorker) -> Arc<MapService<StubSupervisor>> {
    let config = test_config();
    let capacity = config.cache_capacity;
    Arc::new(MapService::new(supervisor_with(stub, config), capacity))
}

/// Poll `check` until it holds or a second has passed
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

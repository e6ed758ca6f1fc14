//! Service implementations
//!
//! Real implementations of the service traits plus the worker conversation
//! built on top of them.

pub mod asset_catalog;
pub mod command_queue;
pub mod command_runner;
pub mod dispatcher;
pub mod event_bus;
pub mod generator;
pub mod launcher;
pub mod map_cache;
pub mod process_manager;
pub mod process_output_handler;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use asset_catalog::{CatalogTables, RealAssetCatalog};
pub use command_queue::CommandQueue;
pub use command_runner::RealCommandRunner;
pub use event_bus::{EventBus, OnceSubscription, StreamSubscription, WaitOutcome};
pub use launcher::RealWorkerLauncher;
pub use map_cache::LruCache;
pub use process_manager::{RealWorkerSupervisor, WorkerSupervisor};

//! Supervisor for an external map generation worker
//!
//! The worker is a long-lived child process speaking a line protocol: `$`
//! commands on stdin, newline-delimited JSON on stdout. This crate keeps one
//! worker alive, drives it one batch at a time and caches the results.

pub mod config;
pub mod error;
pub mod map_service;
pub mod services;
pub mod traits;
pub mod web;

// Re-export commonly used types
pub use config::WorkerConfig;
pub use error::{MapError, MapResult};
pub use map_service::{MapService, ServiceHealth};
pub use services::{RealWorkerSupervisor, WorkerSupervisor};
pub use traits::{AssetCatalog, CommandRunner, MapGenerator, WorkerChild, WorkerLauncher};

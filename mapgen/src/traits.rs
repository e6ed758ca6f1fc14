//! Trait definitions with mockall annotations for testing
//!
//! Every collaborator of the worker supervisor sits behind one of these traits
//! so the supervisor can be driven against an in-memory worker in tests.

use shared::{MapBatch, MapRequest, WorkerStatus};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::MapResult;

/// Captured result of an external helper command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Pipes and control handle of a freshly launched worker
pub struct WorkerIo {
    pub stdin: Box<dyn AsyncWrite + Send + Unpin>,
    pub stdout: Box<dyn AsyncRead + Send + Unpin>,
    pub stderr: Option<Box<dyn AsyncRead + Send + Unpin>>,
    pub child: Box<dyn WorkerChild>,
}

/// Name lookups used to label generated objects
///
/// `load` is called on every worker start so the tables can be refreshed.
#[mockall::automock]
#[async_trait::async_trait]
pub trait AssetCatalog: Send + Sync {
    /// Load or refresh the lookup tables
    async fn load(&self) -> MapResult<()>;

    fn monster_name(&self, id: u32) -> Option<String>;

    fn object_name(&self, id: u32) -> Option<String>;

    fn level_name(&self, id: u32) -> Option<String>;
}

/// Runs a helper program to completion and captures its output
#[mockall::automock]
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> MapResult<CommandOutput>;
}

/// Spawns the worker executable with piped stdio
#[mockall::automock]
#[async_trait::async_trait]
pub trait WorkerLauncher: Send + Sync {
    async fn launch(&self) -> MapResult<WorkerIo>;
}

/// Lifetime handle of a launched worker, owned by the exit watcher
#[mockall::automock]
#[async_trait::async_trait]
pub trait WorkerChild: Send {
    fn id(&self) -> Option<u32>;

    /// Wait for exit and return the exit code (`None` when killed by a signal)
    async fn wait(&mut self) -> MapResult<Option<i32>>;

    /// Forcibly terminate and reap the process
    async fn kill(&mut self) -> MapResult<()>;
}

/// Something that turns a request into a batch of maps
///
/// Implemented by the worker supervisor; the service layer adds queueing and
/// caching on top.
#[mockall::automock]
#[async_trait::async_trait]
pub trait MapGenerator: Send + Sync {
    async fn generate(&self, request: MapRequest) -> MapResult<MapBatch>;

    async fn status(&self) -> WorkerStatus;

    async fn shutdown(&self) -> MapResult<()>;
}

//! Spawns the real worker executable

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::{Child, Command};

use shared::{process_debug, ProcessId};

use crate::config::WorkerConfig;
use crate::error::{MapError, MapResult};
use crate::traits::{WorkerChild, WorkerIo, WorkerLauncher};

/// Launches `<shim> <worker_exe> <game_path>` with all three pipes attached
#[derive(Debug, Clone)]
pub struct RealWorkerLauncher {
    config: WorkerConfig,
}

impl RealWorkerLauncher {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = match &self.config.compat_shim {
            Some(shim) => {
                let mut cmd = Command::new(shim);
                cmd.arg(&self.config.worker_exe);
                cmd
            }
            None => Command::new(&self.config.worker_exe),
        };

        cmd.arg(&self.config.game_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl WorkerLauncher for RealWorkerLauncher {
    async fn launch(&self) -> MapResult<WorkerIo> {
        let mut child = self
            .command()
            .spawn()
            .map_err(|e| MapError::start(format!("failed to spawn {}: {e}", self.config.worker_exe.display())))?;

        let stdin = child.stdin.take().ok_or_else(|| MapError::start("worker stdin not piped"))?;
        let stdout = child.stdout.take().ok_or_else(|| MapError::start("worker stdout not piped"))?;
        let stderr = child.stderr.take();

        process_debug!(ProcessId::Service, "Spawned worker (PID: {:?})", child.id());

        Ok(WorkerIo {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: stderr.map(|s| Box::new(s) as Box<dyn tokio::io::AsyncRead + Send + Unpin>),
            child: Box::new(child),
        })
    }
}

#[async_trait]
impl WorkerChild for Child {
    fn id(&self) -> Option<u32> {
        Child::id(self)
    }

    async fn wait(&mut self) -> MapResult<Option<i32>> {
        let status = Child::wait(self).await?;
        Ok(status.code())
    }

    async fn kill(&mut self) -> MapResult<()> {
        Child::kill(self).await?;
        Ok(())
    }
}

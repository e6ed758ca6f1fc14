//! Real helper command execution

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MapError, MapResult};
use crate::traits::{CommandOutput, CommandRunner};

/// Runs helper programs (shim version query, registry import) to completion
#[derive(Debug, Clone, Default)]
pub struct RealCommandRunner;

impl RealCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for RealCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> MapResult<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| MapError::CommandFailed {
                command: format!("{program} {}", args.join(" ")),
                message: e.to_string(),
            })?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

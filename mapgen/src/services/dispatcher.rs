//! Acknowledged setting commands
//!
//! `$seed`, `$difficulty` and `$act` are answered by an `info` event echoing
//! the applied value. The subscription is registered before the command is
//! written so a fast acknowledgment cannot slip past.

use serde_json::{Map, Value};
use shared::{process_debug, GenEvent, ProcessId, Setting, WorkerCommand};

use super::event_bus::WaitOutcome;
use super::process_manager::WorkerSupervisor;
use crate::error::{MapError, MapResult};
use crate::traits::{AssetCatalog, CommandRunner, WorkerLauncher};

impl<L, R, C> WorkerSupervisor<L, R, C>
where
    L: WorkerLauncher,
    R: CommandRunner,
    C: AssetCatalog,
{
    /// Apply one setting on the worker and verify the echoed value
    pub async fn send_setting(&self, setting: Setting, value: i64) -> MapResult<()> {
        self.ensure_running().await?;

        let command = WorkerCommand::Set { setting, value };
        let ack = self.event_bus().subscribe_once(GenEvent::INFO);
        self.write_command(command).await?;

        let timeout = self.config().command_timeout;
        match ack.wait(timeout).await {
            WaitOutcome::Resolved(GenEvent::Info(fields)) => verify_ack(&command, setting, value, &fields),
            WaitOutcome::Resolved(other) => Err(MapError::ProtocolViolation {
                command: command.to_string(),
                expected: value,
                raw: serde_json::to_string(&other)?,
            }),
            WaitOutcome::TimedOut => Err(MapError::timeout(format!("acknowledgment of '{command}'"), timeout)),
        }
    }
}

fn verify_ack(command: &WorkerCommand, setting: Setting, value: i64, fields: &Map<String, Value>) -> MapResult<()> {
    let echoed = fields.get(setting.name()).and_then(Value::as_i64);

    if echoed == Some(value) {
        process_debug!(ProcessId::Service, "✔️ {} acknowledged", command);
        return Ok(());
    }

    Err(MapError::ProtocolViolation {
        command: command.to_string(),
        expected: value,
        raw: Value::Object(fields.clone()).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(json: &str) -> Map<String, Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_matching_ack() {
        let command = WorkerCommand::set(Setting::Seed, 42);
        assert!(verify_ack(&command, Setting::Seed, 42, &fields(r#"{"seed":42}"#)).is_ok());
    }

    #[test]
    fn test_mismatched_ack_carries_raw_output() {
        let command = WorkerCommand::set(Setting::Seed, 42);
        let err = verify_ack(&command, Setting::Seed, 42, &fields(r#"{"seed":999}"#)).unwrap_err();

        match err {
            MapError::ProtocolViolation { command, expected, raw } => {
                assert_eq!(command, "$seed 42");
                assert_eq!(expected, 42);
                assert!(raw.contains("999"));
            }
            other => panic!("expected protocol violation, got {other:?}"),
        }
    }

    #[test]
    fn test_ack_for_other_setting_is_rejected() {
        let command = WorkerCommand::set(Setting::Act, 1);
        assert!(verify_ack(&command, Setting::Act, 1, &fields(r#"{"difficulty":1}"#)).is_err());
    }
}

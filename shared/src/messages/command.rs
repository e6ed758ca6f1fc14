//! Commands written to the worker's stdin

use std::fmt;
use std::str::FromStr;

use crate::errors::SharedError;

/// Worker session settings that must be re-asserted before every batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    Seed,
    Difficulty,
    Act,
}

impl Setting {
    /// Command name, also the field the worker echoes in its `info` event
    pub fn name(&self) -> &'static str {
        match self {
            Setting::Seed => "seed",
            Setting::Difficulty => "difficulty",
            Setting::Act => "act",
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One line of the stdin protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    Set { setting: Setting, value: i64 },
    GenerateMap,
}

impl WorkerCommand {
    pub fn set(setting: Setting, value: impl Into<i64>) -> Self {
        WorkerCommand::Set {
            setting,
            value: value.into(),
        }
    }

    /// Newline-terminated form written to the worker
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for WorkerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerCommand::Set { setting, value } => write!(f, "${setting} {value}"),
            WorkerCommand::GenerateMap => f.write_str("$map"),
        }
    }
}

impl FromStr for WorkerCommand {
    type Err = SharedError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let protocol_error = || SharedError::ProtocolError {
            message: format!("unrecognised command: {line:?}"),
        };

        let mut parts = line.split_whitespace();
        let setting = match parts.next() {
            Some("$map") => return Ok(WorkerCommand::GenerateMap),
            Some("$seed") => Setting::Seed,
            Some("$difficulty") => Setting::Difficulty,
            Some("$act") => Setting::Act,
            _ => return Err(protocol_error()),
        };

        let value = parts
            .next()
            .and_then(|raw| raw.parse::<i64>().ok())
            .ok_or_else(protocol_error)?;

        Ok(WorkerCommand::Set { setting, value })
    }
}

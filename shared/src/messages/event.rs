//! Messages read from the worker's stdout

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::map::GeneratedMap;

/// Minimum worker log level that gets surfaced (pino "info")
pub const INFO_LEVEL: u8 = 30;

/// Structured log line emitted by the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Epoch milliseconds, the field that tells log lines apart from events
    pub time: i64,
    pub level: u8,
    #[serde(default)]
    pub msg: String,
}

impl LogRecord {
    pub fn is_surfaced(&self) -> bool {
        self.level >= INFO_LEVEL
    }
}

/// Generation protocol event, discriminated by its `type` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GenEvent {
    /// Worker finished loading and accepts commands
    Init,
    /// Acknowledgment echoing the setting that was just applied
    Info(Map<String, Value>),
    /// One generated map of the current batch
    Map(GeneratedMap),
    /// Current batch is complete
    Done,
    #[serde(other)]
    Unknown,
}

impl GenEvent {
    pub const INIT: &'static str = "init";
    pub const INFO: &'static str = "info";
    pub const MAP: &'static str = "map";
    pub const DONE: &'static str = "done";

    /// Event type string used to route the event on the bus
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            GenEvent::Init => Some(Self::INIT),
            GenEvent::Info(_) => Some(Self::INFO),
            GenEvent::Map(_) => Some(Self::MAP),
            GenEvent::Done => Some(Self::DONE),
            GenEvent::Unknown => None,
        }
    }
}

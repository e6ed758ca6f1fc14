//! Worker wire protocol
//!
//! The worker reads newline-terminated commands on stdin and writes one JSON
//! object per line on stdout. A stdout line is either a log record (it carries
//! a `time` field) or a generation event (it carries a `type` field).

pub mod command;
pub mod event;
pub mod map;

pub use command::{Setting, WorkerCommand};
pub use event::{GenEvent, LogRecord, INFO_LEVEL};
pub use map::{GeneratedMap, MapBatch, MapObject, ObjectKind};

use serde::Deserialize;
use serde_json::Value;

/// A classified stdout line
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolMessage {
    Log(LogRecord),
    Event(GenEvent),
}

/// Classify one stdout line, `None` for anything that is not a protocol message
///
/// A log record decode is attempted first, a generation event second.
pub fn parse_line(line: &str) -> Option<ProtocolMessage> {
    let value: Value = serde_json::from_str(line.trim()).ok()?;

    if let Ok(record) = LogRecord::deserialize(&value) {
        return Some(ProtocolMessage::Log(record));
    }

    GenEvent::deserialize(value).ok().map(ProtocolMessage::Event)
}

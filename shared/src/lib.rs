//! Shared types for the map worker service
//!
//! Contains the worker wire protocol (commands written to stdin, messages read
//! from stdout), the request/key types and the logging setup used by every
//! binary in the workspace.

pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use errors::*;
pub use types::*;

// Re-export the worker protocol
pub use messages::{
    // stdin side
    Setting, WorkerCommand,

    // stdout side
    parse_line, GenEvent, LogRecord, ProtocolMessage,

    // Generated content
    GeneratedMap, MapBatch, MapObject, ObjectKind,
};

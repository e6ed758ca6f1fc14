//! Core types used throughout the map worker service

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{SharedError, SharedResult};

/// Highest difficulty the worker understands (0 normal, 1 nightmare, 2 hell)
pub const MAX_DIFFICULTY: u8 = 2;

/// Highest act id the worker understands (acts are zero based)
pub const MAX_ACT: u8 = 4;

/// Identifies the source of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessId {
    /// The supervising service itself
    Service,
    /// A worker process, numbered by how many have been started so far
    Worker(u64),
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessId::Service => write!(f, "mapgen"),
            ProcessId::Worker(instance) => write!(f, "worker_{instance}"),
        }
    }
}

/// Status of the supervised worker process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Stopped,
    Running,
}

/// A single map generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapRequest {
    pub seed: u32,
    pub difficulty: u8,
    /// `None` leaves the act selection to the worker
    pub act: Option<u8>,
}

impl MapRequest {
    pub fn new(seed: u32, difficulty: u8, act: Option<u8>) -> Self {
        Self { seed, difficulty, act }
    }

    /// Build a request from raw caller input, where any negative act id means "no act"
    pub fn try_new(seed: u32, difficulty: u8, act_id: i32) -> SharedResult<Self> {
        if difficulty > MAX_DIFFICULTY {
            return Err(SharedError::InvalidRequest {
                field: "difficulty".to_string(),
                value: difficulty.to_string(),
            });
        }

        let act = if act_id < 0 {
            None
        } else {
            match u8::try_from(act_id) {
                Ok(act) if act <= MAX_ACT => Some(act),
                _ => {
                    return Err(SharedError::InvalidRequest {
                        field: "act".to_string(),
                        value: act_id.to_string(),
                    })
                }
            }
        };

        Ok(Self::new(seed, difficulty, act))
    }

    /// Act id as the cache key and callers see it (`-1` when unset)
    pub fn act_id(&self) -> i32 {
        self.act.map_or(-1, i32::from)
    }

    /// Composite cache key `{seed}_{difficulty}_{actId}`
    pub fn key(&self) -> MapKey {
        MapKey(format!("{}_{}_{}", self.seed, self.difficulty, self.act_id()))
    }
}

/// Cache key for a generated batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapKey(String);

impl MapKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<MapKey> for String {
    fn from(key: MapKey) -> Self {
        key.0
    }
}

//! Worker and service configuration
//!
//! Defaults match the worker's expectations; every value can be overridden
//! from `MAPGEN_*` environment variables (a `.env` file is honoured) or with
//! the fluent setters.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{MapError, MapResult};

/// Seconds allowed for the init handshake, each acknowledgment and each batch
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A worker generates this many batches before it is recycled (compared with `>`)
pub const DEFAULT_MAX_GENERATIONS: u32 = 10;

pub const DEFAULT_CACHE_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Compatibility shim the worker runs under, `None` to execute it directly
    pub compat_shim: Option<PathBuf>,

    /// Worker executable
    pub worker_exe: PathBuf,

    /// Game data location handed to the worker as its only argument
    pub game_path: PathBuf,

    /// Registry file imported through the shim before the first start
    pub registry_file: Option<PathBuf>,

    /// JSON asset catalog used to name generated objects
    pub assets_file: Option<PathBuf>,

    pub start_timeout: Duration,
    pub command_timeout: Duration,
    pub batch_timeout: Duration,

    pub max_generations: u32,
    pub cache_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            compat_shim: Some(PathBuf::from("wine")),
            worker_exe: PathBuf::from("bin/d2-map.exe"),
            game_path: PathBuf::from("/app/game"),
            registry_file: None,
            assets_file: None,
            start_timeout: DEFAULT_TIMEOUT,
            command_timeout: DEFAULT_TIMEOUT,
            batch_timeout: DEFAULT_TIMEOUT,
            max_generations: DEFAULT_MAX_GENERATIONS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from the environment on top of the defaults
    pub fn from_env() -> MapResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MapResult<Self> {
        let mut config = Self::default();

        if let Some(shim) = lookup("MAPGEN_WINE") {
            config.compat_shim = (!shim.trim().is_empty()).then(|| PathBuf::from(shim));
        }
        if let Some(exe) = lookup("MAPGEN_WORKER_EXE") {
            config.worker_exe = PathBuf::from(exe);
        }
        if let Some(game_path) = lookup("MAPGEN_GAME_PATH") {
            config.game_path = PathBuf::from(game_path);
        }
        if let Some(registry) = lookup("MAPGEN_REGISTRY_FILE") {
            config.registry_file = Some(PathBuf::from(registry));
        }
        if let Some(assets) = lookup("MAPGEN_ASSETS") {
            config.assets_file = Some(PathBuf::from(assets));
        }
        if let Some(raw) = lookup("MAPGEN_TIMEOUT_SECS") {
            let secs = parse_number::<u64>("MAPGEN_TIMEOUT_SECS", &raw)?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(raw) = lookup("MAPGEN_MAX_GENERATIONS") {
            config.max_generations = parse_number("MAPGEN_MAX_GENERATIONS", &raw)?;
        }
        if let Some(raw) = lookup("MAPGEN_CACHE_CAPACITY") {
            config.cache_capacity = parse_number("MAPGEN_CACHE_CAPACITY", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MapResult<()> {
        if self.cache_capacity == 0 {
            return Err(MapError::config("cache_capacity must be at least 1"));
        }
        if self.start_timeout.is_zero() || self.command_timeout.is_zero() || self.batch_timeout.is_zero() {
            return Err(MapError::config("timeouts must be non-zero"));
        }
        Ok(())
    }

    /// Configure the shim (fluent API)
    pub fn with_compat_shim(mut self, shim: Option<PathBuf>) -> Self {
        self.compat_shim = shim;
        self
    }

    /// Configure worker executable (fluent API)
    pub fn with_worker_exe(mut self, exe: impl Into<PathBuf>) -> Self {
        self.worker_exe = exe.into();
        self
    }

    /// Configure game data path (fluent API)
    pub fn with_game_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.game_path = path.into();
        self
    }

    /// Configure registry import (fluent API)
    pub fn with_registry_file(mut self, file: Option<PathBuf>) -> Self {
        self.registry_file = file;
        self
    }

    /// Configure asset catalog file (fluent API)
    pub fn with_assets_file(mut self, file: Option<PathBuf>) -> Self {
        self.assets_file = file;
        self
    }

    /// Apply one timeout to start, acknowledgment and batch waits (fluent API)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self.command_timeout = timeout;
        self.batch_timeout = timeout;
        self
    }

    /// Configure restart threshold (fluent API)
    pub fn with_max_generations(mut self, max: u32) -> Self {
        self.max_generations = max;
        self
    }

    /// Configure cache size (fluent API)
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> MapResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| MapError::config(format!("{name} is not a number: {raw}")))
}

//! Main entry point for the mapgen binary

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use mapgen::{MapService, RealWorkerSupervisor, WorkerConfig};
use shared::{logging, process_debug, ProcessId};

/// Supervises the map generation worker and serves its batches
#[derive(Parser)]
#[command(name = "mapgen")]
#[command(about = "Generates game maps through a supervised worker process")]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Worker executable (overrides MAPGEN_WORKER_EXE)
    #[arg(long)]
    pub worker_exe: Option<PathBuf>,

    /// Game data directory (overrides MAPGEN_GAME_PATH)
    #[arg(long)]
    pub game_path: Option<PathBuf>,

    /// Asset catalog JSON (overrides MAPGEN_ASSETS)
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// Run the worker directly instead of under the compatibility shim
    #[arg(long)]
    pub no_shim: bool,

    /// Timeout in seconds for start, acknowledgments and batches
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate one batch and print it as JSON
    Generate {
        #[arg(long)]
        seed: u32,

        #[arg(long)]
        difficulty: u8,

        /// Act id, omit or pass a negative value for none
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        act: i32,
    },

    /// Serve batches over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:8899")]
        addr: SocketAddr,
    },
}

impl Args {
    fn worker_config(&self) -> anyhow::Result<WorkerConfig> {
        let mut config = WorkerConfig::from_env().context("loading MAPGEN_* configuration")?;

        if let Some(exe) = &self.worker_exe {
            config = config.with_worker_exe(exe.clone());
        }
        if let Some(game_path) = &self.game_path {
            config = config.with_game_path(game_path.clone());
        }
        if let Some(assets) = &self.assets {
            config = config.with_assets_file(Some(assets.clone()));
        }
        if self.no_shim {
            config = config.with_compat_shim(None);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_tracing(Some(&args.log_level));

    let config = args.worker_config()?;
    process_debug!(ProcessId::Service, "Worker configuration: {:?}", config);

    let cache_capacity = config.cache_capacity;
    let service = Arc::new(MapService::new(RealWorkerSupervisor::from_config(config), cache_capacity));

    let result = match args.command {
        Command::Generate { seed, difficulty, act } => generate(&service, seed, difficulty, act).await,
        Command::Serve { addr } => serve(&service, addr).await,
    };

    service.shutdown().await.context("stopping worker")?;
    result
}

async fn generate(
    service: &MapService<RealWorkerSupervisor>,
    seed: u32,
    difficulty: u8,
    act: i32,
) -> anyhow::Result<()> {
    let batch = service
        .map_by_id(seed, difficulty, act)
        .await
        .with_context(|| format!("generating maps for seed {seed}, difficulty {difficulty}, act {act}"))?;

    println!("{}", serde_json::to_string_pretty(&*batch)?);
    Ok(())
}

async fn serve(service: &Arc<MapService<RealWorkerSupervisor>>, addr: SocketAddr) -> anyhow::Result<()> {
    logging::log_startup(&ProcessId::Service, "map service (HTTP mode)");

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => logging::log_shutdown(&ProcessId::Service, "Received Ctrl+C signal"),
            Err(err) => logging::log_error(&ProcessId::Service, "Signal handling", &err),
        }
    };

    mapgen::web::serve(Arc::clone(service), addr, shutdown)
        .await
        .with_context(|| format!("serving on {addr}"))?;

    logging::log_success(&ProcessId::Service, "Map service stopped gracefully");
    Ok(())
}

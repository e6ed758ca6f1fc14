//! Worker process supervision
//!
//! Owns the single worker session: starting it (with the `init` handshake),
//! stopping it, noticing when it died and writing commands to its stdin.
//! The command conversation itself lives in `dispatcher` and `generator`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;

use shared::{logging, process_debug, process_error, process_info, process_warn, GenEvent, ProcessId, WorkerCommand};

use super::asset_catalog::RealAssetCatalog;
use super::command_runner::RealCommandRunner;
use super::event_bus::{EventBus, WaitOutcome};
use super::launcher::RealWorkerLauncher;
use super::process_output_handler::{spawn_stderr_reader, spawn_stdout_reader};
use crate::config::WorkerConfig;
use crate::error::{MapError, MapResult};
use crate::traits::{AssetCatalog, CommandOutput, CommandRunner, WorkerChild, WorkerLauncher};

/// How long a stop waits for the killed worker to be reaped
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Supervisor wired to the real process, helper commands and catalog file
pub type RealWorkerSupervisor = WorkerSupervisor<RealWorkerLauncher, RealCommandRunner, RealAssetCatalog>;

/// Live worker process and everything attached to it
struct WorkerSession {
    process_id: ProcessId,
    stdin: Box<dyn AsyncWrite + Send + Unpin>,

    /// Batches generated since this process started
    generated: u32,

    /// Flips to true once the exit watcher sees the process go away
    exited: watch::Receiver<bool>,
    kill_tx: Option<oneshot::Sender<()>>,
    watcher: JoinHandle<()>,
    readers: Vec<JoinHandle<()>>,
}

impl WorkerSession {
    fn is_alive(&self) -> bool {
        !*self.exited.borrow()
    }

    /// Kill the process (if still alive), reap it and detach the readers
    async fn shutdown(mut self) {
        if let Some(kill_tx) = self.kill_tx.take() {
            let _ = kill_tx.send(());
        }

        if tokio::time::timeout(KILL_GRACE, &mut self.watcher).await.is_err() {
            process_warn!(self.process_id, "Exit watcher did not finish within {:?}", KILL_GRACE);
            self.watcher.abort();
        }

        for reader in &self.readers {
            reader.abort();
        }
    }
}

/// Supervises one worker process
///
/// Meant to be owned by a single service; there is no global instance.
pub struct WorkerSupervisor<L, R, C>
where
    L: WorkerLauncher,
    R: CommandRunner,
    C: AssetCatalog,
{
    config: WorkerConfig,

    /// Injected services
    launcher: L,
    runner: R,
    catalog: C,

    bus: Arc<EventBus>,
    session: Mutex<Option<WorkerSession>>,

    /// Exit flag of the installed session, readable while `session` is held
    liveness: StdMutex<Option<watch::Receiver<bool>>>,

    /// Launch attempts over the supervisor's lifetime
    instances: AtomicU64,

    /// Set once the one-time registry import succeeded
    environment_ready: AtomicBool,
}

impl RealWorkerSupervisor {
    /// Build a supervisor for the real worker executable
    pub fn from_config(config: WorkerConfig) -> Self {
        let catalog = RealAssetCatalog::new(config.assets_file.clone());
        let launcher = RealWorkerLauncher::new(config.clone());
        WorkerSupervisor::new(config, launcher, RealCommandRunner::new(), catalog)
    }
}

impl<L, R, C> WorkerSupervisor<L, R, C>
where
    L: WorkerLauncher,
    R: CommandRunner,
    C: AssetCatalog,
{
    /// Create new supervisor with injected dependencies
    pub fn new(config: WorkerConfig, launcher: L, runner: R, catalog: C) -> Self {
        Self {
            config,
            launcher,
            runner,
            catalog,
            bus: EventBus::new(),
            session: Mutex::new(None),
            liveness: StdMutex::new(None),
            instances: AtomicU64::new(0),
            environment_ready: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub(crate) fn catalog(&self) -> &C {
        &self.catalog
    }

    /// How many worker launches have been attempted so far
    pub fn instances_started(&self) -> u64 {
        self.instances.load(Ordering::SeqCst)
    }

    /// Whether a started worker is alive
    ///
    /// Never waits on the session lock, so it answers promptly while a start
    /// is still waiting for `init`. A worker counts only once it is ready.
    pub fn is_running(&self) -> bool {
        self.liveness
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|exited| !*exited.borrow())
    }

    fn set_liveness(&self, exited: Option<watch::Receiver<bool>>) {
        *self.liveness.lock().unwrap_or_else(PoisonError::into_inner) = exited;
    }

    /// Batches generated by the current process (0 when none is running)
    pub async fn generated_count(&self) -> u32 {
        self.session.lock().await.as_ref().map_or(0, |session| session.generated)
    }

    /// Start the worker and wait for its `init` event
    ///
    /// A live worker makes this a no-op. On failure the half-started process
    /// is killed and the caller decides whether to retry.
    pub async fn start(&self) -> MapResult<()> {
        let mut session = self.session.lock().await;

        if let Some(current) = session.as_ref() {
            if current.is_alive() {
                process_warn!(current.process_id, "⚠️ Worker already running, ignoring start");
                return Ok(());
            }
        }

        if let Some(dead) = session.take() {
            process_debug!(dead.process_id, "Clearing exited worker");
            self.set_liveness(None);
            dead.shutdown().await;
        }

        let started = self.spawn_session().await?;
        self.set_liveness(Some(started.exited.clone()));
        *session = Some(started);
        Ok(())
    }

    /// Kill the worker if one is running
    pub async fn stop(&self) -> MapResult<()> {
        let session = self.session.lock().await.take();
        self.set_liveness(None);

        if let Some(session) = session {
            let process_id = session.process_id;
            session.shutdown().await;
            logging::log_shutdown(&process_id, "worker stopped");
        }

        Ok(())
    }

    pub async fn restart(&self) -> MapResult<()> {
        self.stop().await?;
        self.start().await
    }

    /// Start a worker unless a live one exists
    pub async fn ensure_running(&self) -> MapResult<()> {
        if self.is_running() {
            return Ok(());
        }
        self.start().await
    }

    /// Recycle the worker once it generated more than the configured number of batches
    pub(crate) async fn restart_if_exhausted(&self) -> MapResult<()> {
        let generated = self.generated_count().await;
        if generated > self.config.max_generations {
            process_info!(
                ProcessId::Service,
                "♻️ Worker generated {} batches (limit {}), restarting",
                generated,
                self.config.max_generations
            );
            self.restart().await?;
        }
        Ok(())
    }

    /// Count one more batch against the current process
    pub(crate) async fn record_generation(&self) -> u32 {
        let mut session = self.session.lock().await;
        match session.as_mut() {
            Some(current) => {
                current.generated += 1;
                current.generated
            }
            None => 0,
        }
    }

    /// Write one command line to the worker
    ///
    /// A missing or dead worker, or a failed write, is reported as
    /// `ProcessDied` and clears the session so the next call restarts it.
    pub(crate) async fn write_command(&self, command: WorkerCommand) -> MapResult<()> {
        let mut guard = self.session.lock().await;

        let Some(session) = guard.as_mut().filter(|session| session.is_alive()) else {
            if let Some(dead) = guard.take() {
                self.set_liveness(None);
                dead.shutdown().await;
            }
            return Err(MapError::process_died(format!("no running worker to receive '{command}'")));
        };

        let process_id = session.process_id;
        let written = write_line(&mut session.stdin, &command.to_line()).await;

        match written {
            Ok(()) => {
                process_debug!(process_id, "➡️ {}", command);
                Ok(())
            }
            Err(e) => {
                if let Some(dead) = guard.take() {
                    self.set_liveness(None);
                    dead.shutdown().await;
                }
                Err(MapError::process_died(format!("writing '{command}' failed: {e}")))
            }
        }
    }

    async fn spawn_session(&self) -> MapResult<WorkerSession> {
        self.catalog.load().await?;
        self.prepare_environment().await?;

        let instance = self.instances.fetch_add(1, Ordering::SeqCst) + 1;
        let process_id = ProcessId::Worker(instance);
        logging::log_startup(&process_id, "map worker");

        // Registered before the process can say anything
        let init = self.bus.subscribe_once(GenEvent::INIT);

        let io = self.launcher.launch().await?;

        let (exited_tx, mut exited_rx) = watch::channel(false);
        let (kill_tx, kill_rx) = oneshot::channel();

        let mut readers = vec![spawn_stdout_reader(io.stdout, Arc::clone(&self.bus), process_id)];
        if let Some(stderr) = io.stderr {
            readers.push(spawn_stderr_reader(stderr, process_id));
        }
        let watcher = spawn_exit_watcher(io.child, kill_rx, exited_tx, process_id);

        let session = WorkerSession {
            process_id,
            stdin: io.stdin,
            generated: 0,
            exited: exited_rx.clone(),
            kill_tx: Some(kill_tx),
            watcher,
            readers,
        };

        let timeout = self.config.start_timeout;
        let ready = tokio::select! {
            outcome = init.wait(timeout) => match outcome {
                WaitOutcome::Resolved(_) => Ok(()),
                WaitOutcome::TimedOut => Err(MapError::start(format!("no init event within {timeout:?}"))),
            },
            _ = wait_for_exit(&mut exited_rx) => Err(MapError::start("worker exited before init")),
        };

        match ready {
            Ok(()) => {
                logging::log_success(&process_id, "Worker ready");
                Ok(session)
            }
            Err(e) => {
                logging::log_error(&process_id, "Worker start", &e);
                session.shutdown().await;
                Err(e)
            }
        }
    }

    /// Query the shim version and apply the one-time registry import
    async fn prepare_environment(&self) -> MapResult<()> {
        let Some(shim) = &self.config.compat_shim else {
            return Ok(());
        };
        let shim = shim.to_string_lossy();

        let version = self.run_helper(&shim, &["--version".to_string()]).await?;
        if version.is_success() {
            process_info!(ProcessId::Service, "🍷 Compatibility layer: {}", version.stdout.trim());
        } else {
            process_warn!(ProcessId::Service, "Compatibility layer version query failed: {}", version.stderr.trim());
        }

        if self.environment_ready.load(Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(registry) = &self.config.registry_file {
            let args = vec!["regedit".to_string(), registry.to_string_lossy().into_owned()];
            let output = self.run_helper(&shim, &args).await?;
            if !output.is_success() {
                return Err(MapError::start(format!(
                    "registry import of {} failed ({:?}): {}",
                    registry.display(),
                    output.status,
                    output.stderr.trim()
                )));
            }
            process_debug!(ProcessId::Service, "Imported registry file {}", registry.display());
        }

        self.environment_ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Run a helper command, bounded by the start timeout
    async fn run_helper(&self, program: &str, args: &[String]) -> MapResult<CommandOutput> {
        let timeout = self.config.start_timeout;
        match tokio::time::timeout(timeout, self.runner.run(program, args)).await {
            Ok(output) => output,
            Err(_) => Err(MapError::start(format!(
                "'{} {}' did not finish within {:?}",
                program,
                args.join(" "),
                timeout
            ))),
        }
    }
}

async fn write_line(stdin: &mut (dyn AsyncWrite + Send + Unpin), line: &str) -> std::io::Result<()> {
    stdin.write_all(line.as_bytes()).await?;
    stdin.flush().await
}

async fn wait_for_exit(exited: &mut watch::Receiver<bool>) {
    let _ = exited.wait_for(|exited| *exited).await;
}

/// Own the child until it exits or a kill is requested
///
/// Dropping the kill sender counts as a kill request.
fn spawn_exit_watcher(
    mut child: Box<dyn WorkerChild>,
    mut kill_rx: oneshot::Receiver<()>,
    exited_tx: watch::Sender<bool>,
    process_id: ProcessId,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            status = child.wait() => match status {
                Ok(Some(0)) => {
                    process_info!(process_id, "Worker exited");
                }
                Ok(Some(code)) => {
                    process_error!(process_id, "💀 Worker exited with code {}", code);
                }
                Ok(None) => {
                    process_warn!(process_id, "Worker terminated by signal");
                }
                Err(e) => {
                    process_error!(process_id, "Waiting on worker failed: {}", e);
                }
            },
            _ = &mut kill_rx => {
                if let Err(e) = child.kill().await {
                    process_warn!(process_id, "Killing worker failed: {}", e);
                }
                process_debug!(process_id, "🛑 Worker killed");
            }
        }

        let _ = exited_tx.send(true);
    })
}

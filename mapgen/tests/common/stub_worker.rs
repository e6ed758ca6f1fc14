//! In-memory stand-in for the map worker executable
//!
//! Each launch spawns a task that speaks the worker's line protocol over
//! `tokio::io::duplex` pipes. Behaviour can be changed between launches and
//! every command line the supervisor writes is recorded.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use mapgen::traits::{WorkerChild, WorkerIo, WorkerLauncher};
use mapgen::MapResult;
use shared::{Setting, WorkerCommand};

/// How the next launched worker behaves
#[derive(Debug, Clone)]
pub struct StubBehavior {
    /// Emit `init` after start-up
    pub send_init: bool,

    /// Exit with this code right after start-up, before `init`
    pub exit_on_start: Option<i32>,

    /// Echo this value instead of the requested seed
    pub seed_echo: Option<i64>,

    /// Emit `done` after the maps of a batch
    pub send_done: bool,

    pub maps_per_batch: u32,

    /// Objects placed on every generated map
    pub objects: Vec<Value>,
}

impl Default for StubBehavior {
    fn default() -> Self {
        Self {
            send_init: true,
            exit_on_start: None,
            seed_echo: None,
            send_done: true,
            maps_per_batch: 2,
            objects: Vec::new(),
        }
    }
}

#[derive(Default)]
struct StubState {
    behavior: Mutex<StubBehavior>,
    commands: Mutex<Vec<String>>,
    spawns: AtomicUsize,
    crash_tx: Mutex<Option<oneshot::Sender<i32>>>,
}

/// Launcher handing out in-memory workers
#[derive(Clone, Default)]
pub struct StubWorker {
    state: Arc<StubState>,
}

impl StubWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: StubBehavior) -> Self {
        let stub = Self::default();
        stub.set_behavior(behavior);
        stub
    }

    /// Applies to workers launched from now on
    pub fn set_behavior(&self, behavior: StubBehavior) {
        *lock(&self.state.behavior) = behavior;
    }

    pub fn update_behavior(&self, update: impl FnOnce(&mut StubBehavior)) {
        update(&mut *lock(&self.state.behavior));
    }

    pub fn spawn_count(&self) -> usize {
        self.state.spawns.load(Ordering::SeqCst)
    }

    /// Every command line received so far, across all launches
    pub fn commands(&self) -> Vec<String> {
        lock(&self.state.commands).clone()
    }

    pub fn count_commands(&self, prefix: &str) -> usize {
        self.commands().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Make the current worker exit with `code` as if it crashed
    pub fn crash(&self, code: i32) -> bool {
        lock(&self.state.crash_tx).take().is_some_and(|tx| tx.send(code).is_ok())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl WorkerLauncher for StubWorker {
    async fn launch(&self) -> MapResult<WorkerIo> {
        self.state.spawns.fetch_add(1, Ordering::SeqCst);

        let (stdin_writer, stdin_reader) = tokio::io::duplex(64 * 1024);
        let (stdout_writer, stdout_reader) = tokio::io::duplex(64 * 1024);
        let (crash_tx, crash_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = watch::channel(None);

        *lock(&self.state.crash_tx) = Some(crash_tx);
        let behavior = lock(&self.state.behavior).clone();

        let state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            let code = run_worker(state, behavior, stdin_reader, stdout_writer, crash_rx).await;
            let _ = exit_tx.send(Some(code));
        });

        Ok(WorkerIo {
            stdin: Box::new(stdin_writer),
            stdout: Box::new(stdout_reader),
            stderr: None,
            child: Box::new(StubChild { task, exit_rx }),
        })
    }
}

/// Session state the fake worker keeps between commands
#[derive(Default)]
struct Session {
    seed: i64,
    difficulty: i64,
    act: Option<i64>,
}

async fn run_worker(
    state: Arc<StubState>,
    behavior: StubBehavior,
    stdin: DuplexStream,
    mut stdout: DuplexStream,
    mut crash_rx: oneshot::Receiver<i32>,
) -> i32 {
    if let Some(code) = behavior.exit_on_start {
        return code;
    }

    let banner = json!({ "time": 1_700_000_000_000_i64, "level": 30, "msg": "stub worker loaded" });
    if emit(&mut stdout, &banner).await.is_err() {
        return 1;
    }
    if behavior.send_init && emit(&mut stdout, &json!({ "type": "init" })).await.is_err() {
        return 1;
    }

    let mut lines = BufReader::new(stdin).lines();
    let mut session = Session::default();
    let mut crash_armed = true;

    loop {
        let line = tokio::select! {
            crash = &mut crash_rx, if crash_armed => match crash {
                Ok(code) => return code,
                // Replaced by a later launch
                Err(_) => {
                    crash_armed = false;
                    continue;
                }
            },
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                // stdin closed, exit like the real worker
                Ok(None) | Err(_) => return 0,
            },
        };

        lock(&state.commands).push(line.clone());

        let Ok(command) = line.parse::<WorkerCommand>() else {
            continue;
        };

        let replies = respond(&behavior, &mut session, command);
        for reply in replies {
            if emit(&mut stdout, &reply).await.is_err() {
                return 1;
            }
        }
    }
}

fn respond(behavior: &StubBehavior, session: &mut Session, command: WorkerCommand) -> Vec<Value> {
    match command {
        WorkerCommand::Set { setting, value } => {
            let echoed = match setting {
                Setting::Seed => {
                    session.seed = value;
                    behavior.seed_echo.unwrap_or(value)
                }
                Setting::Difficulty => {
                    session.difficulty = value;
                    value
                }
                Setting::Act => {
                    session.act = Some(value);
                    value
                }
            };
            let mut ack = json!({ "type": "info" });
            ack[setting.name()] = json!(echoed);
            vec![ack]
        }
        WorkerCommand::GenerateMap => {
            let mut replies: Vec<Value> = (0..behavior.maps_per_batch)
                .map(|id| {
                    json!({
                        "type": "map",
                        "id": id,
                        "seed": session.seed,
                        "difficulty": session.difficulty,
                        "act": session.act,
                        "size": { "width": 10, "height": 10 },
                        "objects": behavior.objects,
                    })
                })
                .collect();
            if behavior.send_done {
                replies.push(json!({ "type": "done" }));
            }
            replies
        }
    }
}

async fn emit(stdout: &mut DuplexStream, message: &Value) -> std::io::Result<()> {
    let mut line = message.to_string();
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await
}

/// Exit handle of one stub worker
struct StubChild {
    task: JoinHandle<()>,
    exit_rx: watch::Receiver<Option<i32>>,
}

#[async_trait]
impl WorkerChild for StubChild {
    fn id(&self) -> Option<u32> {
        None
    }

    async fn wait(&mut self) -> MapResult<Option<i32>> {
        // An aborted task never reports a code
        let exited = self.exit_rx.wait_for(Option::is_some).await.map(|code| *code);
        Ok(exited.ok().flatten())
    }

    async fn kill(&mut self) -> MapResult<()> {
        self.task.abort();
        Ok(())
    }
}

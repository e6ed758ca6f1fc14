//! Helpers that consume the worker's stdout/stderr
//!
//! stdout carries the line protocol: every line is classified and either
//! re-logged (log records) or published on the event bus (generation events).
//! stderr is compatibility-layer chatter and only reaches trace logging.
//! Both readers run until the pipe closes.

use std::sync::Arc;

use shared::{logging, parse_line, process_debug, process_trace, ProcessId, ProtocolMessage};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

use super::event_bus::EventBus;

/// Route one stdout line, returns true when it was a recognised protocol message
pub fn handle_stdout_line(line: &str, bus: &EventBus, process_id: &ProcessId) -> bool {
    match parse_line(line) {
        Some(ProtocolMessage::Log(record)) => {
            logging::log_worker_record(process_id, &record);
            true
        }
        Some(ProtocolMessage::Event(event)) => {
            match event.kind() {
                Some(kind) => {
                    let delivered = bus.publish(kind, event);
                    process_trace!(process_id, "Event '{}' delivered to {} subscriber(s)", kind, delivered);
                }
                None => {
                    process_debug!(process_id, "Ignoring event of unknown type");
                }
            }
            true
        }
        None => {
            process_trace!(process_id, "Dropping unparseable line: {}", line);
            false
        }
    }
}

/// Spawn the stdout protocol reader
pub fn spawn_stdout_reader<R>(stdout: R, bus: Arc<EventBus>, process_id: ProcessId) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    handle_stdout_line(&line, &bus, &process_id);
                }
                Err(e) => {
                    process_debug!(process_id, "stdout read failed: {}", e);
                    break;
                }
            }
        }

        process_debug!(process_id, "stdout closed");
    })
}

/// Spawn the stderr consumer so the worker never blocks on a full pipe
pub fn spawn_stderr_reader<R>(stderr: R, process_id: ProcessId) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();

        while let Ok(read) = reader.read_until(b'\n', &mut buf).await {
            if read == 0 {
                break;
            }
            process_trace!(process_id, "stderr: {}", String::from_utf8_lossy(&buf).trim_end());
            buf.clear();
        }
    })
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `SessionAdapter` backed by a real pseudo-terminal (`portable-pty`) and
//! `nix` process-group signaling, for harnesses whose output must stream
//! into a raw-mode scroll region rather than a re-rendered tmux pane
//! (§4.3).

use super::{SessionAdapter, SessionError};
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Bound on the in-memory capture ring so a long-lived session's output
/// doesn't grow unbounded between `capture_output` calls.
const CAPTURE_RING_BYTES: usize = 1 << 20;

struct PtyHandle {
    writer: Mutex<Box<dyn Write + Send>>,
    master: Mutex<Box<dyn MasterPty + Send>>,
    child: Mutex<Box<dyn Child + Send + Sync>>,
    child_pid: i32,
    pgid: i32,
    output: Arc<Mutex<VecDeque<u8>>>,
    alive: Arc<AtomicBool>,
}

/// One `spawn` call creates one PTY-backed child, tracked by the id this
/// adapter hands back. Cheap to clone (an `Arc` of the session map), same
/// bound every `SessionAdapter` impl in this module carries.
#[derive(Clone, Default)]
pub struct PtyAdapter {
    sessions: Arc<Mutex<HashMap<String, Arc<PtyHandle>>>>,
    next_id: Arc<AtomicU64>,
}

impl PtyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, id: &str) -> Result<Arc<PtyHandle>, SessionError> {
        self.sessions
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Propagate a terminal geometry change into the child PTY (the
    /// `Resizable` capability at the executor layer calls through to
    /// this). Not part of `SessionAdapter` — tmux has no analog, since a
    /// tmux pane is resized by the terminal multiplexer itself.
    pub fn resize(&self, id: &str, rows: u16, cols: u16) -> Result<(), SessionError> {
        let handle = self.handle(id)?;
        handle
            .master
            .lock()
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| SessionError::CommandFailed(format!("resize: {e}")))
    }
}

#[async_trait]
impl SessionAdapter for PtyAdapter {
    async fn spawn(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
        rows: u16,
        cols: u16,
    ) -> Result<String, SessionError> {
        let rows = if rows == 0 { 24 } else { rows };
        let cols = if cols == 0 { 80 } else { cols };
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| SessionError::SpawnFailed(format!("open pty: {e}")))?;

        let mut builder = CommandBuilder::new("/bin/sh");
        builder.arg("-c");
        builder.arg(cmd);
        builder.cwd(cwd);
        for (key, value) in env {
            builder.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| SessionError::SpawnFailed(format!("spawn: {e}")))?;
        let child_pid = child
            .process_id()
            .ok_or_else(|| SessionError::SpawnFailed("child has no pid".to_string()))?
            as i32;
        let pgid = pair.master.process_group_leader().unwrap_or(child_pid);

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| SessionError::SpawnFailed(format!("take writer: {e}")))?;
        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| SessionError::SpawnFailed(format!("clone reader: {e}")))?;

        // The master keeps the pty alive; the slave fd is only needed to
        // hand the child its controlling terminal at spawn time.
        drop(pair.slave);

        let output = Arc::new(Mutex::new(VecDeque::with_capacity(CAPTURE_RING_BYTES)));
        let alive = Arc::new(AtomicBool::new(true));

        let reader_output = output.clone();
        let reader_alive = alive.clone();
        let reader_name = name.to_string();
        std::thread::Builder::new()
            .name(format!("pty-reader-{reader_name}"))
            .spawn(move || {
                let mut buf = [0u8; 4096];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            let mut ring = reader_output.lock();
                            ring.extend(buf[..n].iter().copied());
                            let excess = ring.len().saturating_sub(CAPTURE_RING_BYTES);
                            for _ in 0..excess {
                                ring.pop_front();
                            }
                        }
                        Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(_) => break,
                    }
                }
                reader_alive.store(false, Ordering::SeqCst);
            })
            .map_err(|e| SessionError::SpawnFailed(format!("reader thread: {e}")))?;

        let id = format!("{name}-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let handle = Arc::new(PtyHandle {
            writer: Mutex::new(writer),
            master: Mutex::new(pair.master),
            child: Mutex::new(child),
            child_pid,
            pgid,
            output,
            alive,
        });
        self.sessions.lock().insert(id.clone(), handle);
        Ok(id)
    }

    async fn send(&self, id: &str, input: &str) -> Result<(), SessionError> {
        self.send_literal(id, input).await
    }

    async fn send_literal(&self, id: &str, text: &str) -> Result<(), SessionError> {
        let handle = self.handle(id)?;
        let mut writer = handle.writer.lock();
        writer
            .write_all(text.as_bytes())
            .map_err(|e| SessionError::CommandFailed(format!("write: {e}")))?;
        writer
            .flush()
            .map_err(|e| SessionError::CommandFailed(format!("flush: {e}")))
    }

    async fn send_enter(&self, id: &str) -> Result<(), SessionError> {
        self.send_literal(id, "\r").await
    }

    async fn kill(&self, id: &str) -> Result<(), SessionError> {
        let handle = match self.sessions.lock().remove(id) {
            Some(handle) => handle,
            None => return Ok(()),
        };
        terminate(&handle).await;
        Ok(())
    }

    async fn is_alive(&self, id: &str) -> Result<bool, SessionError> {
        Ok(self
            .sessions
            .lock()
            .get(id)
            .map(|h| h.alive.load(Ordering::SeqCst))
            .unwrap_or(false))
    }

    async fn capture_output(&self, id: &str, lines: u32) -> Result<String, SessionError> {
        let handle = self.handle(id)?;
        let bytes: Vec<u8> = handle.output.lock().iter().copied().collect();
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(last_n_lines(&text, lines))
    }

    async fn is_process_running(&self, id: &str, _pattern: &str) -> Result<bool, SessionError> {
        self.is_alive(id).await
    }

    async fn get_exit_code(&self, id: &str) -> Result<Option<i32>, SessionError> {
        let handle = self.handle(id)?;
        let mut child = handle.child.lock();
        match child.try_wait() {
            Ok(Some(status)) => Ok(Some(status.exit_code() as i32)),
            Ok(None) => Ok(None),
            Err(e) => Err(SessionError::CommandFailed(format!("wait: {e}"))),
        }
    }

    /// Drain and return whatever output has accumulated since the last
    /// `take_output`/`spawn` call, leaving the ring empty. Used by the
    /// persistent executor to build a job's capture buffer without
    /// double-counting bytes also visible to `capture_output`'s
    /// non-destructive peek (used for dialog/prompt marker detection).
    async fn take_output(&self, id: &str) -> Result<Vec<u8>, SessionError> {
        let handle = self.handle(id)?;
        Ok(handle.output.lock().drain(..).collect())
    }

    fn resize(&self, id: &str, rows: u16, cols: u16) -> Result<(), SessionError> {
        PtyAdapter::resize(self, id, rows, cols)
    }
}

/// Last `n` lines of `text` (§4.3's capture buffer is read back in whole
/// screenfuls, never byte-sliced).
fn last_n_lines(text: &str, n: u32) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n as usize);
    lines[start..].join("\n")
}

/// SIGTERM the child's process group, waiting up to 3s; escalate to
/// SIGKILL and wait another 3s if still alive (§4.3 Teardown). Falls back
/// to signaling the pid directly if the group send comes back `ESRCH`.
async fn terminate(handle: &PtyHandle) {
    send_signal_with_fallback(handle, Signal::SIGTERM);
    if wait_for_exit(handle, Duration::from_secs(3)).await {
        return;
    }
    send_signal_with_fallback(handle, Signal::SIGKILL);
    wait_for_exit(handle, Duration::from_secs(3)).await;
}

fn send_signal_with_fallback(handle: &PtyHandle, signal: Signal) {
    let pgid = Pid::from_raw(handle.pgid);
    if let Err(Errno::ESRCH) = killpg(pgid, signal) {
        let _ = kill(Pid::from_raw(handle.child_pid), signal);
    }
}

async fn wait_for_exit(handle: &PtyHandle, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if !handle.alive.load(Ordering::SeqCst) {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[cfg(test)]
#[path = "pty_tests.rs"]
mod tests;

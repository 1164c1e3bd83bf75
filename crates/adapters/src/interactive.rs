// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The interactive executor (component D) — a human-attached session with
//! the same spawn/kill shape as the persistent executor, minus job
//! dispatch. Used when a link attaches a terminal directly to a harness
//! instead of routing jobs through it.

use crate::executor::{Executor, ExecutorError, InputReceiver};
use crate::session::SessionAdapter;
use async_trait::async_trait;
use mush_core::{ExecError, ExecResult, Job, SetupOptions};
use parking_lot::Mutex as SyncMutex;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Keystroke sent to close the child's stdin (EOF).
const CLOSE_STDIN: &str = "\u{4}";
/// Keystroke sent to interrupt a running foreground command.
const INTERRUPT: &str = "\u{3}";
const GRACE_PERIOD: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct InteractiveConfig {
    pub harness_name: String,
    pub argv: Vec<String>,
    pub working_directory: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Ready,
    Closed,
}

/// A directly-attached harness session (§4.1, §4.4 "interactive mode").
/// `Execute` always fails — this executor never dispatches queued jobs.
pub struct InteractiveExecutor<S: SessionAdapter> {
    config: InteractiveConfig,
    session: S,
    opts: SyncMutex<SetupOptions>,
    session_id: SyncMutex<Option<String>>,
    state: SyncMutex<State>,
}

impl<S: SessionAdapter> InteractiveExecutor<S> {
    pub fn new(config: InteractiveConfig, session: S, opts: SetupOptions) -> Self {
        Self {
            config,
            session,
            opts: SyncMutex::new(opts),
            session_id: SyncMutex::new(None),
            state: SyncMutex::new(State::Created),
        }
    }
}

fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@".contains(c))
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}

#[async_trait]
impl<S: SessionAdapter> Executor for InteractiveExecutor<S> {
    async fn setup(&self) -> Result<(), ExecutorError> {
        let cmd = self
            .config
            .argv
            .iter()
            .map(|a| shell_quote(a))
            .collect::<Vec<_>>()
            .join(" ");
        let env = vec![
            ("TERM".to_string(), "xterm-256color".to_string()),
            ("FORCE_COLOR".to_string(), "1".to_string()),
        ];

        let (rows, cols) = self.opts.lock().pty_size();
        let id = self
            .session
            .spawn(&self.config.harness_name, &self.config.working_directory, &cmd, &env, rows, cols)
            .await
            .map_err(|e| ExecutorError::Setup(e.to_string()))?;

        *self.session_id.lock() = Some(id);
        *self.state.lock() = State::Ready;
        self.opts.lock().fire_ready();
        Ok(())
    }

    /// Interactive mode never dispatches queued jobs (§4.4).
    async fn execute(&self, _job: &Job) -> Result<ExecResult, ExecError> {
        Err(ExecError::execution_error(
            "interactive mode does not support queued job execution",
        ))
    }

    async fn reset(&self) -> Result<(), ExecutorError> {
        Ok(())
    }

    async fn teardown(&self) {
        {
            let mut state = self.state.lock();
            if *state == State::Closed {
                return;
            }
            *state = State::Closed;
        }

        let Some(id) = self.session_id.lock().take() else {
            return;
        };
        let _ = self.session.send_literal(&id, CLOSE_STDIN).await;
        let _ = self.session.send_literal(&id, INTERRUPT).await;

        let deadline = Instant::now() + GRACE_PERIOD;
        while Instant::now() < deadline {
            if !self.session.is_alive(&id).await.unwrap_or(false) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let _ = self.session.kill(&id).await;
    }

    fn as_input_receiver(&self) -> Option<&dyn InputReceiver> {
        Some(self)
    }
}

#[async_trait]
impl<S: SessionAdapter> InputReceiver for InteractiveExecutor<S> {
    /// Forward raw bytes to the child's stdin exactly as received, no key
    /// interpretation (§4.4 "WriteInput").
    async fn write_input(&self, bytes: &[u8]) -> std::io::Result<usize> {
        let Some(id) = self.session_id.lock().clone() else {
            return Err(std::io::Error::other("interactive session not started"));
        };
        let text = String::from_utf8_lossy(bytes).into_owned();
        self.session
            .send_literal(&id, &text)
            .await
            .map_err(std::io::Error::other)?;
        Ok(bytes.len())
    }
}

#[cfg(test)]
#[path = "interactive_tests.rs"]
mod tests;

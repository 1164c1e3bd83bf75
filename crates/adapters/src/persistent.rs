// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persistent PTY executor (component C, §4.3) — the long-lived
//! harness that stays warm across jobs, detects its own readiness from
//! screen content, and learns job completion from a file a settings hook
//! touches rather than from its own exit.
//!
//! Grounded on `agent/claude.rs`'s spawn/reconnect/kill lifecycle and its
//! literal-string interactive-dialog polling loop (`capture_output` every
//! 200ms, `handle_bypass_permissions_prompt` watching for a known dialog
//! string and sending a fixed keystroke) — same shape, different markers
//! and a different completion signal (a hook-touched file instead of the
//! session dying).

use crate::ansi;
use crate::executor::{Executor, ExecutorError, Refreshable, Resizable};
use crate::hooks::{self, InstalledHook};
use crate::session::SessionAdapter;
use crate::tool_config::{self, Format as ToolConfigFormat, ToolConfigFile};
use async_trait::async_trait;
use mush_core::value::first_string_field;
use mush_core::{ExecError, ExecResult, Job, RunnerConfig, SetupOptions};
use parking_lot::Mutex as SyncMutex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};

/// Four-byte UTF-8 prompt marker a ready harness leaves at the end of its
/// screen (§4.3 "prompt marker").
pub const PROMPT_MARKER: &str = "\u{276f} ";
/// Literal substring of the permission-bypass dialog this harness shows
/// once per process lifetime (§4.3 "bypass dialog").
pub const BYPASS_DIALOG_MARKER: &str = "Esc to cancel";

const READINESS_TIMEOUT: Duration = Duration::from_secs(15);
const BYPASS_SETTLE: Duration = Duration::from_secs(2);
const RESET_READY_TIMEOUT: Duration = Duration::from_secs(10);
const RESET_SETTLE: Duration = Duration::from_secs(1);
const PROMPT_CHUNK_BYTES: usize = 4096;
const PROMPT_CHUNK_DELAY: Duration = Duration::from_millis(10);
const PASTE_SETTLE: Duration = Duration::from_millis(500);
const COMPLETION_POLL: Duration = Duration::from_millis(200);
const WATCH_POLL: Duration = Duration::from_millis(200);
const PROMPT_DEBOUNCE: Duration = Duration::from_secs(1);
const BYPASS_ARROW_DELAY: Duration = Duration::from_millis(300);
const BYPASS_ENTER_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Ready,
    Executing,
    Closed,
}

/// The argv shape and binary this executor launches (§4.3 step 3). Not
/// hardcoded to one assistant CLI: the flags it passes for a bundle
/// directory / tool config path are supplied so the same executor can
/// host more than one persistent harness.
#[derive(Debug, Clone)]
pub struct PersistentConfig {
    pub harness_name: String,
    pub binary: String,
    pub bundle_dir_flag: String,
    pub tool_config_flag: String,
    pub skip_permissions_flag: String,
    pub working_directory: PathBuf,
    pub dot_dir: String,
}

struct Shared {
    state: SyncMutex<State>,
    session_id: SyncMutex<Option<String>>,
    bypass_accepted: AtomicBool,
    applied_signature: SyncMutex<String>,
    hook: SyncMutex<Option<InstalledHook>>,
    tool_config: SyncMutex<Option<ToolConfigFile>>,
    watcher_shutdown: SyncMutex<Option<oneshot::Sender<()>>>,
}

/// The persistent PTY harness (§4.3). Generic over `S` purely so tests can
/// substitute a fake `SessionAdapter`; production code always instantiates
/// this with [`crate::session::PtyAdapter`].
pub struct PersistentExecutor<S: SessionAdapter> {
    config: PersistentConfig,
    session: S,
    opts: SyncMutex<SetupOptions>,
    ready_tx: mpsc::Sender<()>,
    ready_rx: AsyncMutex<mpsc::Receiver<()>>,
    shared: Arc<Shared>,
}

impl<S: SessionAdapter> PersistentExecutor<S> {
    pub fn new(config: PersistentConfig, session: S, opts: SetupOptions) -> Self {
        let (ready_tx, ready_rx) = mpsc::channel(1);
        Self {
            config,
            session,
            opts: SyncMutex::new(opts),
            ready_tx,
            ready_rx: AsyncMutex::new(ready_rx),
            shared: Arc::new(Shared {
                state: SyncMutex::new(State::Created),
                session_id: SyncMutex::new(None),
                bypass_accepted: AtomicBool::new(false),
                applied_signature: SyncMutex::new(String::new()),
                hook: SyncMutex::new(None),
                tool_config: SyncMutex::new(None),
                watcher_shutdown: SyncMutex::new(None),
            }),
        }
    }

    fn settings_path(&self) -> PathBuf {
        hooks::settings_path(&self.config.working_directory, &self.config.dot_dir)
    }

    fn build_argv(&self, opts: &SetupOptions) -> Vec<String> {
        let mut argv = vec![self.config.binary.clone()];
        if let Some(dir) = &opts.bundle_dir {
            argv.push(self.config.bundle_dir_flag.clone());
            argv.push(dir.display().to_string());
        }
        if let Some(tool_config) = self.shared.tool_config.lock().as_ref() {
            argv.push(self.config.tool_config_flag.clone());
            argv.push(tool_config.path.display().to_string());
        }
        if !opts.bundle_load_mode {
            argv.push(self.config.skip_permissions_flag.clone());
        }
        argv
    }

    async fn spawn_child(&self) -> Result<String, ExecutorError> {
        let opts = self.opts.lock().clone();
        let argv = self.build_argv(&opts);
        let cmd = shell_join(&argv);

        let mut env = vec![
            ("TERM".to_string(), "xterm-256color".to_string()),
            ("FORCE_COLOR".to_string(), "1".to_string()),
        ];
        if let Some(dir) = &opts.signal_dir {
            env.push(("MUSH_SIGNAL_DIR".to_string(), dir.display().to_string()));
        }

        let (rows, cols) = opts.pty_size();
        let id = self
            .session
            .spawn(&self.config.harness_name, &self.config.working_directory, &cmd, &env, rows, cols)
            .await
            .map_err(|e| ExecutorError::Setup(e.to_string()))?;
        *self.shared.session_id.lock() = Some(id.clone());
        self.spawn_watcher(id.clone());
        Ok(id)
    }

    fn spawn_watcher(&self, id: String) {
        let session = self.session.clone();
        let shared = self.shared.clone();
        let ready_tx = self.ready_tx.clone();
        let opts = self.opts.lock().clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        *self.shared.watcher_shutdown.lock() = Some(shutdown_tx);

        tokio::spawn(async move {
            let mut last_len = 0usize;
            let mut last_change = Instant::now();
            let mut fired = false;
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = tokio::time::sleep(WATCH_POLL) => {}
                }
                if !session.is_alive(&id).await.unwrap_or(false) {
                    break;
                }
                let captured = match session.capture_output(&id, 2000).await {
                    Ok(c) => c,
                    Err(_) => continue,
                };

                if !shared.bypass_accepted.load(Ordering::SeqCst)
                    && captured.contains(BYPASS_DIALOG_MARKER)
                {
                    shared.bypass_accepted.store(true, Ordering::SeqCst);
                    let session2 = session.clone();
                    let id2 = id.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(BYPASS_ARROW_DELAY).await;
                        let _ = session2.send_literal(&id2, "\x1b[B").await;
                        tokio::time::sleep(BYPASS_ENTER_DELAY).await;
                        let _ = session2.send_literal(&id2, "\r").await;
                    });
                }

                if captured.len() != last_len {
                    if captured.len() > last_len {
                        if let Some(delta) = captured.get(last_len..) {
                            opts.fire_output(delta);
                        }
                    }
                    last_len = captured.len();
                    last_change = Instant::now();
                    fired = false;
                }
                if !fired && captured.ends_with(PROMPT_MARKER) && last_change.elapsed() >= PROMPT_DEBOUNCE {
                    let _ = ready_tx.try_send(());
                    fired = true;
                }
            }
        });
    }

    /// Drain any stale readiness signal, then wait up to 15s for a fresh
    /// one. If the deadline expires but the bypass dialog was observed
    /// this process lifetime, settle an extra 2s and accept anyway (§4.3
    /// "waitForReady").
    async fn wait_for_ready(&self) -> Result<(), ExecutorError> {
        let mut rx = self.ready_rx.lock().await;
        while rx.try_recv().is_ok() {}
        match tokio::time::timeout(READINESS_TIMEOUT, rx.recv()).await {
            Ok(Some(())) => Ok(()),
            Ok(None) => Err(ExecutorError::Setup("readiness channel closed".to_string())),
            Err(_) if self.shared.bypass_accepted.load(Ordering::SeqCst) => {
                tokio::time::sleep(BYPASS_SETTLE).await;
                Ok(())
            }
            Err(_) => Err(ExecutorError::Setup(
                "timed out waiting for harness readiness".to_string(),
            )),
        }
    }

    async fn execute_inner(&self, job: &Job) -> Result<ExecResult, ExecError> {
        let id = self
            .shared
            .session_id
            .lock()
            .clone()
            .ok_or_else(|| ExecError::execution_error("no active session"))?;

        let signal_dir = self.opts.lock().signal_dir.clone();
        if let Some(dir) = &signal_dir {
            let _ = std::fs::remove_file(dir.join("complete"));
            let _ = std::fs::write(dir.join("current-job"), job.id.to_string());
        }
        // Clear whatever backlog accumulated between jobs so this job's
        // capture buffer starts clean.
        let _ = self.session.take_output(&id).await;

        let prompt = job
            .rendered_instruction
            .clone()
            .or_else(|| {
                first_string_field(&job.input_data, &["prompt", "instruction"]).map(str::to_string)
            })
            .ok_or_else(|| ExecError::prompt_error("job carries no prompt"))?;

        let start = Instant::now();
        let timeout = job.timeout();

        let run = self.write_and_wait(&id, &prompt, signal_dir.as_deref());
        match tokio::time::timeout(timeout, run).await {
            Ok(Ok(output)) => Ok(ExecResult::success(output, start.elapsed().as_millis() as u64)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ExecError::timeout(format!(
                "job {} timed out after {timeout:?}",
                job.id
            ))),
        }
    }

    async fn write_and_wait(
        &self,
        id: &str,
        prompt: &str,
        signal_dir: Option<&Path>,
    ) -> Result<String, ExecError> {
        self.write_prompt(id, prompt)
            .await
            .map_err(|e| ExecError::execution_error(e.to_string()))?;
        self.wait_for_completion(id, signal_dir).await
    }

    async fn write_prompt(&self, id: &str, prompt: &str) -> Result<(), crate::session::SessionError> {
        for chunk in chunk_utf8(prompt, PROMPT_CHUNK_BYTES) {
            self.session.send_literal(id, chunk).await?;
            tokio::time::sleep(PROMPT_CHUNK_DELAY).await;
        }
        tokio::time::sleep(PASTE_SETTLE).await;
        self.session.send_enter(id).await
    }

    async fn wait_for_completion(&self, id: &str, signal_dir: Option<&Path>) -> Result<String, ExecError> {
        let mut capture: Vec<u8> = Vec::new();
        loop {
            tokio::time::sleep(COMPLETION_POLL).await;

            if let Ok(chunk) = self.session.take_output(id).await {
                capture.extend(chunk);
            }

            if !self.session.is_alive(id).await.unwrap_or(false) {
                return Err(ExecError::execution_error("harness stopped"));
            }

            let Some(dir) = signal_dir else {
                continue;
            };
            let complete = dir.join("complete");
            if complete.exists() {
                let _ = std::fs::remove_file(&complete);
                let text = String::from_utf8_lossy(&capture).into_owned();
                return Ok(ansi::strip(text.trim()));
            }
        }
    }
}

fn chunk_utf8(s: &str, max_bytes: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < s.len() {
        let mut end = (start + max_bytes).min(s.len());
        while end < s.len() && !s.is_char_boundary(end) {
            end -= 1;
        }
        chunks.push(&s[start..end]);
        start = end;
    }
    chunks
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

fn shell_join(argv: &[String]) -> String {
    argv.iter().map(|a| shell_quote(a)).collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl<S: SessionAdapter> Executor for PersistentExecutor<S> {
    async fn setup(&self) -> Result<(), ExecutorError> {
        let opts = self.opts.lock().clone();

        if opts.signal_dir.is_some() {
            match hooks::install_completion_hook(&self.settings_path()) {
                Ok(installed) => *self.shared.hook.lock() = Some(installed),
                Err(e) => return Err(ExecutorError::Setup(format!("hook install: {e}"))),
            }
        }

        if let Some(cfg) = &opts.runner_config {
            match tool_config::build_and_write(cfg, ToolConfigFormat::Json, std::time::SystemTime::now()) {
                Ok(Some(built)) => {
                    *self.shared.applied_signature.lock() = built.signature.clone();
                    *self.shared.tool_config.lock() = Some(built);
                }
                Ok(None) => {}
                Err(e) => opts.fire_output(&format!("tool config write failed: {e}")),
            }
        }

        self.spawn_child().await?;

        if opts.bundle_load_mode {
            opts.fire_ready();
        } else {
            self.wait_for_ready().await?;
            opts.fire_ready();
        }

        *self.shared.state.lock() = State::Ready;
        Ok(())
    }

    async fn execute(&self, job: &Job) -> Result<ExecResult, ExecError> {
        {
            let mut state = self.shared.state.lock();
            if *state != State::Ready {
                return Err(ExecError::execution_error(format!(
                    "executor not ready (state={:?})",
                    *state
                )));
            }
            *state = State::Executing;
        }

        let result = self.execute_inner(job).await;
        *self.shared.state.lock() = State::Ready;
        result
    }

    async fn reset(&self) -> Result<(), ExecutorError> {
        let id = match self.shared.session_id.lock().clone() {
            Some(id) => id,
            None => return Ok(()),
        };

        tokio::time::sleep(Duration::from_millis(500)).await;
        let _ = self.session.send_literal(&id, "/clear").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = self.session.send_enter(&id).await;

        {
            let mut rx = self.ready_rx.lock().await;
            while rx.try_recv().is_ok() {}
            let _ = tokio::time::timeout(RESET_READY_TIMEOUT, rx.recv()).await;
        }
        tokio::time::sleep(RESET_SETTLE).await;
        Ok(())
    }

    async fn teardown(&self) {
        {
            let mut state = self.shared.state.lock();
            if *state == State::Closed {
                return;
            }
            *state = State::Closed;
        }

        if let Some(shutdown) = self.shared.watcher_shutdown.lock().take() {
            let _ = shutdown.send(());
        }
        if let Some(id) = self.shared.session_id.lock().take() {
            let _ = self.session.kill(&id).await;
        }
        if let Some(tool_config) = self.shared.tool_config.lock().take() {
            let _ = std::fs::remove_file(tool_config.path);
        }
        if let Some(hook) = self.shared.hook.lock().take() {
            if let Err(e) = hook.restore() {
                tracing::warn!(error = %e, "completion hook restore failed");
            }
        }
    }

    fn as_resizable(&self) -> Option<&dyn Resizable> {
        Some(self)
    }

    fn as_refreshable(&self) -> Option<&dyn Refreshable> {
        Some(self)
    }
}

impl<S: SessionAdapter> Resizable for PersistentExecutor<S> {
    fn resize(&self, rows: u16, cols: u16) {
        let mut opts = self.opts.lock();
        opts.rows = rows;
        opts.cols = cols;
        drop(opts);

        if let Some(id) = self.shared.session_id.lock().clone() {
            let _ = self.session.resize(&id, rows, cols);
        }
    }
}

#[async_trait]
impl<S: SessionAdapter> Refreshable for PersistentExecutor<S> {
    /// A restart is due when the filtered, signed provider set moved
    /// since the last applied config (§4.6 item 5, §4.1 "Refreshable").
    fn needs_refresh(&self, cfg: &RunnerConfig) -> bool {
        let specs = cfg.filtered_providers(std::time::SystemTime::now());
        tool_config::signature(&specs) != *self.shared.applied_signature.lock()
    }

    async fn apply_refresh(&self, cfg: &RunnerConfig) -> Result<(), ExecutorError> {
        let now = std::time::SystemTime::now();
        let specs = cfg.filtered_providers(now);
        let new_names: BTreeSet<String> = specs.iter().map(|s| s.name.clone()).collect();

        let built =
            tool_config::build_and_write(cfg, ToolConfigFormat::Json, now).map_err(|e| ExecutorError::Refresh(e.to_string()))?;

        if let Some(old) = self.shared.tool_config.lock().take() {
            let _ = std::fs::remove_file(old.path);
        }
        *self.shared.applied_signature.lock() =
            built.as_ref().map(|b| b.signature.clone()).unwrap_or_default();
        *self.shared.tool_config.lock() = built;

        if let Some(id) = self.shared.session_id.lock().take() {
            let _ = self.session.kill(&id).await;
        }
        *self.shared.state.lock() = State::Created;
        self.spawn_child().await.map_err(|e| ExecutorError::Refresh(e.to_string()))?;
        self.wait_for_ready().await.map_err(|e| ExecutorError::Refresh(e.to_string()))?;
        *self.shared.state.lock() = State::Ready;

        let opts = self.opts.lock().clone();
        let csv = if new_names.is_empty() {
            "none".to_string()
        } else {
            new_names.into_iter().collect::<Vec<_>>().join(",")
        };
        opts.fire_output(&format!("MCP servers reloaded: {csv}"));
        Ok(())
    }
}

#[cfg(test)]
#[path = "persistent_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ephemeral subprocess executor (component B): a fresh child per job,
//! either a POSIX shell or an external one-shot CLI.
//!
//! Grounded on `subprocess.rs`'s `run_with_timeout` (the same
//! `tokio::process::Command` + `tokio::time::timeout` pairing, reused here
//! for the job's own timeout) and on the `Effect::Shell` handling the
//! teacher's deleted pipeline executor used for env/workdir assembly.

use crate::ansi;
use crate::executor::{Executor, ExecutorError};
use crate::subprocess::run_with_timeout_tee;
use async_trait::async_trait;
use mush_core::value::first_string_field;
use mush_core::{ExecError, ExecResult, Job, SetupOptions};
use std::path::PathBuf;
use std::time::Instant;
use tokio::process::Command;

/// Literal env var keys injected into every ephemeral child (§4.2 step 4).
pub const ENV_JOB_ID: &str = "MUSH_JOB_ID";
pub const ENV_JOB_NAME: &str = "MUSH_JOB_NAME";
pub const ENV_JOB_QUEUE: &str = "MUSH_JOB_QUEUE";

/// Which of the two ephemeral realizations this instance drives.
#[derive(Debug, Clone)]
pub enum EphemeralKind {
    /// POSIX shell runner: `<shell> -c <command>`.
    Shell { shell_binary: String },
    /// External one-shot CLI runner:
    /// `<binary> exec --dangerously-skip-permissions [-C workdir] -o <tmpfile> <prompt>`.
    Cli { binary: String },
}

/// Runs a single subprocess per job and maps its exit status to an
/// `ExecResult`/`ExecError` (component B).
pub struct EphemeralExecutor {
    /// Short name used in error reason tokens (`<name>_error`) and in the
    /// binary-availability check.
    harness_name: String,
    kind: EphemeralKind,
    opts: SetupOptions,
}

impl EphemeralExecutor {
    pub fn shell(harness_name: impl Into<String>, shell_binary: impl Into<String>) -> Self {
        Self {
            harness_name: harness_name.into(),
            kind: EphemeralKind::Shell {
                shell_binary: shell_binary.into(),
            },
            opts: SetupOptions::default(),
        }
    }

    pub fn cli(harness_name: impl Into<String>, binary: impl Into<String>) -> Self {
        Self {
            harness_name: harness_name.into(),
            kind: EphemeralKind::Cli {
                binary: binary.into(),
            },
            opts: SetupOptions::default(),
        }
    }

    /// Record the options a fresh per-job child should honor: its terminal
    /// write sink for output teeing, callbacks, etc (§4.2 step 1 "record
    /// opts").
    pub fn with_opts(mut self, opts: SetupOptions) -> Self {
        self.opts = opts;
        self
    }

    fn binary(&self) -> &str {
        match &self.kind {
            EphemeralKind::Shell { shell_binary } => shell_binary,
            EphemeralKind::Cli { binary } => binary,
        }
    }

    /// §4.2 step 1: pull the payload out of the job, preferring the
    /// server-prepared `renderedInstruction` over the permissive
    /// `inputData` fallback fields.
    fn extract_payload(&self, job: &Job) -> Result<String, ExecError> {
        if let Some(instruction) = job
            .rendered_instruction
            .as_deref()
            .filter(|s| !s.is_empty())
        {
            return Ok(instruction.to_string());
        }

        if let Some(message) = first_string_field(&job.input_data, &["executionError"]) {
            return Err(self.missing_payload_error(message.to_string()));
        }

        let fallback_keys: &[&str] = match self.kind {
            EphemeralKind::Shell { .. } => &["command", "script"],
            EphemeralKind::Cli { .. } => &["instruction", "title", "description", "prompt"],
        };
        if let Some(payload) = first_string_field(&job.input_data, fallback_keys) {
            return Ok(payload.to_string());
        }

        Err(self.missing_payload_error(format!(
            "job {} carries no renderedInstruction and no usable inputData fallback",
            job.id
        )))
    }

    fn missing_payload_error(&self, message: String) -> ExecError {
        match self.kind {
            EphemeralKind::Shell { .. } => ExecError::command_error(message),
            EphemeralKind::Cli { .. } => ExecError::prompt_error(message),
        }
    }

    fn build_command(&self, job: &Job, payload: &str) -> Result<(Command, Option<PathBuf>), ExecError> {
        let mut env: Vec<(String, String)> = job
            .environment()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.push((ENV_JOB_ID.to_string(), job.id.to_string()));
        env.push((ENV_JOB_NAME.to_string(), job.display_name()));
        env.push((ENV_JOB_QUEUE.to_string(), job.queue_id.to_string()));

        let (mut cmd, tmp_out) = match &self.kind {
            EphemeralKind::Shell { shell_binary } => {
                let mut c = Command::new(shell_binary);
                c.arg("-c").arg(payload);
                (c, None)
            }
            EphemeralKind::Cli { binary } => {
                let tmp_out = tmp_output_path(&job.id.to_string());
                let mut c = Command::new(binary);
                c.arg("exec").arg("--dangerously-skip-permissions");
                if let Some(workdir) = job.working_directory() {
                    c.arg("-C").arg(workdir);
                }
                c.arg("-o").arg(&tmp_out).arg(payload);
                (c, Some(tmp_out))
            }
        };

        cmd.envs(env);
        if let Some(workdir) = job.working_directory() {
            cmd.current_dir(workdir);
        }
        cmd.kill_on_drop(true);

        Ok((cmd, tmp_out))
    }
}

fn tmp_output_path(job_id: &str) -> PathBuf {
    let suffix: u64 = rand::random();
    std::env::temp_dir().join(format!("mush-{job_id}-{suffix:x}.out"))
}

#[async_trait]
impl Executor for EphemeralExecutor {
    async fn setup(&self) -> Result<(), ExecutorError> {
        self.opts.fire_ready();
        Ok(())
    }

    async fn execute(&self, job: &Job) -> Result<ExecResult, ExecError> {
        let payload = self.extract_payload(job)?;

        if which::which(self.binary()).is_err() {
            return Err(self.missing_payload_error(format!(
                "{} not found in PATH",
                self.binary()
            )));
        }

        let (cmd, tmp_out) = self.build_command(job, &payload)?;

        let tee_fn = |bytes: &[u8]| self.opts.tee_bytes(bytes);
        let tee: Option<&(dyn Fn(&[u8]) + Send + Sync)> = if self.opts.terminal.is_some() {
            Some(&tee_fn)
        } else {
            None
        };

        let start = Instant::now();
        let result = run_with_timeout_tee(cmd, job.timeout(), &self.harness_name, tee).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        if let Some(path) = &tmp_out {
            let _ = std::fs::remove_file(path);
        }

        let output = match result {
            Ok(output) => output,
            Err(message) => {
                return Err(if message.contains("timed out") {
                    ExecError::timeout(message)
                } else {
                    ExecError::execution_error(message)
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            let stripped = ansi::strip(stdout.trim());
            Ok(ExecResult::success(stripped, duration_ms)
                .with_stdout_stderr(stdout, stderr, 0))
        } else {
            let code = output.status.code().unwrap_or(-1);
            let detail = if stderr.trim().is_empty() {
                format!("exit status {code}")
            } else {
                stderr.trim().to_string()
            };
            Err(ExecError::exited(&self.harness_name, code, detail))
        }
    }

    async fn reset(&self) -> Result<(), ExecutorError> {
        Ok(())
    }

    async fn teardown(&self) {}
}

#[cfg(test)]
#[path = "ephemeral_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Results and errors an [`Executor`](crate) reports back to the job loop.
//!
//! `ExecResult`/`ExecError` deliberately keep a closed set of well-known
//! fields plus a `#[serde(flatten)]` catch-all, per §9 "Dynamic payload
//! typing": the wire schema is open, but the core only ever *writes* the
//! fields named in §3.

use crate::value::ValueMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Successful job output (§3 `ExecResult`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecResult {
    pub success: bool,
    /// Human-readable, ANSI-stripped output.
    pub output: String,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(flatten)]
    pub extra: ValueMap,
}

impl ExecResult {
    /// Build a result for the common "ran a process to completion" case.
    pub fn success(output: String, duration_ms: u64) -> Self {
        Self {
            success: true,
            output,
            duration_ms,
            ..Default::default()
        }
    }

    pub fn with_stdout_stderr(mut self, stdout: String, stderr: String, exit_code: i32) -> Self {
        self.stdout = Some(stdout);
        self.stderr = Some(stderr);
        self.exit_code = Some(exit_code);
        self
    }
}

/// Free-form classification tokens carried to the server (§3, §7).
///
/// These are not a closed enum on the wire — the server classifies on the
/// string — but the taxonomy in §7 is reproduced here as constructors so
/// call sites can't typo a reason string.
pub mod reason {
    pub const PROMPT_ERROR: &str = "prompt_error";
    pub const COMMAND_ERROR: &str = "command_error";
    pub const TIMEOUT: &str = "timeout";
    pub const EXECUTION_ERROR: &str = "execution_error";
    pub const BASH_ERROR: &str = "bash_error";
    pub const CODEX_ERROR: &str = "codex_error";
    pub const COMPLETION_REPORT_FAILED: &str = "completion_report_failed";
}

/// A tagged, retryable-or-not job failure (§3 `ExecError`).
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{reason}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct ExecError {
    pub reason: String,
    pub message: String,
    pub retry: bool,
}

impl ExecError {
    pub fn new(reason: impl Into<String>, message: impl Into<String>, retry: bool) -> Self {
        Self {
            reason: reason.into(),
            message: message.into(),
            retry,
        }
    }

    /// `timeout` — context deadline expired. Always retryable (§7).
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(reason::TIMEOUT, message, true)
    }

    /// `execution_error` — generic failure during child invocation.
    /// Retryable (§7).
    pub fn execution_error(message: impl Into<String>) -> Self {
        Self::new(reason::EXECUTION_ERROR, message, true)
    }

    /// `prompt_error`/`command_error` — missing or malformed job payload.
    /// Not retryable (§7).
    pub fn command_error(message: impl Into<String>) -> Self {
        Self::new(reason::COMMAND_ERROR, message, false)
    }

    pub fn prompt_error(message: impl Into<String>) -> Self {
        Self::new(reason::PROMPT_ERROR, message, false)
    }

    /// Non-zero exit of a specific ephemeral child, reason
    /// `<name>_error` (e.g. `bash_error`, `codex_error`). Retryable (§7).
    pub fn exited(harness_name: &str, code: i32, detail: impl std::fmt::Display) -> Self {
        Self::new(
            format!("{harness_name}_error"),
            format!("exited with code {code}: {detail}"),
            true,
        )
    }

    pub fn completion_report_failed(message: impl Into<String>) -> Self {
        Self::new(reason::COMPLETION_REPORT_FAILED, message, true)
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;

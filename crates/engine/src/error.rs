// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner-level errors: everything that can go wrong assembling and
//! starting the process, as distinct from per-job failures (which are
//! always reported to the remote, never raised as a Rust error — §7).

use mush_adapters::{ExecutorError, HookError};
use mush_api::ApiError;

/// Setup-time failures terminate the process (§7: "Setup-time failures
/// terminate the process and are reported to stderr through the log
/// surface").
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("no executor registered for harness {0:?}")]
    UnknownHarness(String),

    #[error("executor setup failed for harness {harness:?}: {source}")]
    ExecutorSetup {
        harness: String,
        #[source]
        source: ExecutorError,
    },

    #[error("completion hook install failed: {0}")]
    HookInstall(#[source] HookError),

    #[error("link registration failed: {0}")]
    LinkRegister(#[source] ApiError),
}

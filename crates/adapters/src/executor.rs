// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor abstraction and the process-wide harness registry (component A).
//!
//! Every harness kind (bash, an external one-shot CLI, a persistent PTY
//! assistant) is an [`Executor`]. The registry maps a job's `harnessType`
//! string to a factory; it is built once at startup and read-only
//! thereafter (§3 "harness registry entry").

use async_trait::async_trait;
use mush_core::{ExecError, ExecResult, Job, RunnerConfig};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors from the lifecycle methods that aren't per-job (`Setup`/`Reset`),
/// and from registry construction.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("setup failed: {0}")]
    Setup(String),
    #[error("reset failed: {0}")]
    Reset(String),
    #[error("refresh failed: {0}")]
    Refresh(String),
    #[error("duplicate executor registered: {0}")]
    DuplicateName(String),
}

/// Four-operation lifecycle every harness implements (§4.1).
///
/// Held behind `Arc<dyn Executor>` in the registry and the job loop, since
/// the set of concrete executor types is heterogeneous and the registry
/// must hand out whichever one matches a job's `harnessType`.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Idempotent per-instance initialization. Must release any partial
    /// resources before returning an error.
    async fn setup(&self) -> Result<(), ExecutorError>;

    /// Run one job to completion. Only called after `setup` succeeds.
    async fn execute(&self, job: &Job) -> Result<ExecResult, ExecError>;

    /// Prepare for the next job. No-op for ephemeral executors.
    async fn reset(&self) -> Result<(), ExecutorError>;

    /// Release all resources. Safe to call once after `setup` regardless
    /// of intervening state; must not block indefinitely.
    async fn teardown(&self);

    /// Downcast to the `Resizable` capability, if this executor holds a
    /// child PTY whose geometry can change.
    fn as_resizable(&self) -> Option<&dyn Resizable> {
        None
    }

    /// Downcast to the `InputReceiver` capability, if raw stdin can be
    /// forwarded to this executor's child.
    fn as_input_receiver(&self) -> Option<&dyn InputReceiver> {
        None
    }

    /// Downcast to the `Refreshable` capability, if this executor can pick
    /// up a rotated `RunnerConfig` without a full restart of the job loop.
    fn as_refreshable(&self) -> Option<&dyn Refreshable> {
        None
    }
}

/// Propagate terminal geometry into a child PTY (§4.1).
pub trait Resizable: Send + Sync {
    fn resize(&self, rows: u16, cols: u16);
}

/// Forward raw stdin bytes to a child (§4.1).
#[async_trait]
pub trait InputReceiver: Send + Sync {
    async fn write_input(&self, bytes: &[u8]) -> std::io::Result<usize>;
}

/// Pick up a new runner config, typically by restarting the child (§4.1).
#[async_trait]
pub trait Refreshable: Send + Sync {
    fn needs_refresh(&self, cfg: &RunnerConfig) -> bool;
    async fn apply_refresh(&self, cfg: &RunnerConfig) -> Result<(), ExecutorError>;
}

/// Builds one executor instance. Registered once per harness name.
pub type ExecutorFactory = Arc<dyn Fn() -> Arc<dyn Executor> + Send + Sync>;

/// One harness registration (§3 "Harness registry entry").
pub struct RegistryEntry {
    pub name: String,
    pub available: bool,
    pub factory: ExecutorFactory,
}

impl RegistryEntry {
    pub fn new(
        name: impl Into<String>,
        available: bool,
        factory: impl Fn() -> Arc<dyn Executor> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            available,
            factory: Arc::new(factory),
        }
    }
}

/// Process-wide, read-only-after-startup name→factory table (§3, §9
/// "Global mutable state" — built explicitly in `main`, not a `static`).
#[derive(Default)]
pub struct ExecutorRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a harness factory. Registering a duplicate name is a
    /// programming error that halts startup.
    pub fn register(&mut self, entry: RegistryEntry) -> Result<(), ExecutorError> {
        if self.entries.contains_key(&entry.name) {
            return Err(ExecutorError::DuplicateName(entry.name));
        }
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    pub fn is_supported(&self, name: &str) -> bool {
        self.entries.get(name).map(|e| e.available).unwrap_or(false)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Build a fresh executor instance for `name`, or `None` if the
    /// harness isn't registered or isn't available in this environment.
    pub fn build(&self, name: &str) -> Option<Arc<dyn Executor>> {
        self.entries
            .get(name)
            .filter(|e| e.available)
            .map(|e| (e.factory)())
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

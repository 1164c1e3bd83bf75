// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-controller stdout mutex (§4.9 "Write discipline"): every writer
//! — the PTY output reader, the status-bar renderer, ephemeral-executor
//! tees, and resize escape sequences — funnels through here so escape
//! sequences are never split by unrelated bytes.

use mush_core::setup::TerminalSink;
use parking_lot::Mutex;
use std::io::Write;

/// Shared stdout writer. Cheap to clone; every clone writes through the
/// same lock.
#[derive(Clone)]
pub struct StdoutSink {
    inner: std::sync::Arc<Mutex<std::io::Stdout>>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Arc::new(Mutex::new(std::io::stdout())),
        }
    }

    /// Write raw bytes, e.g. a cursor-positioning escape sequence.
    pub fn write_raw(&self, bytes: &[u8]) {
        let mut out = self.inner.lock();
        let _ = out.write_all(bytes);
        let _ = out.flush();
    }
}

impl TerminalSink for StdoutSink {
    fn write(&self, bytes: &[u8]) {
        self.write_raw(bytes);
    }
}

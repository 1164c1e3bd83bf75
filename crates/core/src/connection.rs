// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner-visible connection lifecycle state (§3 "Connection status").

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the runner is in its connection lifecycle to the remote queue.
///
/// Transitions flow roughly `Disconnected -> Connecting -> Starting ->
/// Ready -> Connected`, with `Processing` entered for the duration of a
/// claimed job and `Error` reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Starting,
    Ready,
    Connected,
    Processing,
    Error,
}

impl ConnectionStatus {
    /// True once the runner has successfully registered and can claim jobs.
    pub fn is_operational(self) -> bool {
        matches!(self, Self::Connected | Self::Processing)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Connected => "connected",
            Self::Processing => "processing",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::Disconnected
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors from talking to the remote queue (§6).

use thiserror::Error;

/// Failure modes the job loop's retry policy (§7) needs to branch on.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure: DNS, connect, TLS, timeout.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server responded but the body didn't match the expected shape.
    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// HTTP 404 — the job/link/config no longer exists server-side.
    #[error("not found")]
    NotFound,

    /// HTTP 409 — the job was already claimed, completed, or released by
    /// another caller.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other non-2xx response, carrying the status and trimmed body.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
}

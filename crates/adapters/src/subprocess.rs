// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a descriptive error message. The child process
/// is killed automatically if the timeout elapses (via the tokio `Child`
/// drop implementation).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{} failed: {}", description, io_err)),
        Err(_elapsed) => Err(format!(
            "{} timed out after {}s",
            description,
            timeout.as_secs()
        )),
    }
}

/// Same contract as [`run_with_timeout`], but with stdout/stderr streamed
/// chunk-by-chunk through `tee` as they arrive, in addition to being
/// buffered into the returned `Output` (§4.2 step 6: the ephemeral
/// executor's capture is a multi-writer of an internal buffer and the
/// terminal write sink). `tee` is skipped entirely — falling back to
/// `run_with_timeout` — when there's no sink to write to.
pub async fn run_with_timeout_tee(
    cmd: Command,
    timeout: Duration,
    description: &str,
    tee: Option<&(dyn Fn(&[u8]) + Send + Sync)>,
) -> Result<Output, String> {
    let Some(tee) = tee else {
        return run_with_timeout(cmd, timeout, description).await;
    };

    let run = async move {
        let mut cmd = cmd;
        let mut child = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("{description} failed: {e}"))?;

        let Some(mut child_stdout) = child.stdout.take() else {
            return Err(format!("{description} failed: no stdout pipe"));
        };
        let Some(mut child_stderr) = child.stderr.take() else {
            return Err(format!("{description} failed: no stderr pipe"));
        };

        let mut out_buf: Vec<u8> = Vec::new();
        let mut err_buf: Vec<u8> = Vec::new();
        let mut out_open = true;
        let mut err_open = true;
        let mut out_chunk = [0u8; 4096];
        let mut err_chunk = [0u8; 4096];

        while out_open || err_open {
            tokio::select! {
                n = child_stdout.read(&mut out_chunk), if out_open => {
                    match n {
                        Ok(0) => out_open = false,
                        Ok(n) => {
                            tee(&out_chunk[..n]);
                            out_buf.extend_from_slice(&out_chunk[..n]);
                        }
                        Err(_) => out_open = false,
                    }
                }
                n = child_stderr.read(&mut err_chunk), if err_open => {
                    match n {
                        Ok(0) => err_open = false,
                        Ok(n) => {
                            tee(&err_chunk[..n]);
                            err_buf.extend_from_slice(&err_chunk[..n]);
                        }
                        Err(_) => err_open = false,
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| format!("{description} failed: {e}"))?;

        Ok(Output {
            status,
            stdout: out_buf,
            stderr: err_buf,
        })
    };

    match tokio::time::timeout(timeout, run).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(e),
        Err(_elapsed) => Err(format!(
            "{} timed out after {}s",
            description,
            timeout.as_secs()
        )),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;

//! Test helpers for behavioral specifications.
//!
//! Black-box: spawn the real `mush` binary against a `wiremock`-mocked
//! queue API and observe the requests it makes, per §8's end-to-end
//! scenarios.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

pub const SPEC_POLL_INTERVAL_MS: u64 = 20;
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

/// Resolve the built `mush` binary, checking llvm-cov's target directory
/// first so coverage runs pick up the right build.
pub fn binary_path() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug/mush");
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug/mush");
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(deps_dir) = exe.parent() {
            if let Some(debug_dir) = deps_dir.parent() {
                let candidate = debug_dir.join("mush");
                if candidate.exists() {
                    return candidate;
                }
            }
        }
    }

    standard
}

/// Minimal flag set every spec scenario needs, pointed at `server`.
pub struct RunnerArgs {
    pub habitat_id: String,
    pub queue_id: String,
    pub api_base_url: String,
    pub link_name: String,
    pub harnesses: String,
    pub poll_seconds: u64,
}

impl RunnerArgs {
    pub fn new(server_uri: impl Into<String>) -> Self {
        Self {
            habitat_id: "hab1".to_string(),
            queue_id: "q1".to_string(),
            api_base_url: server_uri.into(),
            link_name: "spec-link".to_string(),
            harnesses: "bash".to_string(),
            poll_seconds: 1,
        }
    }

    pub fn harnesses(mut self, harnesses: &str) -> Self {
        self.harnesses = harnesses.to_string();
        self
    }

    pub fn spawn(&self) -> Child {
        Command::new(binary_path())
            .env("MUSH_HABITAT_ID", &self.habitat_id)
            .env("MUSH_QUEUE_ID", &self.queue_id)
            .env("MUSH_API_BASE_URL", &self.api_base_url)
            .env("MUSH_LINK_NAME", &self.link_name)
            .env("MUSH_HARNESSES", &self.harnesses)
            .env("MUSH_POLL_SECONDS", self.poll_seconds.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to spawn mush binary")
    }
}

/// Send `SIGTERM` and wait (briefly) for a graceful exit, killing outright
/// if it doesn't.
pub fn terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(child.id() as i32);
    let _ = kill(pid, Signal::SIGTERM);

    let deadline = Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    while Instant::now() < deadline {
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }
        std::thread::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS));
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Poll `predicate` until it's true or `SPEC_WAIT_MAX_MS` elapses.
pub async fn wait_until(mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
    false
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mush — the worker-runner binary. Parses startup flags, wires up the
//! harness registry and remote API client, then hands off to
//! [`mush_engine::Runner`] until a shutdown signal arrives.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mush_adapters::session::PtyAdapter;
use mush_adapters::{EphemeralExecutor, ExecutorRegistry, PersistentConfig, PersistentExecutor, RegistryEntry};
use mush_api::HttpRunnerApi;
use mush_core::setup::SetupOptions;
use mush_core::QueueId;
use mush_engine::{Runner, RunnerSettings};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod status;

const DEFAULT_POLL_SECONDS: u64 = 30;
const DEFAULT_HEARTBEAT_SECONDS: u64 = 30;

/// CLI surface for the `mush` worker-runner binary.
#[derive(Parser, Debug)]
#[command(name = "mush", version, about = "Mush worker-runner daemon")]
struct Cli {
    /// Habitat this runner claims jobs on behalf of.
    #[arg(long, env = "MUSH_HABITAT_ID")]
    habitat_id: String,

    /// Queue id to poll for jobs.
    #[arg(long, env = "MUSH_QUEUE_ID")]
    queue_id: String,

    /// Base URL of the remote queue API.
    #[arg(long, env = "MUSH_API_BASE_URL")]
    api_base_url: String,

    /// Long-poll window, in seconds, for each claim attempt.
    #[arg(long, env = "MUSH_POLL_SECONDS", default_value_t = DEFAULT_POLL_SECONDS)]
    poll_seconds: u64,

    /// Link heartbeat interval, in seconds.
    #[arg(long, env = "MUSH_HEARTBEAT_SECONDS", default_value_t = DEFAULT_HEARTBEAT_SECONDS)]
    heartbeat_seconds: u64,

    /// Name this runner registers under when it attaches a link.
    #[arg(long, env = "MUSH_LINK_NAME")]
    link_name: String,

    /// Stable instance id across restarts. Generated if omitted.
    #[arg(long, env = "MUSH_INSTANCE_ID")]
    instance_id: Option<String>,

    /// Comma-separated harness names to build at startup (e.g. "bash,codex").
    #[arg(long, env = "MUSH_HARNESSES", value_delimiter = ',', default_value = "bash")]
    harnesses: Vec<String>,

    /// Working directory each harness runs jobs in.
    #[arg(long, env = "MUSH_WORKING_DIRECTORY", default_value = ".")]
    working_directory: PathBuf,

    /// Log file path. Logs go to stderr when omitted.
    #[arg(long, env = "MUSH_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Attach the raw-mode terminal controller (status bar, scroll region).
    #[arg(long, env = "MUSH_ATTACH_TERMINAL", default_value_t = false)]
    attach_terminal: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = setup_logging(cli.log_file.as_deref())?;

    let terminal_sink = cli.attach_terminal.then(mush_terminal::StdoutSink::new);
    let registry = build_registry(&cli, terminal_sink.clone()).context("building harness registry")?;
    let api: Arc<dyn mush_api::RunnerApi> = Arc::new(HttpRunnerApi::new(cli.api_base_url.clone()));

    let settings = RunnerSettings {
        habitat_id: cli.habitat_id.clone(),
        queue_id: QueueId::new(cli.queue_id.clone()),
        poll_seconds: cli.poll_seconds,
        heartbeat_interval: Duration::from_secs(cli.heartbeat_seconds),
        link_name: cli.link_name.clone(),
        client_version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: cli.instance_id.clone(),
        harnesses: cli.harnesses.clone(),
    };

    let runner = Runner::build(settings, api, &registry)
        .await
        .context("runner setup failed")?;

    let cancel = CancellationToken::new();
    let shutdown = spawn_signal_watcher(cancel.clone())?;

    info!(habitat_id = %cli.habitat_id, queue_id = %cli.queue_id, "mush starting");

    if let Some(sink) = terminal_sink {
        let source = Arc::new(status::EngineStatusSource::new(
            cli.habitat_id.clone(),
            runner.state(),
            runner.metrics(),
            runner.heartbeat_health(),
            cli.queue_id.clone(),
        ));
        let mut controller = mush_terminal::TerminalController::new(source, sink);
        for resizable in runner.resizables() {
            controller.register_resizable(resizable);
        }
        let terminal_cancel = cancel.clone();
        tokio::select! {
            _ = runner.run(cancel.clone()) => {}
            res = controller.run(terminal_cancel) => {
                if let Err(e) = res {
                    error!(error = %e, "terminal controller exited with an error");
                }
                cancel.cancel();
            }
        }
    } else {
        runner.run(cancel.clone()).await;
    }

    shutdown.abort();
    Ok(())
}

fn build_registry(cli: &Cli, terminal_sink: Option<mush_terminal::StdoutSink>) -> Result<ExecutorRegistry> {
    let mut registry = ExecutorRegistry::new();
    let workdir = cli.working_directory.clone();

    let terminal: Option<Arc<dyn mush_core::setup::TerminalSink>> = terminal_sink
        .map(|sink| Arc::new(sink) as Arc<dyn mush_core::setup::TerminalSink>);

    let bash_terminal = terminal.clone();
    registry
        .register(RegistryEntry::new("bash", true, move || {
            let opts = SetupOptions {
                terminal: bash_terminal.clone(),
                ..Default::default()
            };
            Arc::new(EphemeralExecutor::shell("bash", "bash").with_opts(opts))
                as Arc<dyn mush_adapters::Executor>
        }))
        .context("registering bash harness")?;

    let codex_terminal = terminal.clone();
    registry
        .register(RegistryEntry::new("codex", true, move || {
            let config = PersistentConfig {
                harness_name: "codex".to_string(),
                binary: "codex".to_string(),
                bundle_dir_flag: "--bundle-dir".to_string(),
                tool_config_flag: "--tool-config".to_string(),
                skip_permissions_flag: "--dangerously-skip-permissions".to_string(),
                working_directory: workdir.clone(),
                dot_dir: ".codex".to_string(),
            };
            let opts = SetupOptions {
                rows: 24,
                cols: 80,
                terminal: codex_terminal.clone(),
                signal_dir: codex_signal_dir(),
                ..Default::default()
            };
            Arc::new(PersistentExecutor::new(config, PtyAdapter::new(), opts)) as Arc<dyn mush_adapters::Executor>
        }))
        .context("registering codex harness")?;

    Ok(registry)
}

/// A fresh per-process temp directory the completion hook touches a file
/// inside of (§4.5). Named the way `ephemeral.rs`'s `tmp_output_path` names
/// its own per-job temp paths — no `tempfile` dependency, just a random
/// suffix under `std::env::temp_dir()`.
fn codex_signal_dir() -> Option<PathBuf> {
    let suffix: u64 = rand::random();
    let dir = std::env::temp_dir().join(format!("mush-codex-signal-{suffix:x}"));
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Forward `SIGINT`/`SIGTERM` into `cancel`, matching the teacher daemon's
/// own `tokio::signal::unix` shutdown wiring.
fn spawn_signal_watcher(cancel: CancellationToken) -> Result<tokio::task::JoinHandle<()>> {
    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
        cancel.cancel();
    }))
}

fn setup_logging(
    log_file: Option<&std::path::Path>,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (non_blocking, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
            std::fs::create_dir_all(dir).context("creating log directory")?;
            let file_name = path.file_name().context("log file path has no file name")?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            tracing_appender::non_blocking(appender)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! farmd: the Android device farm controller daemon.
//!
//! Parses flags, wires the build cache / worker registry / dispatcher /
//! mailer together, optionally starts a Pulse Monitor, and runs the
//! Supervisor's main loop until an operator `stop`, SIGTERM, or Ctrl-C.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod cli;
mod config;
mod error;
mod logging;

use clap::Parser;
use cli::Cli;
use config::PulseFileConfig;
use error::DaemonError;
use farm_adapters::{
    load_mailer_config, HttpBuildCache, LapinPulseClient, Mailer, ReqwestTaskclusterClient, ReqwestTreeherderClient, SmtpMailer,
    TokioWorkerProcessSpawner, WorkerProcessSpawner,
};
use farm_core::clock::SystemClock;
use farm_core::worker::{CrashPolicy, WorkerCommand};
use farm_engine::{CommandServer, Dispatcher, Normalizer, NormalizerConfig, PulseConfig, PulseMonitor, Supervisor, WorkerRegistry};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tracing::{error, info, warn};

/// Artifact storage queried for build downloads (spec.md §1's Taskcluster
/// normalization). Not exposed as a flag: the original only ever pointed at
/// production Taskcluster.
const TASKCLUSTER_BASE_URL: &str = "https://queue.taskcluster.net";

/// Treeherder API queried for job/build metadata.
const TREEHERDER_BASE_URL: &str = "https://treeherder.mozilla.org/api";

/// Normalizer defaults, hardcoded in the original rather than configurable.
const DEFAULT_TREES: &[&str] = &["mozilla-central"];
const DEFAULT_PLATFORMS: &[&str] = &["android"];
const DEFAULT_BUILDTYPES: &[&str] = &["opt"];

fn parse_log_level(raw: &str) -> Option<tracing::Level> {
    match raw.to_ascii_uppercase().as_str() {
        "ERROR" => Some(tracing::Level::ERROR),
        "WARNING" => Some(tracing::Level::WARN),
        "INFO" => Some(tracing::Level::INFO),
        "DEBUG" => Some(tracing::Level::DEBUG),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let Some(level) = parse_log_level(&cli.loglevel) else {
        eprintln!("error: {}", DaemonError::InvalidLogLevel(cli.loglevel.clone()));
        std::process::exit(2);
    };

    let _log_guard = logging::init(&cli.logfile, level)?;
    info!("starting autophone device farm controller");

    if cli.clear_cache {
        match std::fs::remove_file(&cli.cache) {
            Ok(()) => info!(path = %cli.cache.display(), "cleared roster cache"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                error!(path = %cli.cache.display(), %err, "failed to clear roster cache");
                std::process::exit(1);
            }
        }
    }

    let build_cache = match &cli.override_build_dir {
        Some(dir) => HttpBuildCache::from_override_dir(dir.clone()),
        None => HttpBuildCache::new(std::path::PathBuf::from("builds")),
    };
    let build_cache = match build_cache {
        Ok(cache) => Arc::new(cache),
        Err(err) => {
            error!(%err, "failed to construct build cache");
            std::process::exit(1);
        }
    };

    let log_dir = cli.logfile.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new(".")).to_path_buf();
    let spawner = Arc::new(TokioWorkerProcessSpawner::new(cli.worker_binary.clone(), cli.test_path.clone())) as Arc<dyn WorkerProcessSpawner>;
    let (status_tx, status_rx) = mpsc::channel(256);
    let registry = Arc::new(WorkerRegistry::new(spawner, log_dir, cli.cache.clone(), CrashPolicy::default(), SystemClock, status_tx));

    let reloaded = registry.load_roster().await?;
    info!(count = reloaded, "re-registered phones from roster");

    if cli.reboot_phones {
        for entry in registry.status_entries().await {
            if let Some(phoneid) = registry.find(&entry.phoneid).await {
                if let Err(err) = registry.send_command(&phoneid, WorkerCommand::Reboot).await {
                    warn!(phoneid = %entry.phoneid, %err, "failed to send startup reboot command");
                }
            }
        }
    }

    let dispatcher = Arc::new(Dispatcher::new(build_cache));

    let mailer: Arc<dyn Mailer> = {
        let contents = std::fs::read_to_string(&cli.emailcfg)?;
        let config = load_mailer_config(&contents)?;
        Arc::new(SmtpMailer::new(config, "autophone"))
    };

    let shutdown = Arc::new(Notify::new());

    let pulse_rx = if cli.enable_pulse {
        let pulse_config = PulseFileConfig::load(&cli.pulse_config)?;
        let taskcluster = Arc::new(ReqwestTaskclusterClient::new(TASKCLUSTER_BASE_URL));
        let treeherder = Arc::new(ReqwestTreeherderClient::new(TREEHERDER_BASE_URL));
        let normalizer_config = NormalizerConfig::new(
            DEFAULT_TREES.iter().map(|s| s.to_string()).collect(),
            DEFAULT_PLATFORMS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_BUILDTYPES.iter().map(|s| s.to_string()).collect(),
        );
        let normalizer = Arc::new(Normalizer::new(normalizer_config, taskcluster, treeherder));
        let engine_config = PulseConfig::new(pulse_config.amqp_url(), pulse_config.userid.clone(), pulse_config.durable_queues, true);
        let monitor = PulseMonitor::new(Arc::new(LapinPulseClient), normalizer, engine_config, DEFAULT_PLATFORMS.iter().map(|s| s.to_string()).collect());

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move { monitor.run(tx).await });
        Some(rx)
    } else {
        None
    };

    let bind_addr = SocketAddr::from_str(&format!("{}:{}", cli.ipaddr.as_deref().unwrap_or("0.0.0.0"), cli.port))?;
    let listener = TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "listening for operator connections");

    let command_server = Arc::new(CommandServer::new(registry.clone(), dispatcher.clone(), shutdown.clone()));
    tokio::spawn(async move {
        if let Err(err) = command_server.run(listener).await {
            error!(%err, "command server stopped");
        }
    });

    let supervisor = Supervisor::new(registry, dispatcher, mailer, shutdown);
    supervisor.run(status_rx, pulse_rx).await?;

    info!("autophone shut down cleanly");
    Ok(())
}

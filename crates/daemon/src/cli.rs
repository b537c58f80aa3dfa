// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line flags (spec.md §6), parsed with `clap` rather than the
//! original's `optparse`.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "farmd", version, about = "Android device farm controller daemon")]
pub struct Cli {
    /// Clear the roster cache before starting.
    #[arg(long)]
    pub clear_cache: bool,

    /// Skip rebooting phones re-registered from the roster on startup.
    #[arg(long = "no-reboot", action = clap::ArgAction::SetFalse)]
    pub reboot_phones: bool,

    /// IP address of the interface to bind and hand out to phones for
    /// callbacks, e.g. after rebooting. Binds all interfaces if omitted.
    #[arg(long)]
    pub ipaddr: Option<String>,

    /// Port to listen for incoming operator connections.
    #[arg(long, default_value_t = 28001)]
    pub port: u16,

    /// Roster cache file.
    #[arg(long = "cache", default_value = "autophone_cache.json")]
    pub cache: PathBuf,

    /// Main log file. Individual worker logs are written alongside it as
    /// `<stem>-<phoneid>.log`.
    #[arg(long, default_value = "autophone.log")]
    pub logfile: PathBuf,

    /// ERROR, WARNING, DEBUG, or INFO.
    #[arg(long, default_value = "DEBUG")]
    pub loglevel: String,

    /// Path to the test manifest.
    #[arg(short = 't', long = "test-path", default_value = "tests/manifest.ini")]
    pub test_path: PathBuf,

    /// Config file for email notification settings.
    #[arg(long, default_value = "email.ini")]
    pub emailcfg: PathBuf,

    /// Disable connecting to Pulse to look for new builds.
    #[arg(long = "disable-pulse", action = clap::ArgAction::SetFalse)]
    pub enable_pulse: bool,

    /// Enable running unittests by downloading and installing the
    /// unittests package for each build.
    #[arg(long)]
    pub enable_unittests: bool,

    /// Use the given directory as the current build cache directory
    /// without attempting to download a build.
    #[arg(long)]
    pub override_build_dir: Option<PathBuf>,

    /// TOML file holding the Pulse AMQP credentials, required unless
    /// `--disable-pulse` is given.
    #[arg(long, default_value = "pulse.toml")]
    pub pulse_config: PathBuf,

    /// Path to the `worker` binary spawned once per registered phone.
    #[arg(long, default_value = "worker")]
    pub worker_binary: PathBuf,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;

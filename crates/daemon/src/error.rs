// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level error type for flag validation and config loading; everything
//! past that point propagates its own crate's error type straight into
//! `main`'s `Box<dyn std::error::Error>`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("invalid --loglevel {0:?} (expected ERROR, WARNING, DEBUG, or INFO)")]
    InvalidLogLevel(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pulse config at {path} is invalid: {source}")]
    PulseConfig {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter-level error type, shared across every external collaborator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("http request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("http {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("io error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("build archive at {path} is corrupt: {reason}")]
    CorruptArchive { path: std::path::PathBuf, reason: String },

    #[error("application.ini is missing required key [{section}] {key}")]
    MissingIniKey { section: String, key: String },

    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("worker process error: {0}")]
    Process(String),

    #[error("manifest at {path} could not be read: {source}")]
    Manifest {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("smtp error: {0}")]
    Smtp(String),
}

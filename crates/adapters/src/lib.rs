// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! farm-adapters: external collaborators specified only at their
//! interface — build cache, mailer, pulse/taskcluster/treeherder HTTP
//! clients, worker-process spawning, and the test manifest loader.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod build_cache;
pub mod error;
pub mod ini;
pub mod mailer;
pub mod manifest;
pub mod pulse;
pub mod taskcluster;
pub mod treeherder;
pub mod worker_process;

pub use build_cache::{check_zip_integrity, read_app_ini, AppIni, BuildCache, HttpBuildCache};
pub use error::AdapterError;
pub use mailer::{load_mailer_config, Mailer, MailerConfig, SmtpMailer};
pub use manifest::{load_manifest, ManifestEntry, KNOWN_TEST_NAMES};
pub use pulse::{Binding, LapinPulseClient, PulseClient, PulseMessage, PulseSession};
pub use taskcluster::{Artifact, BuildMetadata, ReqwestTaskclusterClient, TaskDefinition, TaskclusterClient, TaskPayload};
pub use treeherder::{BuildDetail, ReqwestTreeherderClient, TreeherderClient, TreeherderJob};
pub use worker_process::{TokioWorkerProcessSpawner, WorkerProcess, WorkerProcessSpawner, WorkerStatusReader};

#[cfg(any(test, feature = "test-support"))]
pub use build_cache::FakeBuildCache;
#[cfg(any(test, feature = "test-support"))]
pub use mailer::{FakeMailer, SentMail};
#[cfg(any(test, feature = "test-support"))]
pub use pulse::{FakePulseClient, FakePulseSession};
#[cfg(any(test, feature = "test-support"))]
pub use taskcluster::FakeTaskclusterClient;
#[cfg(any(test, feature = "test-support"))]
pub use treeherder::FakeTreeherderClient;
#[cfg(any(test, feature = "test-support"))]
pub use worker_process::{FakeWorkerProcess, FakeWorkerProcessSpawner};

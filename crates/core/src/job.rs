// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical events and the job descriptor dispatched to workers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Which build system produced the task: gates tier checking (spec.md §4.2 —
/// tier is only enforced for non-buildbot builds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderType {
    Buildbot,
    Taskcluster,
}

crate::simple_display! {
    BuilderType {
        Buildbot => "buildbot",
        Taskcluster => "taskcluster",
    }
}

impl BuilderType {
    pub fn from_worker_type(worker_type: &str) -> Self {
        if worker_type == "buildbot" {
            BuilderType::Buildbot
        } else {
            BuilderType::Taskcluster
        }
    }
}

/// Canonical build-completion event, emitted by the Event Normalizer once a
/// task-completed message has passed every gate in spec.md §4.2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEvent {
    pub repo: String,
    pub revision: String,
    pub build_url: String,
    pub platform: String,
    pub build_type: String,
    pub build_id_timestamp: String,
    /// app_name -> artifact url
    pub app_data: BTreeMap<String, String>,
    pub comments: String,
    pub builder_type: BuilderType,
}

/// Operator-initiated job control action forwarded from Treeherder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    Cancel,
    Retrigger,
}

/// Canonical job-action event: a Treeherder cancel/retrigger, resolved to
/// the build it applies to via spec.md §4.2's job-action path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobActionEvent {
    pub action: JobAction,
    pub project: String,
    pub job_id: String,
    pub job_guid: String,
    pub platform: String,
    pub build_type: String,
    pub build_url: String,
    pub machine_name: String,
    pub job_group_name: String,
    pub job_group_symbol: String,
    pub job_type_name: String,
    pub job_type_symbol: String,
    pub result: String,
    pub config_file: String,
    pub chunk: u32,
    pub builder_type: BuilderType,
    pub build: BuildEvent,
}

/// A dispatched test request for one build, delivered to every worker
/// registered at fan-out time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub cache_build_dir: PathBuf,
    /// unix seconds, truncated from `application.ini`'s `BuildID`.
    pub blddate: i64,
    pub revision: String,
    pub androidprocname: String,
    pub version: String,
    pub bldtype: String,
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;

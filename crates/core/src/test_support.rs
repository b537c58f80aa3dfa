// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::job::{BuildEvent, BuilderType, Job, JobAction, JobActionEvent};
use crate::phone::{PhoneConfig, PhoneId};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub fn phone_config(phoneid: &str) -> PhoneConfig {
    PhoneConfig {
        phoneid: PhoneId::new(phoneid),
        serial: format!("{phoneid}-serial"),
        ip: "192.168.1.50".to_string(),
        sutcmdport: 20701,
        machinetype: "nexus-5".to_string(),
        osver: "6.0".to_string(),
        debug: 3,
    }
}

pub fn build_event(repo: &str, revision: &str) -> BuildEvent {
    let mut app_data = BTreeMap::new();
    app_data.insert(
        "target.apk".to_string(),
        format!("https://example.com/{revision}/target.apk"),
    );

    BuildEvent {
        repo: repo.to_string(),
        revision: revision.to_string(),
        build_url: format!("https://example.com/{revision}/android-api-16/target.apk"),
        platform: "android-api-16".to_string(),
        build_type: "opt".to_string(),
        build_id_timestamp: "20260101000000".to_string(),
        app_data,
        comments: String::new(),
        builder_type: BuilderType::Taskcluster,
    }
}

pub fn job_action_event(action: JobAction, revision: &str) -> JobActionEvent {
    JobActionEvent {
        action,
        project: "try".to_string(),
        job_id: "1".to_string(),
        job_guid: "guid-1".to_string(),
        platform: "android-api-16".to_string(),
        build_type: "opt".to_string(),
        build_url: format!("https://example.com/{revision}/android-api-16/target.apk"),
        machine_name: "machine1".to_string(),
        job_group_name: "Android".to_string(),
        job_group_symbol: "A".to_string(),
        job_type_name: "autophone".to_string(),
        job_type_symbol: "ap".to_string(),
        result: "success".to_string(),
        config_file: "autophone.ini".to_string(),
        chunk: 1,
        builder_type: BuilderType::Taskcluster,
        build: build_event("http://hg.mozilla.org/try", revision),
    }
}

pub fn job(revision: &str) -> Job {
    Job {
        cache_build_dir: PathBuf::from(format!("/tmp/autophone_cache/{revision}")),
        blddate: 1_700_000_000,
        revision: revision.to_string(),
        androidprocname: "org.mozilla.fennec".to_string(),
        version: "55.0a1".to_string(),
        bldtype: "opt".to_string(),
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn builder_type_from_worker_type() {
    assert_eq!(BuilderType::from_worker_type("buildbot"), BuilderType::Buildbot);
    assert_eq!(BuilderType::from_worker_type("taskcluster"), BuilderType::Taskcluster);
    assert_eq!(BuilderType::from_worker_type("anything-else"), BuilderType::Taskcluster);
}

#[test]
fn builder_type_display() {
    assert_eq!(BuilderType::Buildbot.to_string(), "buildbot");
    assert_eq!(BuilderType::Taskcluster.to_string(), "taskcluster");
}

#[test]
fn build_event_json_round_trip() {
    let mut app_data = BTreeMap::new();
    app_data.insert("target.apk".to_string(), "https://example.com/target.apk".to_string());

    let event = BuildEvent {
        repo: "http://hg.mozilla.org/mozilla-central".to_string(),
        revision: "abc123".to_string(),
        build_url: "https://example.com/android-api-16/target.apk".to_string(),
        platform: "android-api-16".to_string(),
        build_type: "opt".to_string(),
        build_id_timestamp: "20260101000000".to_string(),
        app_data,
        comments: "bug 1 - fix thing".to_string(),
        builder_type: BuilderType::Taskcluster,
    };

    let json = serde_json::to_string(&event).unwrap();
    let round_tripped: BuildEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(event, round_tripped);
}

#[test]
fn job_action_event_carries_its_build() {
    let build = BuildEvent {
        repo: "http://hg.mozilla.org/try".to_string(),
        revision: "deadbeef".to_string(),
        build_url: "https://example.com/android-x86/target.apk".to_string(),
        platform: "android-x86".to_string(),
        build_type: "debug".to_string(),
        build_id_timestamp: "20260101000000".to_string(),
        app_data: BTreeMap::new(),
        comments: String::new(),
        builder_type: BuilderType::Buildbot,
    };

    let action = JobActionEvent {
        action: JobAction::Retrigger,
        project: "try".to_string(),
        job_id: "42".to_string(),
        job_guid: "guid-42".to_string(),
        platform: "android-x86".to_string(),
        build_type: "debug".to_string(),
        build_url: build.build_url.clone(),
        machine_name: "machine1".to_string(),
        job_group_name: "Android".to_string(),
        job_group_symbol: "A".to_string(),
        job_type_name: "autophone".to_string(),
        job_type_symbol: "ap".to_string(),
        result: "success".to_string(),
        config_file: "autophone.ini".to_string(),
        chunk: 1,
        builder_type: BuilderType::Buildbot,
        build,
    };

    assert_eq!(action.action, JobAction::Retrigger);
    assert_eq!(action.build.revision, "deadbeef");
}

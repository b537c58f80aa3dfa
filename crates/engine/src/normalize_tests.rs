// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use farm_adapters::taskcluster::{Artifact, BuildMetadata, TaskDefinition, TaskPayload};
use farm_adapters::treeherder::{BuildDetail, TreeherderJob};
use farm_adapters::{FakeTaskclusterClient, FakeTreeherderClient};
use std::collections::BTreeMap;

fn config() -> NormalizerConfig {
    NormalizerConfig::new(
        vec!["mozilla-central".to_string(), "try".to_string()],
        vec!["android-api-16".to_string()],
        vec!["opt".to_string()],
    )
}

fn task_def(worker_type: &str, branch: Option<&str>) -> TaskDefinition {
    let mut env = BTreeMap::new();
    if let Some(branch) = branch {
        env.insert("MH_BRANCH".to_string(), branch.to_string());
    }
    TaskDefinition {
        worker_type: worker_type.to_string(),
        payload: TaskPayload { env },
    }
}

fn setup_happy_build(tc: &FakeTaskclusterClient, repo: &str, tier: Option<u32>) -> String {
    tc.add_task("task1", task_def("gecko-3-b-android", Some(repo)));
    tc.add_artifacts(
        "task1",
        "0",
        vec![
            Artifact { name: "public/build/target.apk".to_string() },
            Artifact { name: "public/build/geckoview_example.apk".to_string() },
        ],
    );
    let build_url = tc.artifact_url("task1", "0", "public/build/target.apk");
    tc.add_build_metadata(
        &build_url,
        BuildMetadata {
            repo: repo.to_string(),
            revision: "abc123".to_string(),
            platform: "android-api-16".to_string(),
            build_type: "opt".to_string(),
            id: "20260101000000".to_string(),
            changeset: format!("https://hg.mozilla.org/{repo}/rev/abc123"),
        },
    );
    if let Some(tier) = tier {
        tc.set_tier("task1", "0", tier);
    }
    build_url
}

#[tokio::test]
async fn happy_build_with_app_data() {
    let tc = Arc::new(FakeTaskclusterClient::new());
    let th = Arc::new(FakeTreeherderClient::new());
    setup_happy_build(&tc, "mozilla-central", Some(1));
    th.add_comment("https://hg.mozilla.org/mozilla-central/rev/abc123", "bug 1 - fix");

    let normalizer = Normalizer::new(config(), tc.clone(), th.clone());
    let event = normalizer.handle_task_completed("task1", "0").await.expect("event emitted");

    assert_eq!(event.repo, "mozilla-central");
    assert_eq!(event.platform, "android-api-16");
    assert_eq!(event.build_type, "opt");
    assert!(event.app_data.contains_key("org.mozilla.fennec"));
    assert!(event.app_data.contains_key("org.mozilla.geckoview_example"));
}

#[tokio::test]
async fn try_without_opt_in_is_dropped() {
    let tc = Arc::new(FakeTaskclusterClient::new());
    let th = Arc::new(FakeTreeherderClient::new());
    setup_happy_build(&tc, "try", Some(1));
    th.add_comment("https://hg.mozilla.org/try/rev/abc123", "Bug 123 - fix");

    let normalizer = Normalizer::new(config(), tc, th);
    assert!(normalizer.handle_task_completed("task1", "0").await.is_none());
}

#[tokio::test]
async fn try_with_opt_in_is_emitted() {
    let tc = Arc::new(FakeTaskclusterClient::new());
    let th = Arc::new(FakeTreeherderClient::new());
    setup_happy_build(&tc, "try", Some(1));
    th.add_comment("https://hg.mozilla.org/try/rev/abc123", "try: -b o -p android-api-16; autophone");

    let normalizer = Normalizer::new(config(), tc, th);
    assert!(normalizer.handle_task_completed("task1", "0").await.is_some());
}

#[tokio::test]
async fn wrong_tier_is_dropped_before_dispatch() {
    let tc = Arc::new(FakeTaskclusterClient::new());
    let th = Arc::new(FakeTreeherderClient::new());
    setup_happy_build(&tc, "mozilla-central", Some(3));

    let normalizer = Normalizer::new(config(), tc, th);
    assert!(normalizer.handle_task_completed("task1", "0").await.is_none());
}

#[tokio::test]
async fn buildbot_ignores_tier() {
    let tc = Arc::new(FakeTaskclusterClient::new());
    let th = Arc::new(FakeTreeherderClient::new());
    tc.add_task("task1", task_def("buildbot", Some("mozilla-central")));
    tc.add_artifacts("task1", "0", vec![Artifact { name: "public/build/target.apk".to_string() }]);
    let build_url = tc.artifact_url("task1", "0", "public/build/target.apk");
    tc.add_build_metadata(
        &build_url,
        BuildMetadata {
            repo: "mozilla-central".to_string(),
            revision: "abc123".to_string(),
            platform: "android-api-16".to_string(),
            build_type: "opt".to_string(),
            id: "20260101000000".to_string(),
            changeset: "https://hg.mozilla.org/mozilla-central/rev/abc123".to_string(),
        },
    );
    // No tier registered at all; buildbot must not gate on it.

    let normalizer = Normalizer::new(config(), tc, th);
    assert!(normalizer.handle_task_completed("task1", "0").await.is_some());
}

#[tokio::test]
async fn wrong_branch_is_dropped_before_artifact_fetch() {
    let tc = Arc::new(FakeTaskclusterClient::new());
    let th = Arc::new(FakeTreeherderClient::new());
    tc.add_task("task1", task_def("gecko-3-b-android", Some("some-other-branch")));

    let normalizer = Normalizer::new(config(), tc, th);
    assert!(normalizer.handle_task_completed("task1", "0").await.is_none());
}

#[tokio::test]
async fn no_target_apk_is_dropped() {
    let tc = Arc::new(FakeTaskclusterClient::new());
    let th = Arc::new(FakeTreeherderClient::new());
    tc.add_task("task1", task_def("gecko-3-b-android", Some("mozilla-central")));
    tc.add_artifacts(
        "task1",
        "0",
        vec![Artifact { name: "public/build/geckoview_example.apk".to_string() }],
    );

    let normalizer = Normalizer::new(config(), tc, th);
    assert!(normalizer.handle_task_completed("task1", "0").await.is_none());
}

fn job_action_fixtures(th: &FakeTreeherderClient, tc: &FakeTaskclusterClient) {
    th.add_job(
        "42",
        TreeherderJob {
            platform_option: "opt".to_string(),
            job_guid: "guid-42".to_string(),
            platform: "android-api-16".to_string(),
            machine_name: "machine1".to_string(),
            job_group_name: "Android".to_string(),
            job_group_symbol: "A".to_string(),
            job_type_name: "autophone".to_string(),
            job_type_symbol: "ap".to_string(),
            result: "success".to_string(),
        },
    );
    th.add_build_detail(
        "42",
        BuildDetail {
            build_url: "https://example.com/android-api-16/target.apk".to_string(),
            config_file: "autophone.ini".to_string(),
            chunk: 1,
            builder_type: "taskcluster".to_string(),
        },
    );
    tc.add_build_metadata(
        "https://example.com/android-api-16/target.apk",
        BuildMetadata {
            repo: "try".to_string(),
            revision: "abc123".to_string(),
            platform: "android-api-16".to_string(),
            build_type: "opt".to_string(),
            id: "20260101000000".to_string(),
            changeset: "https://hg.mozilla.org/try/rev/abc123".to_string(),
        },
    );
}

#[tokio::test]
async fn job_action_happy_path() {
    let tc = Arc::new(FakeTaskclusterClient::new());
    let th = Arc::new(FakeTreeherderClient::new());
    job_action_fixtures(&th, &tc);

    let normalizer = Normalizer::new(config(), tc, th);
    let event = normalizer
        .handle_job_action(JobAction::Retrigger, "try", "42")
        .await
        .expect("event emitted");

    assert_eq!(event.platform, "android-api-16");
    assert_eq!(event.machine_name, "machine1");
    assert_eq!(event.build.repo, "try");
}

#[tokio::test]
async fn job_action_on_a_try_push_is_not_gated_on_an_autophone_comment() {
    // Unlike handle_task_completed, handle_job_action never checks for a
    // try-push opt-in comment.
    let tc = Arc::new(FakeTaskclusterClient::new());
    let th = Arc::new(FakeTreeherderClient::new());
    job_action_fixtures(&th, &tc);
    th.add_comment("https://hg.mozilla.org/try/rev/abc123", "unrelated comment");

    let normalizer = Normalizer::new(config(), tc, th);
    assert!(normalizer.handle_job_action(JobAction::Retrigger, "try", "42").await.is_some());
}

#[tokio::test]
async fn job_action_rejects_untracked_project() {
    let tc = Arc::new(FakeTaskclusterClient::new());
    let th = Arc::new(FakeTreeherderClient::new());
    job_action_fixtures(&th, &tc);

    let normalizer = Normalizer::new(config(), tc, th);
    assert!(normalizer
        .handle_job_action(JobAction::Cancel, "untracked-project", "42")
        .await
        .is_none());
}

#[tokio::test]
async fn platform_matching_is_never_shadowed() {
    let platforms = vec!["android-api-16".to_string(), "android-api-16-debug".to_string()];
    let mut sorted = platforms.clone();
    farm_core::platform::sort_platforms_longest_first(&mut sorted);
    let detected = detect_platform(&sorted, "https://example.com/android-api-16-debug/target.apk", "fallback");
    assert_eq!(detected, "android-api-16-debug");
}

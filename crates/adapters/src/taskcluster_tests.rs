// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeMap;

#[tokio::test]
async fn fake_client_returns_registered_task() {
    let client = FakeTaskclusterClient::new();
    let mut env = BTreeMap::new();
    env.insert("MH_BRANCH".to_string(), "mozilla-central".to_string());
    client.add_task(
        "task1",
        TaskDefinition {
            worker_type: "gecko-3-b-android".to_string(),
            payload: TaskPayload { env },
        },
    );

    let task = client.get_task("task1").await.unwrap();
    assert_eq!(task.worker_type, "gecko-3-b-android");
    assert_eq!(task.payload.env.get("MH_BRANCH").unwrap(), "mozilla-central");
}

#[tokio::test]
async fn fake_client_unknown_task_errors() {
    let client = FakeTaskclusterClient::new();
    let err = client.get_task("missing").await.unwrap_err();
    assert!(matches!(err, AdapterError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn fake_client_lists_artifacts() {
    let client = FakeTaskclusterClient::new();
    client.add_artifacts(
        "task1",
        "0",
        vec![
            Artifact { name: "public/build/target.apk".to_string() },
            Artifact { name: "public/build/geckoview_example.apk".to_string() },
        ],
    );
    let artifacts = client.list_artifacts("task1", "0").await.unwrap();
    assert_eq!(artifacts.len(), 2);
}

#[tokio::test]
async fn fake_client_returns_registered_build_metadata() {
    let client = FakeTaskclusterClient::new();
    client.add_build_metadata(
        "https://queue.taskcluster.net/v1/task/task1/runs/0/artifacts/public/build/target.apk",
        BuildMetadata {
            repo: "try".to_string(),
            revision: "abc123".to_string(),
            platform: "android-api-16".to_string(),
            build_type: "opt".to_string(),
            id: "20260101000000".to_string(),
            changeset: "https://hg.mozilla.org/try/rev/abc123".to_string(),
        },
    );

    let metadata = client
        .get_build_metadata("https://queue.taskcluster.net/v1/task/task1/runs/0/artifacts/public/build/target.apk")
        .await
        .unwrap();
    assert_eq!(metadata.repo, "try");
    assert_eq!(metadata.build_type, "opt");
}

#[tokio::test]
async fn fake_client_tier_defaults_to_none() {
    let client = FakeTaskclusterClient::new();
    assert_eq!(client.tier("try", "task1", "0").await.unwrap(), None);
    client.set_tier("task1", "0", 1);
    assert_eq!(client.tier("try", "task1", "0").await.unwrap(), Some(1));
}

#[test]
fn artifact_url_is_well_formed() {
    let client = ReqwestTaskclusterClient::new("https://queue.taskcluster.net/v1");
    assert_eq!(
        client.artifact_url("task1", "0", "public/build/target.apk"),
        "https://queue.taskcluster.net/v1/task/task1/runs/0/artifacts/public/build/target.apk"
    );
}

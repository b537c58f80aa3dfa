// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use farm_adapters::{FakeWorkerProcess, FakeWorkerProcessSpawner};
use farm_core::test_support::job;
use farm_core::{FakeClock, WorkerStatusMessage};
use std::time::Duration;

fn registry(spawner: FakeWorkerProcessSpawner, dir: &tempfile::TempDir) -> WorkerRegistry<FakeClock> {
    let (status_tx, _status_rx) = tokio::sync::mpsc::channel(16);
    WorkerRegistry::new(
        Arc::new(spawner),
        dir.path().to_path_buf(),
        dir.path().join("cache.json"),
        CrashPolicy { max_crashes: 2, window: Duration::from_secs(3600) },
        FakeClock::new(),
        status_tx,
    )
}

fn register_fields(name: &str) -> RegisterFields {
    RegisterFields {
        name: name.to_string(),
        hardware: "nexus-5".to_string(),
        pool: "default".to_string(),
        ipaddr: "192.168.1.50".to_string(),
        cmdport: 20701,
        os: "6.0".to_string(),
    }
}

#[tokio::test]
async fn register_spawns_new_worker_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let process = FakeWorkerProcess::new();
    let registry = registry(FakeWorkerProcessSpawner::new(process), &dir);

    let phoneid = registry.register(&register_fields("aa:bb:cc:dd:ee:ff")).await.unwrap();
    assert_eq!(registry.worker_count().await, 1);
    assert!(registry.find(phoneid.as_str()).await.is_some());

    let roster = farm_storage::load_roster(&dir.path().join("cache.json")).unwrap();
    assert_eq!(roster.phones.len(), 1);
    assert_eq!(roster.phones[0].phoneid, phoneid);
}

#[tokio::test]
async fn register_existing_phone_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let process = FakeWorkerProcess::new();
    let registry = registry(FakeWorkerProcessSpawner::new(process), &dir);

    let fields = register_fields("aa:bb:cc:dd:ee:ff");
    let phoneid = registry.register(&fields).await.unwrap();

    let mut updated = fields.clone();
    updated.ipaddr = "10.0.0.5".to_string();
    let second = registry.register(&updated).await.unwrap();

    assert_eq!(second, phoneid);
    assert_eq!(registry.worker_count().await, 1);
    let roster = farm_storage::load_roster(&dir.path().join("cache.json")).unwrap();
    assert_eq!(roster.phones[0].ip, "192.168.1.50");
}

#[tokio::test]
async fn dispatch_to_all_skips_disabled_workers() {
    let dir = tempfile::tempdir().unwrap();
    let process = FakeWorkerProcess::new();
    let registry = registry(FakeWorkerProcessSpawner::new(process.clone()), &dir);
    let phoneid = registry.register(&register_fields("aa:bb:cc:dd:ee:ff")).await.unwrap();

    registry.send_command(&phoneid, WorkerCommand::Disable(None)).await.unwrap();
    registry.dispatch_to_all(&job("rev1")).await.unwrap();

    assert!(process.dispatched().is_empty());
}

#[tokio::test]
async fn dispatch_to_all_reaches_enabled_workers() {
    let dir = tempfile::tempdir().unwrap();
    let process = FakeWorkerProcess::new();
    let registry = registry(FakeWorkerProcessSpawner::new(process.clone()), &dir);
    registry.register(&register_fields("aa:bb:cc:dd:ee:ff")).await.unwrap();

    registry.dispatch_to_all(&job("rev1")).await.unwrap();

    assert_eq!(process.dispatched().len(), 1);
}

#[tokio::test]
async fn send_command_disable_then_enable_updates_state_and_forwards() {
    let dir = tempfile::tempdir().unwrap();
    let process = FakeWorkerProcess::new();
    let registry = registry(FakeWorkerProcessSpawner::new(process.clone()), &dir);
    let phoneid = registry.register(&register_fields("aa:bb:cc:dd:ee:ff")).await.unwrap();

    registry.send_command(&phoneid, WorkerCommand::Disable(Some("maint".to_string()))).await.unwrap();
    registry.send_command(&phoneid, WorkerCommand::Enable).await.unwrap();

    let sent = process.commands_sent();
    assert_eq!(sent.len(), 2);

    let entries = registry.status_entries().await;
    assert_eq!(entries[0].status_name.as_deref(), Some("started"));
}

#[tokio::test]
async fn send_command_unknown_phone_errs() {
    let dir = tempfile::tempdir().unwrap();
    let process = FakeWorkerProcess::new();
    let registry = registry(FakeWorkerProcessSpawner::new(process), &dir);

    let err = registry
        .send_command(&PhoneId::new("nobody"), WorkerCommand::Ping(None))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::WorkerNotFound(_)));
}

#[tokio::test]
async fn record_status_tracks_previous_and_current_build() {
    let dir = tempfile::tempdir().unwrap();
    let process = FakeWorkerProcess::new();
    let registry = registry(FakeWorkerProcessSpawner::new(process), &dir);
    let phoneid = registry.register(&register_fields("aa:bb:cc:dd:ee:ff")).await.unwrap();

    registry
        .record_status(&phoneid, WorkerStatusMessage { status: "running test 1".to_string(), current_build_unix: Some(100), crashed: false })
        .await
        .unwrap();
    registry
        .record_status(&phoneid, WorkerStatusMessage { status: "running test 2".to_string(), current_build_unix: None, crashed: false })
        .await
        .unwrap();

    let entries = registry.status_entries().await;
    assert_eq!(entries[0].last_update.as_ref().unwrap().short_desc, "running test 2");
    assert_eq!(entries[0].previous_status.as_ref().unwrap().short_desc, "running test 1");
    assert_eq!(entries[0].current_build_unix, Some(100));
}

#[tokio::test]
async fn record_status_crash_disables_after_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let process = FakeWorkerProcess::new();
    let registry = registry(FakeWorkerProcessSpawner::new(process), &dir);
    let phoneid = registry.register(&register_fields("aa:bb:cc:dd:ee:ff")).await.unwrap();

    for _ in 0..2 {
        registry
            .record_status(&phoneid, WorkerStatusMessage { status: "crash".to_string(), current_build_unix: None, crashed: true })
            .await
            .unwrap();
    }

    let entries = registry.status_entries().await;
    assert_eq!(entries[0].status_name.as_deref(), Some("disabled"));
}

#[tokio::test]
async fn liveness_scan_respawns_after_exit() {
    let dir = tempfile::tempdir().unwrap();
    let process = FakeWorkerProcess::new();
    let registry = registry(FakeWorkerProcessSpawner::new(process.clone()), &dir);
    registry.register(&register_fields("aa:bb:cc:dd:ee:ff")).await.unwrap();

    process.set_exit_code(1);
    let transitions = registry.liveness_scan().await.unwrap();

    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].to, WorkerState::Disconnected);
}

#[tokio::test]
async fn liveness_scan_disables_after_too_many_crashes() {
    let dir = tempfile::tempdir().unwrap();
    let process = FakeWorkerProcess::new();
    let registry = registry(FakeWorkerProcessSpawner::new(process.clone()), &dir);
    registry.register(&register_fields("aa:bb:cc:dd:ee:ff")).await.unwrap();

    process.set_exit_code(1);
    registry.liveness_scan().await.unwrap();
    process.set_exit_code(1);
    let transitions = registry.liveness_scan().await.unwrap();

    assert_eq!(transitions.last().unwrap().to, WorkerState::Disabled);
}

#[tokio::test]
async fn shutdown_all_kills_every_worker() {
    let dir = tempfile::tempdir().unwrap();
    let process = FakeWorkerProcess::new();
    let registry = registry(FakeWorkerProcessSpawner::new(process.clone()), &dir);
    registry.register(&register_fields("aa:bb:cc:dd:ee:ff")).await.unwrap();

    registry.shutdown_all().await;

    assert!(process.was_killed());
}

#[tokio::test]
async fn status_entries_sorted_by_phoneid() {
    let dir = tempfile::tempdir().unwrap();
    let process = FakeWorkerProcess::new();
    let registry = registry(FakeWorkerProcessSpawner::new(process), &dir);
    registry.register(&register_fields("zz:zz:zz:zz:zz:zz")).await.unwrap();
    registry.register(&register_fields("aa:aa:aa:aa:aa:aa")).await.unwrap();

    let entries = registry.status_entries().await;
    assert!(entries[0].phoneid < entries[1].phoneid);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::dispatcher::Dispatcher;
use farm_adapters::{FakeBuildCache, FakeWorkerProcess, FakeWorkerProcessSpawner};
use farm_core::{CrashPolicy, FakeClock};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

async fn spawn_server(process: FakeWorkerProcess) -> (std::net::SocketAddr, Arc<WorkerRegistry<FakeClock>>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let (status_tx, _status_rx) = tokio::sync::mpsc::channel(16);
    let registry = Arc::new(WorkerRegistry::new(
        Arc::new(FakeWorkerProcessSpawner::new(process)),
        dir.path().to_path_buf(),
        dir.path().join("cache.json"),
        CrashPolicy { max_crashes: 2, window: Duration::from_secs(3600) },
        FakeClock::new(),
        status_tx,
    ));
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(FakeBuildCache::new())));
    let shutdown = Arc::new(tokio::sync::Notify::new());
    let server = Arc::new(CommandServer::new(registry.clone(), dispatcher, shutdown));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    (addr, registry, dir)
}

async fn connect(addr: std::net::SocketAddr) -> (tokio::io::WriteHalf<TcpStream>, BufReader<tokio::io::ReadHalf<TcpStream>>) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    let mut greeting = String::new();
    reader.read_line(&mut greeting).await.unwrap();
    assert_eq!(greeting, farm_wire::greeting());
    (write_half, reader)
}

async fn send(write_half: &mut tokio::io::WriteHalf<TcpStream>, reader: &mut BufReader<tokio::io::ReadHalf<TcpStream>>, line: &str) -> String {
    write_half.write_all(line.as_bytes()).await.unwrap();
    write_half.write_all(b"\n").await.unwrap();
    let mut response = String::new();
    reader.read_line(&mut response).await.unwrap();
    response.trim_end().to_string()
}

#[tokio::test]
async fn greeting_is_sent_once_per_connection() {
    let (addr, _registry, _dir) = spawn_server(FakeWorkerProcess::new()).await;
    let (_write_half, _reader) = connect(addr).await;
}

#[tokio::test]
async fn status_replies_ok_when_no_workers_registered() {
    let (addr, _registry, _dir) = spawn_server(FakeWorkerProcess::new()).await;
    let (mut write_half, mut reader) = connect(addr).await;

    let response = send(&mut write_half, &mut reader, "status").await;
    assert_eq!(response, "ok");
}

#[tokio::test]
async fn register_then_status_reports_the_new_phone() {
    let (addr, registry, _dir) = spawn_server(FakeWorkerProcess::new()).await;
    let (mut write_half, mut reader) = connect(addr).await;

    let response = send(
        &mut write_half,
        &mut reader,
        "register name=aa:bb:cc:dd:ee:ff&hardware=nexus-5&pool=default&ipaddr=192.168.1.50&cmdport=20701&os=6.0",
    )
    .await;
    assert_eq!(response, "ok");
    assert_eq!(registry.worker_count().await, 1);
}

#[tokio::test]
async fn unknown_phone_command_reports_not_found() {
    let (addr, _registry, _dir) = spawn_server(FakeWorkerProcess::new()).await;
    let (mut write_half, mut reader) = connect(addr).await;

    let response = send(&mut write_half, &mut reader, "disable nobody").await;
    assert_eq!(response, "error: phone not found");
}

#[tokio::test]
async fn unrecognized_verb_reports_unknown_command() {
    let (addr, _registry, _dir) = spawn_server(FakeWorkerProcess::new()).await;
    let (mut write_half, mut reader) = connect(addr).await;

    let response = send(&mut write_half, &mut reader, "frobnicate").await;
    assert_eq!(response, "Unknown command \"frobnicate\"");
}

#[tokio::test]
async fn quit_closes_connection_without_a_reply() {
    let (addr, _registry, _dir) = spawn_server(FakeWorkerProcess::new()).await;
    let (mut write_half, mut reader) = connect(addr).await;

    write_half.write_all(b"quit\n").await.unwrap();
    let mut buf = String::new();
    let n = reader.read_line(&mut buf).await.unwrap();
    assert_eq!(n, 0, "connection must close with no further bytes after quit");
}

#[tokio::test]
async fn log_command_replies_ok() {
    let (addr, _registry, _dir) = spawn_server(FakeWorkerProcess::new()).await;
    let (mut write_half, mut reader) = connect(addr).await;

    let response = send(&mut write_half, &mut reader, "log something happened").await;
    assert_eq!(response, "ok");
}

#[tokio::test]
async fn commands_on_concurrent_connections_are_serialized() {
    let (addr, _registry, _dir) = spawn_server(FakeWorkerProcess::new()).await;
    let (mut w1, mut r1) = connect(addr).await;
    let (mut w2, mut r2) = connect(addr).await;

    let reply1 = send(&mut w1, &mut r1, "status").await;
    let reply2 = send(&mut w2, &mut r2, "status").await;
    assert_eq!(reply1, "ok");
    assert_eq!(reply2, "ok");
}

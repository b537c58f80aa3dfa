// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-phone test-runner subprocess: one OS process per registered worker,
//! fed `Job`s over its stdin and logged to its own file.

use crate::error::AdapterError;
use async_trait::async_trait;
use farm_core::{Job, PhoneConfig, WorkerCommand};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

/// Spawns the per-phone subprocess that actually drives the device.
///
/// Returns the write/control handle and the stdout reader as two separate
/// objects, mirroring a real child process's independent stdin and stdout
/// pipes. The reader is handed to its own long-lived task so a worker that
/// has gone quiet on stdout never blocks a `dispatch` or `send_command`
/// call made through the control handle.
#[async_trait]
pub trait WorkerProcessSpawner: Send + Sync + 'static {
    async fn spawn(
        &self,
        phone: &PhoneConfig,
        log_path: &Path,
    ) -> Result<(Box<dyn WorkerProcess>, Box<dyn WorkerStatusReader>), AdapterError>;
}

/// The write/control half of a running (or exited) worker subprocess.
#[async_trait]
pub trait WorkerProcess: Send + Sync {
    /// Hand the process one job, encoded as a JSON line on stdin.
    async fn dispatch(&mut self, job: &Job) -> Result<(), AdapterError>;

    /// Send an operator-issued command (enable/disable/debug/ping/reboot),
    /// encoded the same way as `dispatch`, replacing the original's
    /// `getattr(worker, cmd)` polymorphism with an explicit variant.
    async fn send_command(&mut self, command: &WorkerCommand) -> Result<(), AdapterError>;

    /// Non-blocking exit check; `Some(code)` once the process has exited.
    fn try_wait(&mut self) -> Result<Option<i32>, AdapterError>;

    async fn kill(&mut self) -> Result<(), AdapterError>;
}

/// The read half of a running worker subprocess: its stdout, the pipe
/// mailbox forwarded into the Supervisor's shared channel. Owned
/// exclusively by the worker's status-reader task, never shared with the
/// `WorkerProcess` control handle.
#[async_trait]
pub trait WorkerStatusReader: Send {
    /// Read the next JSON status line. `Ok(None)` means the worker closed
    /// stdout (process exited).
    async fn next_status_line(&mut self) -> Result<Option<String>, AdapterError>;
}

/// Spawns `runner_binary test-path --phoneid <id> --ip <ip> ...` and talks
/// to it over stdin/stdout, matching the teacher's use of
/// `tokio::process::Command` for long-running subprocess supervision.
pub struct TokioWorkerProcessSpawner {
    runner_binary: PathBuf,
    test_manifest_path: PathBuf,
}

impl TokioWorkerProcessSpawner {
    pub fn new(runner_binary: impl Into<PathBuf>, test_manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            runner_binary: runner_binary.into(),
            test_manifest_path: test_manifest_path.into(),
        }
    }
}

#[async_trait]
impl WorkerProcessSpawner for TokioWorkerProcessSpawner {
    async fn spawn(
        &self,
        phone: &PhoneConfig,
        log_path: &Path,
    ) -> Result<(Box<dyn WorkerProcess>, Box<dyn WorkerStatusReader>), AdapterError> {
        let log_file = std::fs::File::create(log_path).map_err(|source| AdapterError::Io {
            path: log_path.to_path_buf(),
            source,
        })?;

        let mut command = Command::new(&self.runner_binary);
        command
            .arg("--test-path")
            .arg(&self.test_manifest_path)
            .arg("--phoneid")
            .arg(phone.phoneid.as_str())
            .arg("--ip")
            .arg(&phone.ip)
            .arg("--sutcmdport")
            .arg(phone.sutcmdport.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(log_file));

        let mut child = command.spawn().map_err(|source| AdapterError::Io {
            path: self.runner_binary.clone(),
            source,
        })?;

        let stdout = child.stdout.take().ok_or_else(|| AdapterError::Process("worker stdout not piped".to_string()))?;
        let lines = BufReader::new(stdout).lines();

        Ok((Box::new(ChildWorkerProcess { child }), Box::new(ChildStatusReader { lines })))
    }
}

struct ChildWorkerProcess {
    child: Child,
}

struct ChildStatusReader {
    lines: Lines<BufReader<ChildStdout>>,
}

#[async_trait]
impl WorkerProcess for ChildWorkerProcess {
    async fn dispatch(&mut self, job: &Job) -> Result<(), AdapterError> {
        let Some(stdin) = self.child.stdin.as_mut() else {
            return Err(AdapterError::Process("worker stdin already closed".to_string()));
        };
        let mut line = serde_json::to_string(job).map_err(|e| AdapterError::Process(e.to_string()))?;
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| AdapterError::Process(e.to_string()))
    }

    async fn send_command(&mut self, command: &WorkerCommand) -> Result<(), AdapterError> {
        let Some(stdin) = self.child.stdin.as_mut() else {
            return Err(AdapterError::Process("worker stdin already closed".to_string()));
        };
        let mut line = serde_json::to_string(command).map_err(|e| AdapterError::Process(e.to_string()))?;
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| AdapterError::Process(e.to_string()))
    }

    fn try_wait(&mut self) -> Result<Option<i32>, AdapterError> {
        self.child
            .try_wait()
            .map(|status| status.and_then(|s| s.code()))
            .map_err(|e| AdapterError::Process(e.to_string()))
    }

    async fn kill(&mut self) -> Result<(), AdapterError> {
        self.child.kill().await.map_err(|e| AdapterError::Process(e.to_string()))
    }
}

#[async_trait]
impl WorkerStatusReader for ChildStatusReader {
    async fn next_status_line(&mut self) -> Result<Option<String>, AdapterError> {
        self.lines.next_line().await.map_err(|e| AdapterError::Process(e.to_string()))
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{Job, AdapterError, WorkerCommand, WorkerProcess, WorkerProcessSpawner, WorkerStatusReader};
    use async_trait::async_trait;
    use farm_core::PhoneConfig;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeState {
        dispatched: Vec<Job>,
        commands: Vec<WorkerCommand>,
        status_lines: VecDeque<String>,
        exit_code: Option<i32>,
        killed: bool,
    }

    #[derive(Clone, Default)]
    pub struct FakeWorkerProcess {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeWorkerProcess {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_exit_code(&self, code: i32) {
            self.inner.lock().exit_code = Some(code);
        }

        pub fn dispatched(&self) -> Vec<Job> {
            self.inner.lock().dispatched.clone()
        }

        pub fn commands_sent(&self) -> Vec<WorkerCommand> {
            self.inner.lock().commands.clone()
        }

        pub fn was_killed(&self) -> bool {
            self.inner.lock().killed
        }

        pub fn push_status_line(&self, line: impl Into<String>) {
            self.inner.lock().status_lines.push_back(line.into());
        }
    }

    #[async_trait]
    impl WorkerProcess for FakeWorkerProcess {
        async fn dispatch(&mut self, job: &Job) -> Result<(), AdapterError> {
            self.inner.lock().dispatched.push(job.clone());
            Ok(())
        }

        async fn send_command(&mut self, command: &WorkerCommand) -> Result<(), AdapterError> {
            self.inner.lock().commands.push(command.clone());
            Ok(())
        }

        fn try_wait(&mut self) -> Result<Option<i32>, AdapterError> {
            Ok(self.inner.lock().exit_code)
        }

        async fn kill(&mut self) -> Result<(), AdapterError> {
            self.inner.lock().killed = true;
            Ok(())
        }
    }

    #[async_trait]
    impl WorkerStatusReader for FakeWorkerProcess {
        async fn next_status_line(&mut self) -> Result<Option<String>, AdapterError> {
            Ok(self.inner.lock().status_lines.pop_front())
        }
    }

    #[derive(Clone, Default)]
    pub struct FakeWorkerProcessSpawner {
        pub process: FakeWorkerProcess,
    }

    impl FakeWorkerProcessSpawner {
        pub fn new(process: FakeWorkerProcess) -> Self {
            Self { process }
        }
    }

    #[async_trait]
    impl WorkerProcessSpawner for FakeWorkerProcessSpawner {
        async fn spawn(
            &self,
            _phone: &PhoneConfig,
            _log_path: &Path,
        ) -> Result<(Box<dyn WorkerProcess>, Box<dyn WorkerStatusReader>), AdapterError> {
            Ok((Box::new(self.process.clone()), Box::new(self.process.clone())))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeWorkerProcess, FakeWorkerProcessSpawner};

#[cfg(test)]
#[path = "worker_process_tests.rs"]
mod tests;

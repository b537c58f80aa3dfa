// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker Registry: tracks one `Worker` per registered phone, owns its
//! subprocess handle, and is the single point of truth for fan-out,
//! liveness, and `status` rendering.

use crate::error::EngineError;
use farm_adapters::{WorkerProcess, WorkerProcessSpawner, WorkerStatusReader};
use farm_core::clock::Clock;
use farm_core::job::Job;
use farm_core::phone::{PhoneConfig, PhoneId};
use farm_core::worker::{CrashCounter, CrashPolicy, WorkerCommand, WorkerNumber, WorkerState, WorkerStatusMessage};
use farm_storage::{load_roster, save_roster, Roster};
use farm_wire::{RegisterFields, StatusUpdate, WorkerStatusEntry};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};

struct StatusRecord {
    at: Instant,
    desc: String,
}

/// One registered phone: its identity, lifecycle state, crash accounting,
/// and the live subprocess handle driving it. Its stdout reader is spawned
/// separately as its own task over a `WorkerStatusReader` it owns outright,
/// so a worker gone quiet on stdout never blocks a `dispatch`/`send_command`
/// made through `process` here.
struct Worker {
    config: PhoneConfig,
    number: WorkerNumber,
    state: WorkerState,
    state_since: Instant,
    crashes: CrashCounter,
    process: Box<dyn WorkerProcess>,
    log_path: PathBuf,
    last_status: Option<StatusRecord>,
    previous_status: Option<StatusRecord>,
    current_build_unix: Option<i64>,
}

/// Outcome of one worker's liveness check, surfaced so the Supervisor can
/// log or email-notify on a state change (spec.md §4.4 `too_many_crashes`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessTransition {
    pub phoneid: PhoneId,
    pub from: WorkerState,
    pub to: WorkerState,
}

pub struct WorkerRegistry<C: Clock> {
    workers: Mutex<HashMap<PhoneId, Worker>>,
    next_number: AtomicU64,
    spawner: Arc<dyn WorkerProcessSpawner>,
    log_dir: PathBuf,
    roster_path: PathBuf,
    crash_policy: CrashPolicy,
    clock: C,
    status_tx: mpsc::Sender<(PhoneId, WorkerStatusMessage)>,
}

impl<C: Clock> WorkerRegistry<C> {
    pub fn new(
        spawner: Arc<dyn WorkerProcessSpawner>,
        log_dir: PathBuf,
        roster_path: PathBuf,
        crash_policy: CrashPolicy,
        clock: C,
        status_tx: mpsc::Sender<(PhoneId, WorkerStatusMessage)>,
    ) -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
            next_number: AtomicU64::new(0),
            spawner,
            log_dir,
            roster_path,
            crash_policy,
            clock,
            status_tx,
        }
    }

    fn log_path_for(&self, phoneid: &PhoneId) -> PathBuf {
        self.log_dir.join(format!("{}.log", phoneid.as_str()))
    }

    /// Re-register every phone in the on-disk roster, spawning a worker for
    /// each (spec.md §4.4: the roster file defines the startup re-registration
    /// set).
    pub async fn load_roster(&self) -> Result<usize, EngineError> {
        let roster = load_roster(&self.roster_path)?;
        let count = roster.phones.len();
        for config in roster.phones {
            self.spawn_worker(config).await?;
        }
        Ok(count)
    }

    /// Spawn the dedicated reader task that tags every status line off a
    /// worker's stdout with its `phoneid` before forwarding it to the
    /// Supervisor's shared mailbox. It owns the `WorkerStatusReader`
    /// outright, so its potentially long-lived `next_status_line` await
    /// never contends with a `dispatch` or `send_command` issued through
    /// the worker's own `WorkerProcess` handle. Ends quietly once the
    /// process's stdout closes (`Ok(None)`) or errors.
    fn spawn_status_reader(&self, phoneid: PhoneId, mut reader: Box<dyn WorkerStatusReader>) {
        let tx = self.status_tx.clone();
        tokio::spawn(async move {
            loop {
                let line = match reader.next_status_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        tracing::warn!(%phoneid, %err, "worker status reader stopped");
                        break;
                    }
                };

                match serde_json::from_str::<WorkerStatusMessage>(&line) {
                    Ok(message) => {
                        if tx.send((phoneid.clone(), message)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => tracing::warn!(%phoneid, %err, %line, "could not parse worker status line"),
                }
            }
        });
    }

    async fn spawn_worker(&self, config: PhoneConfig) -> Result<PhoneId, EngineError> {
        let phoneid = config.phoneid.clone();
        let log_path = self.log_path_for(&phoneid);
        let (process, reader) = self.spawner.spawn(&config, &log_path).await?;
        let number = WorkerNumber(self.next_number.fetch_add(1, Ordering::SeqCst));

        self.spawn_status_reader(phoneid.clone(), reader);

        let worker = Worker {
            config,
            number,
            state: WorkerState::Started,
            state_since: self.clock.now(),
            crashes: CrashCounter::new(self.crash_policy),
            process,
            log_path,
            last_status: None,
            previous_status: None,
            current_build_unix: None,
        };

        self.workers.lock().await.insert(phoneid.clone(), worker);
        Ok(phoneid)
    }

    /// Handle a `register <urlencoded>` command: create (and spawn) a new
    /// worker, or, if the phone is already registered, do nothing beyond a
    /// debug log (spec.md §8: the second call is a no-op).
    pub async fn register(&self, fields: &RegisterFields) -> Result<PhoneId, EngineError> {
        let phoneid = PhoneId::from_registration(&fields.name, &fields.hardware);

        if self.workers.lock().await.contains_key(&phoneid) {
            tracing::debug!(%phoneid, "ignoring register for already-registered worker");
            return Ok(phoneid);
        }

        let config = PhoneConfig {
            phoneid: phoneid.clone(),
            serial: fields.name.clone(),
            ip: fields.ipaddr.clone(),
            sutcmdport: fields.cmdport,
            machinetype: fields.hardware.clone(),
            osver: fields.os.clone(),
            debug: 3,
        };

        tracing::info!(%phoneid, pool = %fields.pool, "registering new worker");
        let phoneid = self.spawn_worker(config).await?;
        self.persist().await?;
        Ok(phoneid)
    }

    /// Resolve a `serial` or `phoneid` to a registered `PhoneId`.
    pub async fn find(&self, needle: &str) -> Option<PhoneId> {
        self.workers
            .lock()
            .await
            .values()
            .find(|w| w.config.matches(needle))
            .map(|w| w.config.phoneid.clone())
    }

    /// Fan a job out to every currently-enabled worker (spec.md §3
    /// invariant), under the registry's single lock, matching the original
    /// server's atomic fan-out.
    pub async fn dispatch_to_all(&self, job: &Job) -> Result<(), EngineError> {
        let mut workers = self.workers.lock().await;
        for worker in workers.values_mut().filter(|w| w.state.is_enabled()) {
            if let Err(err) = worker.process.dispatch(job).await {
                tracing::warn!(phoneid = %worker.config.phoneid, %err, "job dispatch failed");
            }
        }
        Ok(())
    }

    /// Send an operator command to one worker, applying the registry-side
    /// lifecycle effect of `enable`/`disable`/`debug` alongside forwarding
    /// the command to the subprocess itself.
    pub async fn send_command(&self, phoneid: &PhoneId, command: WorkerCommand) -> Result<(), EngineError> {
        {
            let mut workers = self.workers.lock().await;
            let worker = workers
                .get_mut(phoneid)
                .ok_or_else(|| EngineError::WorkerNotFound(phoneid.to_string()))?;

            match &command {
                WorkerCommand::Enable => {
                    worker.state = WorkerState::Started;
                    worker.state_since = self.clock.now();
                }
                WorkerCommand::Disable(_) => {
                    worker.state = WorkerState::Disabled;
                    worker.state_since = self.clock.now();
                }
                WorkerCommand::Debug(Some(level)) => {
                    if let Ok(level) = level.parse::<u8>() {
                        worker.config.debug = level;
                    }
                }
                WorkerCommand::Debug(None) | WorkerCommand::Ping(_) | WorkerCommand::Reboot => {}
            }

            worker.process.send_command(&command).await?;
        }

        // The operator-facing verbs (enable/disable/debug/ping) all persist
        // the roster unconditionally, matching the original command server;
        // reboot is internal-only and never reaches here over the wire.
        if !matches!(command, WorkerCommand::Reboot) {
            self.persist().await?;
        }
        Ok(())
    }

    /// Apply one parsed status-mailbox message (spec.md §4.4): rotates the
    /// previous status, records the new one, and accounts a crash if the
    /// worker reported one.
    pub async fn record_status(&self, phoneid: &PhoneId, message: WorkerStatusMessage) -> Result<(), EngineError> {
        let mut workers = self.workers.lock().await;
        let worker = workers
            .get_mut(phoneid)
            .ok_or_else(|| EngineError::WorkerNotFound(phoneid.to_string()))?;

        worker.previous_status = worker.last_status.take();
        worker.last_status = Some(StatusRecord {
            at: self.clock.now(),
            desc: message.status,
        });
        if let Some(build) = message.current_build_unix {
            worker.current_build_unix = Some(build);
        }
        if message.crashed {
            worker.crashes.add_crash(&self.clock);
            if worker.crashes.too_many_crashes(&self.clock) {
                worker.state = WorkerState::Disabled;
                worker.state_since = self.clock.now();
                tracing::warn!(%phoneid, "worker disabled after repeated crashes");
            }
        }
        Ok(())
    }

    /// Check every worker's subprocess for exit, accounting a crash and
    /// respawning (unless too many crashes have accumulated, or the worker
    /// was deliberately disabled/stopped).
    pub async fn liveness_scan(&self) -> Result<Vec<LivenessTransition>, EngineError> {
        let phoneids: Vec<PhoneId> = self.workers.lock().await.keys().cloned().collect();
        let mut transitions = Vec::new();

        for phoneid in phoneids {
            let exited = {
                let mut workers = self.workers.lock().await;
                let Some(worker) = workers.get_mut(&phoneid) else { continue };
                if matches!(worker.state, WorkerState::Disabled | WorkerState::Stopped) {
                    continue;
                }
                worker.process.try_wait()?
            };

            let Some(_exit_code) = exited else { continue };

            let (config, log_path, from) = {
                let mut workers = self.workers.lock().await;
                let worker = workers.get_mut(&phoneid).expect("checked above");
                worker.crashes.add_crash(&self.clock);
                let from = worker.state;
                (worker.config.clone(), worker.log_path.clone(), from)
            };

            let too_many = {
                let workers = self.workers.lock().await;
                workers[&phoneid].crashes.too_many_crashes(&self.clock)
            };

            if too_many {
                let mut workers = self.workers.lock().await;
                let worker = workers.get_mut(&phoneid).expect("checked above");
                worker.state = WorkerState::Disabled;
                worker.state_since = self.clock.now();
                transitions.push(LivenessTransition { phoneid, from, to: WorkerState::Disabled });
                continue;
            }

            let (process, reader) = self.spawner.spawn(&config, &log_path).await?;
            self.spawn_status_reader(phoneid.clone(), reader);
            let mut workers = self.workers.lock().await;
            let worker = workers.get_mut(&phoneid).expect("checked above");
            worker.process = process;
            worker.state = WorkerState::Disconnected;
            worker.state_since = self.clock.now();
            transitions.push(LivenessTransition { phoneid, from, to: WorkerState::Disconnected });
        }

        Ok(transitions)
    }

    /// Render the full `status` reply body's per-worker entries.
    pub async fn status_entries(&self) -> Vec<WorkerStatusEntry> {
        let workers = self.workers.lock().await;
        let now = self.clock.now();
        let mut entries: Vec<_> = workers
            .values()
            .map(|w| WorkerStatusEntry {
                phoneid: w.config.phoneid.to_string(),
                ip: w.config.ip.clone(),
                debug_level: w.config.debug,
                current_build_unix: w.current_build_unix,
                last_update: w.last_status.as_ref().map(|s| StatusUpdate {
                    age: now.saturating_duration_since(s.at),
                    short_desc: s.desc.clone(),
                }),
                status_name: Some(w.state.to_string()),
                holding_status_for: Some(now.saturating_duration_since(w.state_since)),
                previous_status: w.previous_status.as_ref().map(|s| StatusUpdate {
                    age: now.saturating_duration_since(s.at),
                    short_desc: s.desc.clone(),
                }),
            })
            .collect();
        entries.sort_by(|a, b| a.phoneid.cmp(&b.phoneid));
        entries
    }

    /// Persist every worker's `PhoneConfig` to the roster file, atomically.
    pub async fn persist(&self) -> Result<(), EngineError> {
        let workers = self.workers.lock().await;
        let mut phones: Vec<_> = workers.values().map(|w| w.config.clone()).collect();
        phones.sort_by(|a, b| a.phoneid.as_str().cmp(b.phoneid.as_str()));
        save_roster(&self.roster_path, &Roster { phones })?;
        Ok(())
    }

    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    /// Number assigned to a worker at registration, used in per-worker log
    /// span fields.
    pub async fn worker_number(&self, phoneid: &PhoneId) -> Option<WorkerNumber> {
        self.workers.lock().await.get(phoneid).map(|w| w.number)
    }

    /// Kill every worker's subprocess (spec.md §4.6 Shutdown: "call stop()
    /// on every Worker"). Best-effort: a kill failure is logged, not
    /// propagated, since shutdown must not get stuck on one stubborn
    /// process.
    pub async fn shutdown_all(&self) {
        let mut workers = self.workers.lock().await;
        for worker in workers.values_mut() {
            if let Err(err) = worker.process.kill().await {
                tracing::warn!(phoneid = %worker.config.phoneid, %err, "failed to kill worker on shutdown");
            }
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

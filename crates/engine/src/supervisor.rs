// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor: the daemon's main loop. Ties the Worker Registry's status
//! mailbox and liveness scan together with whatever Pulse Monitor forwards,
//! and watches for the operator's `stop` command alongside SIGTERM/SIGINT.

use crate::dispatcher::Dispatcher;
use crate::pulse_monitor::PulseEvent;
use crate::registry::WorkerRegistry;
use farm_adapters::build_cache::BuildCache;
use farm_adapters::mailer::Mailer;
use farm_core::clock::Clock;
use farm_core::job::{Job, JobAction};
use farm_core::worker::{WorkerState, WorkerStatusMessage};
use farm_core::phone::PhoneId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// How often `liveness_scan` runs, replacing the original's `Queue.get`
/// timeout: that 5s wait doubled as both "how long to block for a status
/// message" and "how often to check for dead workers" in one loop
/// iteration. Splitting them onto a timer means a burst of status messages
/// no longer delays the liveness check, without changing its cadence.
const LIVENESS_INTERVAL: Duration = Duration::from_secs(5);

pub struct Supervisor<C: Clock, B: BuildCache> {
    registry: Arc<WorkerRegistry<C>>,
    dispatcher: Arc<Dispatcher<B>>,
    mailer: Arc<dyn Mailer>,
    shutdown: Arc<Notify>,
}

impl<C: Clock, B: BuildCache> Supervisor<C, B> {
    pub fn new(registry: Arc<WorkerRegistry<C>>, dispatcher: Arc<Dispatcher<B>>, mailer: Arc<dyn Mailer>, shutdown: Arc<Notify>) -> Self {
        Self { registry, dispatcher, mailer, shutdown }
    }

    /// The main loop (spec.md §4.6's `worker_msg_loop`): liveness scan on a
    /// fixed interval, worker status mailbox, optional Pulse events, and
    /// three independent shutdown signals (operator `stop`, SIGTERM,
    /// Ctrl-C), all raced with `tokio::select!`.
    pub async fn run(
        &self,
        mut status_rx: mpsc::Receiver<(PhoneId, WorkerStatusMessage)>,
        mut pulse_rx: Option<mpsc::Receiver<PulseEvent>>,
    ) -> std::io::Result<()> {
        let mut liveness_ticker = tokio::time::interval(LIVENESS_INTERVAL);
        liveness_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

        loop {
            tokio::select! {
                _ = liveness_ticker.tick() => {
                    self.run_liveness_scan().await;
                }
                Some((phoneid, message)) = status_rx.recv() => {
                    if let Err(err) = self.registry.record_status(&phoneid, message).await {
                        tracing::warn!(%phoneid, %err, "could not record worker status");
                    }
                }
                Some(event) = recv_pulse(&mut pulse_rx) => {
                    self.handle_pulse_event(event).await;
                }
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM, shutting down");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("received Ctrl-C, shutting down");
                    break;
                }
                _ = self.shutdown.notified() => {
                    tracing::info!("received operator stop command, shutting down");
                    break;
                }
            }
        }

        self.registry.shutdown_all().await;
        Ok(())
    }

    /// Check every worker for exit, accounting crashes and respawning
    /// (matching the original's `check_for_dead_workers`), then notify by
    /// email for each transition.
    async fn run_liveness_scan(&self) {
        let transitions = match self.registry.liveness_scan().await {
            Ok(transitions) => transitions,
            Err(err) => {
                tracing::error!(%err, "liveness scan failed");
                return;
            }
        };

        for transition in transitions {
            tracing::error!(phoneid = %transition.phoneid, "worker died");

            let (subject, body) = if transition.to == WorkerState::Disabled {
                (
                    format!("Worker for phone {} died and was disabled", transition.phoneid),
                    format!(
                        "Hello, this is Autophone. Just to let you know, the worker process\nfor phone {} died.\nIt looks really crashy, so I disabled it. Sorry about that.\n",
                        transition.phoneid
                    ),
                )
            } else {
                (
                    format!("Worker for phone {} died", transition.phoneid),
                    format!("Hello, this is Autophone. Just to let you know, the worker process\nfor phone {} died.\n", transition.phoneid),
                )
            };

            if let Err(err) = self.mailer.send(&subject, &body).await {
                tracing::error!(%err, "failed to send dead-phone notification");
            }
        }
    }

    /// Fan a Pulse-sourced event out to every enabled worker. A cancel
    /// job-action has no in-crate effect: per spec.md §9, cancellation of
    /// an in-flight test is the Worker subprocess's own concern, and this
    /// daemon has no wire format for forwarding it (the Worker is an
    /// external, out-of-scope binary) — it's logged and dropped.
    async fn handle_pulse_event(&self, event: PulseEvent) {
        let build_event = match event {
            PulseEvent::Build(build_event) => build_event,
            PulseEvent::JobAction(job_action_event) => {
                if job_action_event.action == JobAction::Cancel {
                    tracing::info!(job_guid = %job_action_event.job_guid, "job cancellation noted, not forwarded to workers");
                    return;
                }
                job_action_event.build
            }
        };

        let job: Job = match self.dispatcher.build_job(&build_event).await {
            Ok(job) => job,
            Err(err) => {
                tracing::warn!(%err, build_url = %build_event.build_url, "could not build job from pulse event");
                return;
            }
        };

        if let Err(err) = self.registry.dispatch_to_all(&job).await {
            tracing::warn!(%err, "pulse-triggered dispatch failed");
        }
    }
}

/// `tokio::select!` requires every arm's future to be ready even when
/// disabled; this turns "no pulse monitor configured" into a future that
/// never resolves instead of a branch `select!` can't express directly.
async fn recv_pulse(pulse_rx: &mut Option<mpsc::Receiver<PulseEvent>>) -> Option<PulseEvent> {
    match pulse_rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;

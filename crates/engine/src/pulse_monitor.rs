// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pulse Monitor: maintains the AMQP-over-TLS connection to the two
//! upstream exchanges, reconnecting with a fixed backoff, and forwards
//! normalized events into the Supervisor's channel.

use crate::normalize::Normalizer;
use farm_adapters::{AdapterError, Binding, PulseClient, PulseMessage, TaskclusterClient, TreeherderClient};
use farm_core::job::{BuildEvent, JobAction, JobActionEvent};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;

const TASKCOMPLETED_EXCHANGE: &str = "exchange/taskcluster-queue/v1/task-completed";
const TASKCOMPLETED_QUEUE_SUFFIX: &str = "task-completed";
const TIER_WORKER_PLATFORMS: [&str; 3] = ["gecko-1-b-android", "gecko-2-b-android", "gecko-3-b-android"];
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(30);

/// Pulse connection parameters (spec.md §4.1/§6).
#[derive(Debug, Clone)]
pub struct PulseConfig {
    pub amqp_url: String,
    pub userid: String,
    pub durable_queues: bool,
    pub jobaction_exchange: String,
    pub jobaction_queue_suffix: String,
    /// A job-actions binding is only made when a Treeherder base URL was
    /// configured for the Normalizer this monitor feeds.
    pub treeherder_configured: bool,
}

impl PulseConfig {
    pub fn new(amqp_url: impl Into<String>, userid: impl Into<String>, durable_queues: bool, treeherder_configured: bool) -> Self {
        Self {
            amqp_url: amqp_url.into(),
            userid: userid.into(),
            durable_queues,
            jobaction_exchange: "exchange/treeherder/v1/job-actions".to_string(),
            jobaction_queue_suffix: "jobactions".to_string(),
            treeherder_configured,
        }
    }
}

/// A normalized event drained from either exchange, ready for the
/// Supervisor to hand to the Dispatcher/Worker Registry.
#[derive(Debug, Clone)]
pub enum PulseEvent {
    Build(BuildEvent),
    JobAction(JobActionEvent),
}

/// Drives a `PulseClient` through the reconnect/backoff/drain loop, handing
/// drained payloads to a `Normalizer` and forwarding what survives onto
/// `sink`. Stopping is a one-shot flag observed between drains, never a
/// hard cancellation.
pub struct PulseMonitor<P, T, H>
where
    P: PulseClient,
    T: TaskclusterClient,
    H: TreeherderClient,
{
    client: Arc<P>,
    normalizer: Arc<Normalizer<T, H>>,
    config: PulseConfig,
    platforms: Vec<String>,
    stopping: AtomicBool,
}

impl<P, T, H> PulseMonitor<P, T, H>
where
    P: PulseClient,
    T: TaskclusterClient,
    H: TreeherderClient,
{
    pub fn new(client: Arc<P>, normalizer: Arc<Normalizer<T, H>>, config: PulseConfig, platforms: Vec<String>) -> Self {
        Self { client, normalizer, config, platforms, stopping: AtomicBool::new(false) }
    }

    /// Signal the run loop to stop after its current drain.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    fn task_queue_name(&self) -> String {
        format!("queue/{}/{}", self.config.userid, TASKCOMPLETED_QUEUE_SUFFIX)
    }

    fn jobaction_queue_name(&self) -> String {
        format!("queue/{}/{}", self.config.userid, self.config.jobaction_queue_suffix)
    }

    /// Queue bindings for one connection: one task-completion binding per
    /// configured platform plus the `gecko-{1,2,3}-b-android` tier-worker
    /// augmentation, and (if Treeherder is configured) one job-actions
    /// binding with routing key `#`.
    fn bindings(&self) -> Vec<Binding> {
        let task_queue = self.task_queue_name();
        let mut platforms = self.platforms.clone();
        platforms.extend(TIER_WORKER_PLATFORMS.iter().map(|p| p.to_string()));

        let mut bindings: Vec<Binding> = platforms
            .into_iter()
            .map(|platform| Binding {
                exchange: TASKCOMPLETED_EXCHANGE.to_string(),
                queue: task_queue.clone(),
                routing_key: format!("primary.#.#.#.#.#.{platform}.#.#.#"),
                durable: self.config.durable_queues,
            })
            .collect();

        if self.config.treeherder_configured {
            bindings.push(Binding {
                exchange: self.config.jobaction_exchange.clone(),
                queue: self.jobaction_queue_name(),
                routing_key: "#".to_string(),
                durable: self.config.durable_queues,
            });
        }

        bindings
    }

    /// Connect, declare/bind, then drain until the connection fails or
    /// stopping is observed. Any connect/bind/drain error returns to the
    /// caller so the reconnect loop can back off and retry.
    async fn connect_and_drain(&self, sink: &Sender<PulseEvent>) -> Result<(), AdapterError> {
        let session = self.client.connect(&self.config.amqp_url).await?;
        for binding in self.bindings() {
            session.bind(&binding).await?;
        }

        let task_queue = self.task_queue_name();
        let jobaction_queue = self.config.treeherder_configured.then(|| self.jobaction_queue_name());

        while !self.is_stopping() {
            let mut messages = session.drain(&task_queue, DRAIN_TIMEOUT).await?;
            if let Some(queue) = &jobaction_queue {
                messages.extend(session.drain(queue, DRAIN_TIMEOUT).await?);
            }
            for message in messages {
                self.dispatch_message(message, sink).await;
            }
        }

        Ok(())
    }

    /// Route one drained message to the job-action or task-completed path
    /// per spec.md §4.1, dropping payloads that match neither shape.
    async fn dispatch_message(&self, message: PulseMessage, sink: &Sender<PulseEvent>) {
        let payload: Value = match serde_json::from_slice(&message.payload) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(%err, routing_key = %message.routing_key, "ignoring non-JSON pulse message");
                return;
            }
        };

        let is_jobaction = self.config.treeherder_configured
            && payload.get("action").is_some()
            && payload.get("project").is_some()
            && payload.get("job_id").is_some();

        if is_jobaction {
            if let Some(event) = self.handle_jobaction(&payload).await {
                let _ = sink.send(PulseEvent::JobAction(event)).await;
            }
        } else if payload.get("status").is_some() {
            if let Some(event) = self.handle_taskcompleted(&payload).await {
                let _ = sink.send(PulseEvent::Build(event)).await;
            }
        }
    }

    async fn handle_taskcompleted(&self, payload: &Value) -> Option<BuildEvent> {
        let task_id = payload.get("status")?.get("taskId")?.as_str()?;
        let run_id = scalar_to_string(payload.get("runId")?)?;
        self.normalizer.handle_task_completed(task_id, &run_id).await
    }

    async fn handle_jobaction(&self, payload: &Value) -> Option<JobActionEvent> {
        let action: JobAction = serde_json::from_value(payload.get("action")?.clone()).ok()?;
        let project = payload.get("project")?.as_str()?;
        let job_id = scalar_to_string(payload.get("job_id")?)?;
        self.normalizer.handle_job_action(action, project, &job_id).await
    }

    /// Reconnect/backoff loop (spec.md §4.1): on any connection error, wait
    /// a fixed 30s and retry unless stopping has been signaled.
    pub async fn run(&self, sink: Sender<PulseEvent>) {
        while !self.is_stopping() {
            if let Err(err) = self.connect_and_drain(&sink).await {
                if self.is_stopping() {
                    break;
                }
                tracing::warn!(%err, "pulse connection lost, reconnecting after backoff");
                tokio::time::sleep(RECONNECT_BACKOFF).await;
            }
        }
    }
}

/// Accept either a JSON string or number for `runId`/`job_id`, matching the
/// upstream payloads which send both depending on producer.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "pulse_monitor_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle state and crash accounting.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Monotonic worker registration number, assigned in `register` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerNumber(pub u64);

/// Lifecycle state of a registered device worker.
///
/// `created -> started -> {alive <-> disconnected} -> disabled | stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Created,
    Started,
    Alive,
    Disconnected,
    Disabled,
    Stopped,
}

crate::simple_display! {
    WorkerState {
        Created => "created",
        Started => "started",
        Alive => "alive",
        Disconnected => "disconnected",
        Disabled => "disabled",
        Stopped => "stopped",
    }
}

impl WorkerState {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, WorkerState::Disabled | WorkerState::Stopped)
    }
}

/// Crash-counter window policy (Open Question in spec.md §9, externalized
/// here rather than hard-coded). Defaults chosen to match the original
/// implementation's intent of disabling a worker that dies repeatedly in a
/// short span without disabling one that dies rarely over a long uptime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrashPolicy {
    pub max_crashes: u32,
    pub window: Duration,
}

impl Default for CrashPolicy {
    fn default() -> Self {
        Self {
            max_crashes: 3,
            window: Duration::from_secs(30 * 60),
        }
    }
}

/// Monotonically counts restart-inducing deaths within a sliding policy
/// window. Old crash timestamps fall out of the window as time advances, so
/// a worker that crashes occasionally over a long uptime is never disabled,
/// but one that crashes repeatedly in a short span is.
#[derive(Debug, Clone)]
pub struct CrashCounter {
    policy: CrashPolicy,
    crashes: Vec<Instant>,
}

impl CrashCounter {
    pub fn new(policy: CrashPolicy) -> Self {
        Self {
            policy,
            crashes: Vec::new(),
        }
    }

    /// Record a crash at `now`, evicting crashes outside the window.
    pub fn add_crash(&mut self, clock: &impl Clock) {
        let now = clock.now();
        self.crashes
            .retain(|t| now.duration_since(*t) <= self.policy.window);
        self.crashes.push(now);
    }

    /// True once the number of crashes within the window has reached the
    /// policy threshold.
    pub fn too_many_crashes(&self, clock: &impl Clock) -> bool {
        let now = clock.now();
        let active = self
            .crashes
            .iter()
            .filter(|t| now.duration_since(**t) <= self.policy.window)
            .count();
        active as u32 >= self.policy.max_crashes
    }

    pub fn count(&self) -> usize {
        self.crashes.len()
    }
}

/// One line of the worker's JSON status mailbox, read off its stdout pipe
/// and tagged with `phoneid` by the reader task before being forwarded to
/// the Supervisor's shared channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatusMessage {
    pub status: String,
    #[serde(default)]
    pub current_build_unix: Option<i64>,
    #[serde(default)]
    pub crashed: bool,
}

/// Explicit command enum dispatched to a worker process, replacing the
/// original's `getattr(worker, cmd)` polymorphism (spec.md §9 REDESIGN
/// FLAGS): `enable`/`disable`/`debug`/`ping` each carry their optional
/// parameter string instead of being looked up by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verb", content = "arg")]
pub enum WorkerCommand {
    Enable,
    Disable(Option<String>),
    Debug(Option<String>),
    Ping(Option<String>),
    Reboot,
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;

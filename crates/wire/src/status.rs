// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rendering of the `status` command's multi-line snapshot.

use std::fmt::Write as _;
use std::time::Duration;

/// One worker's last (and, if different, previous) reported status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub age: Duration,
    pub short_desc: String,
}

/// Everything needed to render one worker's line group in a `status` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStatusEntry {
    pub phoneid: String,
    pub ip: String,
    pub debug_level: u8,
    /// Build timestamp currently loaded on the device, unix seconds.
    pub current_build_unix: Option<i64>,
    pub last_update: Option<StatusUpdate>,
    pub status_name: Option<String>,
    pub holding_status_for: Option<Duration>,
    pub previous_status: Option<StatusUpdate>,
}

/// Render the full `status` reply body for every worker, terminated by `ok`
/// on its own trailing line as the original protocol does.
pub fn render_status(entries: &[WorkerStatusEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(out, "phone {} ({}):", entry.phoneid, entry.ip);
        let _ = writeln!(out, "  debug level {}", entry.debug_level);

        if entry.last_update.is_none() {
            out.push_str("  no updates\n");
            continue;
        }

        match entry.current_build_unix {
            Some(ts) => {
                let _ = writeln!(out, "  current build: {}", format_unix_timestamp(ts));
            }
            None => out.push_str("  no build loaded\n"),
        }

        if let Some(update) = &entry.last_update {
            let _ = writeln!(
                out,
                "  last update {} ago:\n    {}",
                format_duration(update.age),
                update.short_desc
            );
        }

        if let (Some(name), Some(held)) = (&entry.status_name, entry.holding_status_for) {
            let _ = writeln!(out, "  {} for {}", name, format_duration(held));
        }

        if let Some(prev) = &entry.previous_status {
            let _ = writeln!(
                out,
                "  previous state {} ago:\n    {}",
                format_duration(prev.age),
                prev.short_desc
            );
        }
    }
    out.push_str("ok");
    out
}

/// Render a duration the way Python's `timedelta.__str__` does: `H:MM:SS`,
/// or `D day(s), H:MM:SS` once it spans a full day.
fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let days = total_secs / 86_400;
    let rem = total_secs % 86_400;
    let hours = rem / 3600;
    let minutes = (rem % 3600) / 60;
    let seconds = rem % 60;

    if days > 0 {
        let unit = if days == 1 { "day" } else { "days" };
        format!("{days} {unit}, {hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours}:{minutes:02}:{seconds:02}")
    }
}

fn format_unix_timestamp(ts: i64) -> String {
    ts.to_string()
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;

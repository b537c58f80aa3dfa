// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logging setup: the main daemon log via `tracing-appender`, plus a
//! dynamic per-worker log layer (spec.md §4.4 `register`: individual phone
//! worker logs use `<logfile>-<phoneid>[.<ext>]`).

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Mirrors every event carrying a `phoneid` field into its own file
/// alongside the main log, opening each lazily on first use and keeping it
/// for the life of the process.
pub struct PerPhoneLayer {
    logfile: PathBuf,
    files: Mutex<HashMap<String, std::fs::File>>,
}

impl PerPhoneLayer {
    pub fn new(logfile: &Path) -> Self {
        Self { logfile: logfile.to_path_buf(), files: Mutex::new(HashMap::new()) }
    }

    fn path_for(&self, phoneid: &str) -> PathBuf {
        let stem = self.logfile.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "autophone".to_string());
        let ext = self.logfile.extension().map(|e| e.to_string_lossy().into_owned());
        let file_name = match ext {
            Some(ext) => format!("{stem}-{phoneid}.{ext}"),
            None => format!("{stem}-{phoneid}"),
        };
        self.logfile.with_file_name(file_name)
    }
}

#[derive(Default)]
struct PhoneIdVisitor {
    phoneid: Option<String>,
    rendered: String,
}

impl Visit for PhoneIdVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "phoneid" {
            self.phoneid = Some(format!("{value:?}").trim_matches('"').to_string());
        }
        use std::fmt::Write as _;
        let _ = write!(self.rendered, "{}={:?} ", field.name(), value);
    }
}

impl<S: Subscriber> Layer<S> for PerPhoneLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = PhoneIdVisitor::default();
        event.record(&mut visitor);
        let Some(phoneid) = visitor.phoneid else { return };

        let mut files = match self.files.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !files.contains_key(&phoneid) {
            let path = self.path_for(&phoneid);
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => {
                    files.insert(phoneid.clone(), file);
                }
                Err(err) => {
                    tracing::warn!(%phoneid, %err, "could not open per-worker log file");
                    return;
                }
            }
        }
        if let Some(file) = files.get_mut(&phoneid) {
            let _ = writeln!(file, "{} {}", event.metadata().level(), visitor.rendered);
        }
    }
}

/// Set up the global subscriber: a non-blocking file appender for
/// `logfile` filtered by `level`, plus the per-worker layer above. Returns
/// the appender's `WorkerGuard`, which must be kept alive for the process's
/// lifetime or buffered lines are dropped on exit.
pub fn init(logfile: &Path, level: tracing::Level) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = logfile.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let dir = logfile.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let file_name = logfile.file_name().unwrap_or_else(|| std::ffi::OsStr::new("autophone.log"));
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .with(PerPhoneLayer::new(logfile))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;

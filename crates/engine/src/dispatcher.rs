// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher: resolves a canonical `BuildEvent` into a cached, verified
//! build and the `Job` descriptor fanned out to every worker.

use crate::error::EngineError;
use farm_adapters::build_cache::{check_zip_integrity, read_app_ini, BuildCache};
use farm_core::job::{BuildEvent, Job};
use farm_core::platform::androidprocname_for_repo;
use std::sync::Arc;

/// Resolves build events into `Job`s, retrying a corrupt download exactly
/// once by forcing a fresh fetch (spec.md §4.3).
pub struct Dispatcher<B: BuildCache> {
    build_cache: Arc<B>,
}

impl<B: BuildCache> Dispatcher<B> {
    pub fn new(build_cache: Arc<B>) -> Self {
        Self { build_cache }
    }

    /// Build the `Job` descriptor for a build's `target.apk`: fetch/cache it,
    /// verify its zip integrity (re-downloading once on corruption), then
    /// read `application.ini` to resolve the install process name, version,
    /// and build timestamp.
    pub async fn build_job(&self, event: &BuildEvent) -> Result<Job, EngineError> {
        let mut dir = self.build_cache.get_local_dir(&event.build_url, false).await?;

        if check_zip_integrity(&dir).is_err() {
            tracing::warn!(build_url = %event.build_url, "corrupt build archive, forcing re-download");
            dir = self.build_cache.get_local_dir(&event.build_url, true).await?;
            check_zip_integrity(&dir)?;
        }

        let app_ini = read_app_ini(&dir)?;
        let blddate = parse_build_id(&app_ini.build_id)?;
        let androidprocname = androidprocname_for_repo(&app_ini.source_repository);

        Ok(Job {
            cache_build_dir: dir,
            blddate,
            revision: event.revision.clone(),
            androidprocname,
            version: app_ini.version,
            bldtype: event.build_type.clone(),
        })
    }

    /// Build a `Job` straight from an operator-supplied build URL
    /// (`triggerjobs <url>`, spec.md §4.5), bypassing the Event Normalizer
    /// entirely. Revision and build type come from `application.ini` itself,
    /// matching the operator command's standalone fetch/verify/read flow.
    pub async fn trigger_from_url(&self, build_url: &str) -> Result<Job, EngineError> {
        let mut dir = self.build_cache.get_local_dir(build_url, false).await?;

        if check_zip_integrity(&dir).is_err() {
            tracing::warn!(%build_url, "corrupt build archive, forcing re-download");
            dir = self.build_cache.get_local_dir(build_url, true).await?;
            check_zip_integrity(&dir)?;
        }

        let app_ini = read_app_ini(&dir)?;
        let blddate = parse_build_id(&app_ini.build_id)?;
        let androidprocname = androidprocname_for_repo(&app_ini.source_repository);

        Ok(Job {
            cache_build_dir: dir,
            blddate,
            revision: app_ini.source_stamp,
            androidprocname,
            version: app_ini.version,
            bldtype: String::new(),
        })
    }
}

/// Parse `application.ini`'s `BuildID` (`YYYYMMDDHHMMSS`) into unix seconds,
/// interpreting it in the local timezone to match `mktime`'s behavior on the
/// same timestamp.
fn parse_build_id(build_id: &str) -> Result<i64, EngineError> {
    let invalid = || farm_core::CoreError::InvalidBuildId(build_id.to_string()).into();
    let naive = chrono::NaiveDateTime::parse_from_str(build_id, "%Y%m%d%H%M%S").map_err(|_| invalid())?;
    naive.and_local_timezone(chrono::Local).single().map(|dt| dt.timestamp()).ok_or_else(invalid)
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Treeherder job lookups and changeset comment enrichment.

use crate::error::AdapterError;
use async_trait::async_trait;
use serde::Deserialize;

/// Fields the job-action path (spec.md §4.2) needs out of a Treeherder job
/// record, beyond the `platform_option` gate.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeherderJob {
    pub platform_option: String,
    pub job_guid: String,
    /// Fallback platform used by `detect_platform` when no configured
    /// platform appears as a substring of the build URL.
    pub platform: String,
    pub machine_name: String,
    pub job_group_name: String,
    pub job_group_symbol: String,
    pub job_type_name: String,
    pub job_type_symbol: String,
    pub result: String,
}

/// The four fields the job-action path requires out of the private build
/// detail list (spec.md §4.2); any missing field drops the event.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildDetail {
    pub build_url: String,
    pub config_file: String,
    pub chunk: u32,
    pub builder_type: String,
}

#[async_trait]
pub trait TreeherderClient: Send + Sync + 'static {
    async fn get_job(&self, project: &str, job_id: &str) -> Result<TreeherderJob, AdapterError>;
    async fn get_build_details(&self, project: &str, job_id: &str) -> Result<BuildDetail, AdapterError>;

    /// Fetch the changeset comment for `changeset_url`, substituting
    /// `/rev/` -> `/json-rev/` per spec.md §4.2. Returns `"unknown"` rather
    /// than an error on any fetch failure, matching the original's
    /// best-effort enrichment.
    async fn get_comments(&self, changeset_url: &str) -> String;
}

pub struct ReqwestTreeherderClient {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTreeherderClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonRevResponse {
    desc: String,
}

#[async_trait]
impl TreeherderClient for ReqwestTreeherderClient {
    async fn get_job(&self, project: &str, job_id: &str) -> Result<TreeherderJob, AdapterError> {
        let url = format!("{}/api/project/{project}/jobs/{job_id}/", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|source| AdapterError::Http {
            url: url.clone(),
            source,
        })?;
        if !response.status().is_success() {
            return Err(AdapterError::HttpStatus {
                url,
                status: response.status().as_u16(),
            });
        }
        response.json().await.map_err(|source| AdapterError::Http { url, source })
    }

    async fn get_build_details(&self, project: &str, job_id: &str) -> Result<BuildDetail, AdapterError> {
        let url = format!("{}/api/project/{project}/jobs/{job_id}/artifacts/", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|source| AdapterError::Http {
            url: url.clone(),
            source,
        })?;
        if !response.status().is_success() {
            return Err(AdapterError::HttpStatus {
                url,
                status: response.status().as_u16(),
            });
        }
        response.json().await.map_err(|source| AdapterError::Http { url, source })
    }

    async fn get_comments(&self, changeset_url: &str) -> String {
        let json_rev_url = changeset_url.replacen("/rev/", "/json-rev/", 1);
        let fetch = async {
            let response = self.client.get(&json_rev_url).send().await.ok()?;
            if !response.status().is_success() {
                return None;
            }
            response.json::<JsonRevResponse>().await.ok()
        };
        fetch.await.map(|r| r.desc).unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{BuildDetail, AdapterError, TreeherderClient, TreeherderJob};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeState {
        jobs: HashMap<String, TreeherderJob>,
        details: HashMap<String, BuildDetail>,
        comments: HashMap<String, String>,
    }

    #[derive(Clone, Default)]
    pub struct FakeTreeherderClient {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeTreeherderClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_job(&self, job_id: &str, job: TreeherderJob) {
            self.inner.lock().jobs.insert(job_id.to_string(), job);
        }

        pub fn add_build_detail(&self, job_id: &str, detail: BuildDetail) {
            self.inner.lock().details.insert(job_id.to_string(), detail);
        }

        pub fn add_comment(&self, changeset_url: &str, comment: &str) {
            self.inner.lock().comments.insert(changeset_url.to_string(), comment.to_string());
        }
    }

    #[async_trait]
    impl TreeherderClient for FakeTreeherderClient {
        async fn get_job(&self, _project: &str, job_id: &str) -> Result<TreeherderJob, AdapterError> {
            self.inner
                .lock()
                .jobs
                .get(job_id)
                .cloned()
                .ok_or_else(|| AdapterError::HttpStatus {
                    url: format!("fake://jobs/{job_id}"),
                    status: 404,
                })
        }

        async fn get_build_details(&self, _project: &str, job_id: &str) -> Result<BuildDetail, AdapterError> {
            self.inner
                .lock()
                .details
                .get(job_id)
                .cloned()
                .ok_or_else(|| AdapterError::HttpStatus {
                    url: format!("fake://jobs/{job_id}/artifacts"),
                    status: 404,
                })
        }

        async fn get_comments(&self, changeset_url: &str) -> String {
            self.inner
                .lock()
                .comments
                .get(changeset_url)
                .cloned()
                .unwrap_or_else(|| "unknown".to_string())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTreeherderClient;

#[cfg(test)]
#[path = "treeherder_tests.rs"]
mod tests;

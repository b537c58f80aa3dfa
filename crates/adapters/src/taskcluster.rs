// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Taskcluster queue API: task definitions and artifact listings.

use crate::error::AdapterError;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TaskDefinition {
    #[serde(rename = "workerType")]
    pub worker_type: String,
    pub payload: TaskPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskPayload {
    pub env: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    pub name: String,
}

/// Build metadata fetched for an artifact's build URL (the original's
/// `utils.get_build_data`): enough to gate and populate a `BuildEvent`
/// before `application.ini` is ever read out of the apk itself.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildMetadata {
    pub repo: String,
    pub revision: String,
    pub platform: String,
    pub build_type: String,
    /// `build_data['id']`, used as `BuildEvent::build_id_timestamp`.
    pub id: String,
    /// Changeset URL; `/rev/` is substituted with `/json-rev/` to fetch
    /// the push comment (spec.md §4.2).
    pub changeset: String,
}

#[async_trait]
pub trait TaskclusterClient: Send + Sync + 'static {
    async fn get_task(&self, task_id: &str) -> Result<TaskDefinition, AdapterError>;
    async fn list_artifacts(&self, task_id: &str, run_id: &str) -> Result<Vec<Artifact>, AdapterError>;
    fn artifact_url(&self, task_id: &str, run_id: &str, artifact_name: &str) -> String;

    /// Fetch build metadata for `build_url` (an artifact URL), gating and
    /// populating a `BuildEvent` before `application.ini` is read.
    async fn get_build_metadata(&self, build_url: &str) -> Result<BuildMetadata, AdapterError>;

    /// Treeherder tier for a task/run (the original's `get_treeherder_tier`
    /// helper, kept on this client since it shares the queue's base URL and
    /// HTTP plumbing).
    async fn tier(&self, repo: &str, task_id: &str, run_id: &str) -> Result<Option<u32>, AdapterError>;
}

pub struct ReqwestTaskclusterClient {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTaskclusterClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArtifactListResponse {
    artifacts: Vec<Artifact>,
}

#[async_trait]
impl TaskclusterClient for ReqwestTaskclusterClient {
    async fn get_task(&self, task_id: &str) -> Result<TaskDefinition, AdapterError> {
        let url = format!("{}/task/{task_id}", self.base_url);
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

    async fn list_artifacts(&self, task_id: &str, run_id: &str) -> Result<Vec<Artifact>, AdapterError> {
        let url = format!("{}/task/{task_id}/runs/{run_id}/artifacts", self.base_url);
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
        let parsed: ArtifactListResponse = response.json().await.map_err(|source| AdapterError::Http { url, source })?;
        Ok(parsed.artifacts)
    }

    fn artifact_url(&self, task_id: &str, run_id: &str, artifact_name: &str) -> String {
        format!("{}/task/{task_id}/runs/{run_id}/artifacts/{artifact_name}", self.base_url)
    }

    async fn get_build_metadata(&self, build_url: &str) -> Result<BuildMetadata, AdapterError> {
        let response = self
            .client
            .get(build_url)
            .query(&[("format", "json")])
            .send()
            .await
            .map_err(|source| AdapterError::Http {
                url: build_url.to_string(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(AdapterError::HttpStatus {
                url: build_url.to_string(),
                status: response.status().as_u16(),
            });
        }
        response
            .json()
            .await
            .map_err(|source| AdapterError::Http { url: build_url.to_string(), source })
    }

    async fn tier(&self, repo: &str, task_id: &str, run_id: &str) -> Result<Option<u32>, AdapterError> {
        let url = format!("{}/tier?repo={repo}&task_id={task_id}&run_id={run_id}", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|source| AdapterError::Http {
            url: url.clone(),
            source,
        })?;
        if !response.status().is_success() {
            return Ok(None);
        }
        #[derive(Deserialize)]
        struct TierResponse {
            tier: Option<u32>,
        }
        let parsed: TierResponse = response.json().await.map_err(|source| AdapterError::Http { url, source })?;
        Ok(parsed.tier)
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{Artifact, AdapterError, BuildMetadata, TaskDefinition, TaskclusterClient};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeState {
        tasks: HashMap<String, TaskDefinition>,
        artifacts: HashMap<String, Vec<Artifact>>,
        build_metadata: HashMap<String, BuildMetadata>,
        tiers: HashMap<String, u32>,
    }

    #[derive(Clone, Default)]
    pub struct FakeTaskclusterClient {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeTaskclusterClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_task(&self, task_id: &str, task: TaskDefinition) {
            self.inner.lock().tasks.insert(task_id.to_string(), task);
        }

        pub fn add_artifacts(&self, task_id: &str, run_id: &str, artifacts: Vec<Artifact>) {
            self.inner
                .lock()
                .artifacts
                .insert(format!("{task_id}:{run_id}"), artifacts);
        }

        pub fn add_build_metadata(&self, build_url: &str, metadata: BuildMetadata) {
            self.inner.lock().build_metadata.insert(build_url.to_string(), metadata);
        }

        pub fn set_tier(&self, task_id: &str, run_id: &str, tier: u32) {
            self.inner.lock().tiers.insert(format!("{task_id}:{run_id}"), tier);
        }
    }

    #[async_trait]
    impl TaskclusterClient for FakeTaskclusterClient {
        async fn get_task(&self, task_id: &str) -> Result<TaskDefinition, AdapterError> {
            self.inner
                .lock()
                .tasks
                .get(task_id)
                .cloned()
                .ok_or_else(|| AdapterError::HttpStatus {
                    url: format!("fake://task/{task_id}"),
                    status: 404,
                })
        }

        async fn list_artifacts(&self, task_id: &str, run_id: &str) -> Result<Vec<Artifact>, AdapterError> {
            Ok(self
                .inner
                .lock()
                .artifacts
                .get(&format!("{task_id}:{run_id}"))
                .cloned()
                .unwrap_or_default())
        }

        fn artifact_url(&self, task_id: &str, run_id: &str, artifact_name: &str) -> String {
            format!("fake://task/{task_id}/runs/{run_id}/artifacts/{artifact_name}")
        }

        async fn get_build_metadata(&self, build_url: &str) -> Result<BuildMetadata, AdapterError> {
            self.inner
                .lock()
                .build_metadata
                .get(build_url)
                .cloned()
                .ok_or_else(|| AdapterError::HttpStatus {
                    url: build_url.to_string(),
                    status: 404,
                })
        }

        async fn tier(&self, _repo: &str, task_id: &str, run_id: &str) -> Result<Option<u32>, AdapterError> {
            Ok(self.inner.lock().tiers.get(&format!("{task_id}:{run_id}")).copied())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTaskclusterClient;

#[cfg(test)]
#[path = "taskcluster_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event Normalizer: turns raw upstream payloads into canonical
//! `BuildEvent` / `JobActionEvent`, or drops them.

use farm_adapters::{TaskclusterClient, TreeherderClient};
use farm_core::job::{BuildEvent, BuilderType, JobAction, JobActionEvent};
use farm_core::platform::{detect_platform, sort_platforms_longest_first};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which trees/platforms/buildtypes this monitor is configured to act on.
/// Platforms are sorted longest-first at construction so substring matching
/// never lets a shorter platform shadow a longer one.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub trees: Vec<String>,
    pub platforms: Vec<String>,
    pub buildtypes: Vec<String>,
}

impl NormalizerConfig {
    pub fn new(trees: Vec<String>, mut platforms: Vec<String>, buildtypes: Vec<String>) -> Self {
        sort_platforms_longest_first(&mut platforms);
        Self { trees, platforms, buildtypes }
    }
}

/// Normalizes raw upstream task-completed and job-action payloads into the
/// canonical events the Dispatcher consumes.
pub struct Normalizer<T, H>
where
    T: TaskclusterClient,
    H: TreeherderClient,
{
    config: NormalizerConfig,
    taskcluster: Arc<T>,
    treeherder: Arc<H>,
}

/// Draft build data collected while scanning artifacts, before the
/// try-branch opt-in check and comment enrichment are applied.
struct BuildDraft {
    repo: String,
    revision: String,
    platform: String,
    build_type: String,
    build_id_timestamp: String,
    changeset: String,
}

impl<T, H> Normalizer<T, H>
where
    T: TaskclusterClient,
    H: TreeherderClient,
{
    pub fn new(config: NormalizerConfig, taskcluster: Arc<T>, treeherder: Arc<H>) -> Self {
        Self { config, taskcluster, treeherder }
    }

    /// Task-completed path (spec.md §4.2): fetch the task definition,
    /// enumerate its artifacts, and gate `target.apk`'s build metadata
    /// through tree/platform/buildtype/tier before emitting.
    pub async fn handle_task_completed(&self, task_id: &str, run_id: &str) -> Option<BuildEvent> {
        let task = match self.taskcluster.get_task(task_id).await {
            Ok(task) => task,
            Err(err) => {
                tracing::debug!(%task_id, %run_id, %err, "could not fetch task definition");
                return None;
            }
        };

        if let Some(mh_branch) = task.payload.env.get("MH_BRANCH") {
            if !self.config.trees.contains(mh_branch) {
                tracing::debug!(%task_id, %run_id, %mh_branch, "skip task_definition MH_BRANCH");
                return None;
            }
        }

        let builder_type = BuilderType::from_worker_type(&task.worker_type);

        let artifacts = match self.taskcluster.list_artifacts(task_id, run_id).await {
            Ok(artifacts) => artifacts,
            Err(err) => {
                tracing::debug!(%task_id, %run_id, %err, "could not list artifacts");
                return None;
            }
        };

        let mut app_data: BTreeMap<String, String> = BTreeMap::new();
        let mut draft: Option<BuildDraft> = None;

        for artifact in &artifacts {
            let key = artifact.name.strip_prefix("public/build/").unwrap_or(&artifact.name);
            let build_url = self.taskcluster.artifact_url(task_id, run_id, &artifact.name);

            match key {
                "target.apk" => {
                    app_data.insert("org.mozilla.fennec".to_string(), build_url.clone());

                    let metadata = match self.taskcluster.get_build_metadata(&build_url).await {
                        Ok(metadata) => metadata,
                        Err(err) => {
                            tracing::warn!(%task_id, %run_id, %build_url, %err, "could not get build data");
                            return None;
                        }
                    };

                    if builder_type != BuilderType::Buildbot {
                        let tier = self.taskcluster.tier(&metadata.repo, task_id, run_id).await.ok().flatten();
                        if tier != Some(1) {
                            tracing::debug!(%task_id, %run_id, ?tier, "ignoring non-tier-1 build");
                            return None;
                        }
                    }

                    if !self.config.trees.contains(&metadata.repo) {
                        tracing::debug!(repo = %metadata.repo, "skip repo not in trees");
                        return None;
                    }
                    if !self.config.platforms.contains(&metadata.platform) {
                        tracing::debug!(platform = %metadata.platform, "skip platform not configured");
                        return None;
                    }
                    if !self.config.buildtypes.contains(&metadata.build_type) {
                        tracing::debug!(build_type = %metadata.build_type, "skip build_type not configured");
                        return None;
                    }
                    if metadata.id.is_empty() || metadata.build_type.is_empty() {
                        tracing::warn!("skip build due to missing id or build_type");
                        return None;
                    }

                    draft = Some(BuildDraft {
                        repo: metadata.repo,
                        revision: metadata.revision,
                        platform: metadata.platform,
                        build_type: metadata.build_type,
                        build_id_timestamp: metadata.id,
                        changeset: metadata.changeset,
                    });
                }
                "geckoview_example.apk" => {
                    app_data.insert("org.mozilla.geckoview_example".to_string(), build_url);
                }
                _ => {}
            }
        }

        let draft = draft?;

        let comments = self.treeherder.get_comments(&draft.changeset).await;

        if draft.repo == "try" && !comments.contains("autophone") {
            tracing::debug!(repo = %draft.repo, %comments, "skip try push without autophone opt-in");
            return None;
        }

        Some(BuildEvent {
            repo: draft.repo,
            revision: draft.revision,
            build_url: app_data.get("org.mozilla.fennec").cloned().unwrap_or_default(),
            platform: draft.platform,
            build_type: draft.build_type,
            build_id_timestamp: draft.build_id_timestamp,
            app_data,
            comments,
            builder_type,
        })
    }

    /// Job-action path (spec.md §4.2): resolve a Treeherder cancel/retrigger
    /// into a canonical `JobActionEvent`.
    pub async fn handle_job_action(&self, action: JobAction, project: &str, job_id: &str) -> Option<JobActionEvent> {
        if !self.config.trees.contains(&project.to_string()) {
            tracing::debug!(%project, ?action, "ignoring job action on untracked tree");
            return None;
        }

        let job = match self.treeherder.get_job(project, job_id).await {
            Ok(job) => job,
            Err(err) => {
                tracing::debug!(%project, %job_id, %err, "ignoring unknown job id");
                return None;
            }
        };

        if !self.config.buildtypes.contains(&job.platform_option) {
            tracing::debug!(%project, build_type = %job.platform_option, "ignoring untracked build type");
            return None;
        }

        let detail = match self.treeherder.get_build_details(project, job_id).await {
            Ok(detail) => detail,
            Err(err) => {
                tracing::debug!(%project, %job_id, %err, "ignoring missing build info");
                return None;
            }
        };

        let builder_type = BuilderType::from_worker_type(&detail.builder_type);

        let metadata = match self.taskcluster.get_build_metadata(&detail.build_url).await {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::debug!(%project, build_url = %detail.build_url, %err, "ignoring missing build_data");
                return None;
            }
        };

        let detected_platform = detect_platform(&self.config.platforms, &detail.build_url, &job.platform).to_string();

        let build = BuildEvent {
            repo: metadata.repo,
            revision: metadata.revision,
            build_url: detail.build_url.clone(),
            platform: metadata.platform,
            build_type: metadata.build_type,
            build_id_timestamp: metadata.id,
            app_data: BTreeMap::new(),
            comments: String::new(),
            builder_type,
        };

        Some(JobActionEvent {
            action,
            project: project.to_string(),
            job_id: job_id.to_string(),
            job_guid: job.job_guid,
            platform: detected_platform,
            build_type: job.platform_option,
            build_url: detail.build_url,
            machine_name: job.machine_name,
            job_group_name: job.job_group_name,
            job_group_symbol: job.job_group_symbol,
            job_type_name: job.job_type_name,
            job_type_symbol: job.job_type_symbol,
            result: job.result,
            config_file: detail.config_file,
            chunk: detail.chunk,
            builder_type,
            build,
        })
    }
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;

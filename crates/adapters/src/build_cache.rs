// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fetches and caches build artifacts, and reads `application.ini` out of
//! the cached `build.apk`.

use crate::error::AdapterError;
use crate::ini::{get, parse_ini};
use async_trait::async_trait;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Everything `Dispatcher::build_job` (spec.md §4.3) needs out of a cached
/// build's `application.ini`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIni {
    pub source_stamp: String,
    pub version: String,
    pub source_repository: String,
    pub build_id: String,
}

/// Resolves a build URL to a local cache directory containing `build.apk`,
/// downloading it on first use.
#[async_trait]
pub trait BuildCache: Send + Sync + 'static {
    /// Local directory containing `build.apk` for `build_url`. When `force`
    /// is true, re-download even if a cached copy exists (used after a
    /// corrupt-archive detection).
    async fn get_local_dir(&self, build_url: &str, force: bool) -> Result<PathBuf, AdapterError>;
}

/// Downloads builds over HTTP into a directory tree keyed by URL, matching
/// the directory-per-build-url cache the original implementation keeps on
/// disk.
pub struct HttpBuildCache {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl HttpBuildCache {
    pub fn new(cache_dir: PathBuf) -> Result<Self, AdapterError> {
        std::fs::create_dir_all(&cache_dir).map_err(|source| AdapterError::Io {
            path: cache_dir.clone(),
            source,
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            cache_dir,
        })
    }

    /// Re-derive the override build dir, failing fast if `build.apk` is
    /// absent (spec.md §6: `--override-build-dir` is fatal at startup when
    /// required artifacts are missing).
    pub fn from_override_dir(dir: PathBuf) -> Result<Self, AdapterError> {
        let apk = dir.join("build.apk");
        if !apk.exists() {
            return Err(AdapterError::Io {
                path: apk,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "build.apk missing from override directory"),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            cache_dir: dir,
        })
    }

    fn dir_for(&self, build_url: &str) -> PathBuf {
        let key = build_url.replace(['/', ':'], "_");
        self.cache_dir.join(key)
    }
}

#[async_trait]
impl BuildCache for HttpBuildCache {
    async fn get_local_dir(&self, build_url: &str, force: bool) -> Result<PathBuf, AdapterError> {
        let dir = self.dir_for(build_url);
        let apk_path = dir.join("build.apk");

        if force || !apk_path.exists() {
            std::fs::create_dir_all(&dir).map_err(|source| AdapterError::Io {
                path: dir.clone(),
                source,
            })?;
            let response = self
                .client
                .get(build_url)
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
            let bytes = response.bytes().await.map_err(|source| AdapterError::Http {
                url: build_url.to_string(),
                source,
            })?;
            std::fs::write(&apk_path, &bytes).map_err(|source| AdapterError::Io {
                path: apk_path.clone(),
                source,
            })?;
        }

        Ok(dir)
    }
}

/// Open `build.apk` in `dir` and verify every entry's CRC, matching the
/// original's `zipfile.testzip()` integrity check.
pub fn check_zip_integrity(dir: &Path) -> Result<(), AdapterError> {
    let apk_path = dir.join("build.apk");
    let file = std::fs::File::open(&apk_path).map_err(|source| AdapterError::Io {
        path: apk_path.clone(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|err| AdapterError::CorruptArchive {
        path: apk_path.clone(),
        reason: err.to_string(),
    })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|err| AdapterError::CorruptArchive {
            path: apk_path.clone(),
            reason: err.to_string(),
        })?;
        let mut sink = Vec::new();
        entry.read_to_end(&mut sink).map_err(|source| AdapterError::Io {
            path: apk_path.clone(),
            source,
        })?;
    }

    Ok(())
}

/// Extract and parse `application.ini`'s `[App]` section out of `build.apk`.
pub fn read_app_ini(dir: &Path) -> Result<AppIni, AdapterError> {
    let apk_path = dir.join("build.apk");
    let file = std::fs::File::open(&apk_path).map_err(|source| AdapterError::Io {
        path: apk_path.clone(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|err| AdapterError::CorruptArchive {
        path: apk_path.clone(),
        reason: err.to_string(),
    })?;

    let mut contents = String::new();
    archive
        .by_name("application.ini")
        .map_err(|err| AdapterError::CorruptArchive {
            path: apk_path.clone(),
            reason: err.to_string(),
        })?
        .read_to_string(&mut contents)
        .map_err(|source| AdapterError::Io {
            path: apk_path.clone(),
            source,
        })?;

    let doc = parse_ini(&contents);
    let require = |key: &str| -> Result<String, AdapterError> {
        get(&doc, "App", key)
            .map(str::to_string)
            .ok_or_else(|| AdapterError::MissingIniKey {
                section: "App".to_string(),
                key: key.to_string(),
            })
    };

    Ok(AppIni {
        source_stamp: require("SourceStamp")?,
        version: require("Version")?,
        source_repository: require("SourceRepository")?,
        build_id: require("BuildID")?,
    })
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{AdapterError, BuildCache};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeState {
        calls: Vec<(String, bool)>,
        dir_for_url: std::collections::HashMap<String, PathBuf>,
        fail_with: Option<String>,
    }

    /// Fake build cache: returns pre-registered directories, or records a
    /// miss so tests can assert on `force` re-download behavior.
    #[derive(Clone, Default)]
    pub struct FakeBuildCache {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeBuildCache {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn register(&self, build_url: &str, dir: PathBuf) {
            self.inner.lock().dir_for_url.insert(build_url.to_string(), dir);
        }

        pub fn fail_with(&self, message: &str) {
            self.inner.lock().fail_with = Some(message.to_string());
        }

        pub fn calls(&self) -> Vec<(String, bool)> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl BuildCache for FakeBuildCache {
        async fn get_local_dir(&self, build_url: &str, force: bool) -> Result<PathBuf, AdapterError> {
            let mut state = self.inner.lock();
            state.calls.push((build_url.to_string(), force));
            if let Some(message) = state.fail_with.clone() {
                return Err(AdapterError::Process(message));
            }
            state
                .dir_for_url
                .get(build_url)
                .cloned()
                .ok_or_else(|| AdapterError::HttpStatus {
                    url: build_url.to_string(),
                    status: 404,
                })
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBuildCache;

#[cfg(test)]
#[path = "build_cache_tests.rs"]
mod tests;

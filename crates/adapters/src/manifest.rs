// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test manifest loader, re-architected as a static registry lookup.
//!
//! The original discovers and instantiates test classes dynamically from a
//! manifest file. Here the manifest only supplies `name = config_path`
//! pairs; `name` must match one of the statically compiled test
//! implementations the registry knows about.

use crate::error::AdapterError;

/// One manifest entry: a statically known test name paired with the config
/// file that parameterizes it for a given run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    pub config_path: std::path::PathBuf,
}

/// Names of every test implementation compiled into this binary. A manifest
/// entry naming anything else is rejected at load time.
pub const KNOWN_TEST_NAMES: &[&str] = &["smoketest", "unittest", "webapprt"];

/// Parse a manifest file of `name = config_path` lines (blank lines and
/// `#`-prefixed comments ignored), rejecting any name not in
/// [`KNOWN_TEST_NAMES`].
pub fn load_manifest(path: &std::path::Path) -> Result<Vec<ManifestEntry>, AdapterError> {
    let contents = std::fs::read_to_string(path).map_err(|source| AdapterError::Manifest {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_manifest(&contents))
}

fn parse_manifest(contents: &str) -> Vec<ManifestEntry> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (name, config_path) = line.split_once('=')?;
            let name = name.trim().to_string();
            if !KNOWN_TEST_NAMES.contains(&name.as_str()) {
                tracing::warn!(%name, "skipping manifest entry for unknown test");
                return None;
            }
            Some(ManifestEntry {
                name,
                config_path: config_path.trim().into(),
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Load and atomically persist the `{"phones": [...]}` roster file.

use crate::error::StorageError;
use farm_core::PhoneConfig;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// The full on-disk roster: every `PhoneConfig` that must be re-registered
/// on startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub phones: Vec<PhoneConfig>,
}

/// Load the roster at `path`. A missing file or a file that fails to parse
/// as JSON is treated as an empty roster, matching the original cache
/// loader; any other I/O failure is propagated.
pub fn load_roster(path: &Path) -> Result<Roster, StorageError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Roster::default()),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    match serde_json::from_str(&contents) {
        Ok(roster) => Ok(roster),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "roster file is not valid JSON, starting empty");
            Ok(Roster::default())
        }
    }
}

/// Overwrite `path` with the full contents of `roster`, atomically: write to
/// a sibling `.tmp` file, then rename over the target so a reader never
/// observes a partially-written roster.
pub fn save_roster(path: &Path, roster: &Roster) -> Result<(), StorageError> {
    let json = serde_json::to_string(roster).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, json).map_err(|source| StorageError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
#[path = "roster_tests.rs"]
mod tests;

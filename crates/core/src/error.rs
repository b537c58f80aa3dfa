// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core-level error type.

use thiserror::Error;

/// Errors raised while building or validating domain values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid build id {0:?}: expected YYYYMMDDHHMMSS")]
    InvalidBuildId(String),

    #[error("invalid phone config: {0}")]
    InvalidPhoneConfig(String),
}

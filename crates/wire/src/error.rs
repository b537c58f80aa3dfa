// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol-level error type.

use thiserror::Error;

/// Errors raised while parsing a command line.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("register: missing field {0:?}")]
    MissingRegisterField(&'static str),

    #[error("register: invalid cmdport {0:?}")]
    InvalidCmdPort(String),
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Adapter(#[from] farm_adapters::AdapterError),

    #[error(transparent)]
    Storage(#[from] farm_storage::StorageError),

    #[error(transparent)]
    Protocol(#[from] farm_wire::ProtocolError),

    #[error(transparent)]
    Core(#[from] farm_core::CoreError),

    #[error("no worker registered for phoneid or serial {0:?}")]
    WorkerNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// SPDX-License-Identifier: MIT

use sk_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("a runtime named {0:?} already exists")]
    NameTaken(String),

    #[error("no runtime named {0:?}")]
    NotFound(String),

    #[error("runtime {0:?} is already running")]
    AlreadyRunning(String),

    #[error("runtime {0:?} is not running")]
    NotRunning(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("persistence error for {name:?}: {source}")]
    Persistence { name: String, #[source] source: std::io::Error },

    #[error("persisted config is malformed: {0}")]
    CorruptConfig(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

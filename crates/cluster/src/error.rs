// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("a daemon named {0:?} is already published with a fresh heartbeat")]
    NameClaimed(String),

    #[error("cluster directory error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("malformed peer snapshot: {0}")]
    CorruptSnapshot(#[from] serde_json::Error),
}

impl From<std::io::Error> for ClusterError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;

// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("io_uring setup failed: {0}")]
    Setup(#[source] std::io::Error),

    #[error("submission queue is full and the retry-once flush also failed")]
    SubmissionDropped,

    #[error("fixed descriptor table exhausted (8192 slots in use)")]
    FixedTableFull,

    #[error("no provided-buffer group registered with id {0}")]
    UnknownBufferGroup(u16),

    #[error("signal handling setup failed: {0}")]
    Signal(#[source] std::io::Error),

    #[error("completion referenced a stale or unknown request record")]
    StaleCompletion,
}

pub type Result<T> = std::result::Result<T, ReactorError>;

use std::fmt;
use std::io;

use thiserror::Error;

use crate::common::io_error_msg;

/// Pipeline phase an I/O failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Workspace,
    Split,
    Merge,
    Bucket,
    Write,
    Teardown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Workspace => "workspace",
            Phase::Split => "split",
            Phase::Merge => "merge",
            Phase::Bucket => "bucket",
            Phase::Write => "write",
            Phase::Teardown => "teardown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum CountSortError {
    #[error("{phase}: {}", io_error_msg(.source))]
    Io {
        phase: Phase,
        #[source]
        source: io::Error,
    },

    #[error("invalid chunk size {0}: must be at least 2")]
    InvalidChunkCapacity(usize),
}

impl CountSortError {
    /// Phase of an I/O failure; `None` for configuration errors.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            CountSortError::Io { phase, .. } => Some(*phase),
            CountSortError::InvalidChunkCapacity(_) => None,
        }
    }

    /// True when the underlying failure is a closed pipe on the output side.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, CountSortError::Io { source, .. } if source.kind() == io::ErrorKind::BrokenPipe)
    }
}

pub type Result<T> = std::result::Result<T, CountSortError>;

/// Attach a pipeline phase to a raw I/O result.
pub trait IoPhase<T> {
    fn phase(self, phase: Phase) -> Result<T>;
}

impl<T> IoPhase<T> for io::Result<T> {
    #[inline]
    fn phase(self, phase: Phase) -> Result<T> {
        self.map_err(|source| CountSortError::Io { phase, source })
    }
}

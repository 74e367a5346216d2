//! Error types for WAL operations.

use crate::id::SegmentId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for WAL operations.
pub type WalResult<T> = Result<T, WalError>;

/// Errors raised while opening the WAL or appending to it.
#[derive(Debug, Error)]
pub enum WalError {
    /// The maximum segment size must allow at least one record.
    #[error("invalid max segment size: {0}")]
    InvalidSegmentSize(usize),

    /// The WAL directory could not be created.
    #[error("failed to ensure WAL directory {path}: {source}")]
    CreateDir {
        /// The WAL root.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The WAL directory could not be listed.
    #[error("failed to list WAL segments in {path}: {source}")]
    ListDir {
        /// The WAL root.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A segment file could not be read.
    #[error("failed to read segment {id}: {source}")]
    ReadSegment {
        /// The segment that failed to load.
        id: SegmentId,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A segment file exists but does not decode.
    #[error("corrupt segment {id}: {source}")]
    CorruptSegment {
        /// The corrupt segment.
        id: SegmentId,
        /// Decoder error.
        source: serde_json::Error,
    },

    /// A segment could not be serialized.
    #[error("failed to encode segment {id}: {source}")]
    EncodeSegment {
        /// The segment being committed.
        id: SegmentId,
        /// Encoder error.
        source: serde_json::Error,
    },

    /// The segment could not be durably written.
    #[error("failed to commit segment {id}: {source}")]
    Commit {
        /// The segment being committed.
        id: SegmentId,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Errors returned by [`crate::Wal::process`].
///
/// `E` is the error type of the visit callback.
#[derive(Debug, Error)]
pub enum ProcessError<E: std::error::Error + 'static> {
    /// The visit callback rejected the segment. The segment and every later
    /// one are still queued.
    #[error("process WAL segment {segment}: {source}")]
    Visit {
        /// The segment that was being visited.
        segment: SegmentId,
        /// The callback error.
        source: E,
    },

    /// The segment was handled but its file could not be removed. The segment
    /// is still queued and will be visited again.
    #[error("process WAL segment {segment}: failed to trim segment: {source}")]
    Trim {
        /// The segment that could not be removed.
        segment: SegmentId,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The segment file was removed but the removal could not be synced. The
    /// segment is no longer queued, though it may reappear after a crash.
    #[error("process WAL segment {segment}: failed to sync trimmed segment: {source}")]
    Sync {
        /// The segment that was removed.
        segment: SegmentId,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl<E: std::error::Error + 'static> ProcessError<E> {
    /// Returns the segment the error refers to.
    pub fn segment(&self) -> SegmentId {
        match self {
            Self::Visit { segment, .. }
            | Self::Trim { segment, .. }
            | Self::Sync { segment, .. } => *segment,
        }
    }

    /// Returns true when a delivered segment is still queued.
    pub fn is_trim_failure(&self) -> bool {
        matches!(self, Self::Trim { .. })
    }

    /// Returns true when a delivered segment was removed but the removal may
    /// not be durable.
    pub fn is_sync_failure(&self) -> bool {
        matches!(self, Self::Sync { .. })
    }
}

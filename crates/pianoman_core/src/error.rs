//! Error types for pianoman core.

use crate::lastfm::LastFmError;
use pianoman_wal::{ProcessError, WalError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while handling events.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The WAL could not be opened or appended to.
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    /// The backlog could not be fully scrobbled. Undelivered tracks are
    /// still in the WAL.
    #[error("failed to scrobble tracks: {0}")]
    Scrobble(#[from] ProcessError<LastFmError>),

    /// A direct Last.fm call (now playing, love, unlove) failed.
    #[error("Last.FM error: {0}")]
    LastFm(#[from] LastFmError),

    /// The eventcmd payload could not be parsed.
    #[error("failed to parse track from eventcmd payload: {message}")]
    Payload {
        /// Description of the problem.
        message: String,
    },

    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The config file is not valid YAML for the expected shape.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// The config parsed but holds unusable values.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a payload error.
    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload {
            message: message.into(),
        }
    }

    /// Creates an invalid config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true if the WAL and disk may disagree after this error.
    ///
    /// This is the case when a delivered segment could not be removed; it
    /// will be delivered again on the next run.
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, Self::Scrobble(err) if err.is_trim_failure())
    }

    /// Returns true if a delivered segment was removed without a directory
    /// sync. Its tracks may be scrobbled again after a crash.
    pub fn is_unsynced(&self) -> bool {
        matches!(self, Self::Scrobble(err) if err.is_sync_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pianoman_wal::SegmentIdGenerator;

    #[test]
    fn classifies_trim_and_sync_failures() {
        let segment = SegmentIdGenerator::new().next_id();
        let io_err = || io::Error::new(io::ErrorKind::PermissionDenied, "denied");

        let trim = CoreError::from(ProcessError::<LastFmError>::Trim {
            segment,
            source: io_err(),
        });
        assert!(trim.is_inconsistent());
        assert!(!trim.is_unsynced());

        let sync = CoreError::from(ProcessError::<LastFmError>::Sync {
            segment,
            source: io_err(),
        });
        assert!(!sync.is_inconsistent());
        assert!(sync.is_unsynced());
        assert!(sync.to_string().contains("failed to sync trimmed segment"));
    }
}

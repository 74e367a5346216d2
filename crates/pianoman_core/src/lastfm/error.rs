//! Last.fm client errors.

use crate::retry::DeliveryFailure;
use serde::Deserialize;
use thiserror::Error;

/// Result type for Last.fm calls.
pub type LastFmResult<T> = Result<T, LastFmError>;

/// Error code for an invalid or expired session key.
pub(crate) const CODE_INVALID_SESSION_KEY: u32 = 9;

/// A structured error returned by the Last.fm API.
#[derive(Debug, Clone, PartialEq, Eq, Error, Deserialize)]
#[error("Last.FM API Error Code {code}: {message}")]
pub struct ApiError {
    /// Error code, see <https://www.last.fm/api/errorcodes>.
    #[serde(rename = "error")]
    pub code: u32,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

/// Errors from the Last.fm client.
#[derive(Debug, Error)]
pub enum LastFmError {
    /// Last.fm rejected the request.
    #[error("{method} failed: {source}")]
    Api {
        /// API method.
        method: String,
        /// The rejection.
        source: ApiError,
    },

    /// The request could not be sent or the response could not be read.
    #[error("{method} failed: request failed: {message}")]
    Transport {
        /// API method.
        method: String,
        /// Description from the HTTP client.
        message: String,
    },

    /// The response was not what the method returns.
    #[error("{method} failed: failed to parse response: {source}")]
    Protocol {
        /// API method.
        method: String,
        /// Decoding error.
        source: serde_json::Error,
    },

    /// A scrobble batch was empty or too large. Nothing was sent.
    #[error("scrobble batches must hold 1 to {max} tracks, got {len}")]
    InvalidBatch {
        /// Number of tracks in the batch.
        len: usize,
        /// Largest allowed batch.
        max: usize,
    },

    /// Logging in to obtain a session key failed.
    #[error("failed to login to Last.FM: {0}")]
    Login(#[source] Box<LastFmError>),
}

impl LastFmError {
    /// Returns the API error, if Last.fm answered with one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl DeliveryFailure for LastFmError {
    fn rejection_code(&self) -> Option<u32> {
        // A failed login never rejects the tracks themselves.
        self.api_error().map(|err| err.code)
    }
}

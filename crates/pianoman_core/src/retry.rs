//! Delivery failure classification.

use std::collections::BTreeSet;

/// Last.fm error codes that indicate a temporary problem.
///
/// - 8: operation failed, most likely the backend
/// - 9: invalid session key, re-authenticate
/// - 11: service offline
/// - 16: temporarily unavailable
/// - 29: rate limit exceeded
pub const DEFAULT_TRANSIENT_CODES: [u32; 5] = [8, 9, 11, 16, 29];

/// A failed delivery attempt.
pub trait DeliveryFailure: std::error::Error {
    /// The structured rejection code, if the remote end answered with one.
    ///
    /// `None` means the outcome is unknown (transport error, timeout,
    /// malformed response).
    fn rejection_code(&self) -> Option<u32>;
}

/// What to do with a segment after a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The segment is resolved and can be removed from the queue.
    Drop,
    /// The segment must stay queued and be tried again later.
    Retry,
}

/// Splits delivery failures into terminal rejections and retriable errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    transient: BTreeSet<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSIENT_CODES)
    }
}

impl RetryPolicy {
    /// Creates a policy treating `codes` as transient.
    pub fn new(codes: impl IntoIterator<Item = u32>) -> Self {
        Self {
            transient: codes.into_iter().collect(),
        }
    }

    /// Returns true if `code` is in the transient allow-list.
    #[must_use]
    pub fn is_transient(&self, code: u32) -> bool {
        self.transient.contains(&code)
    }

    /// Returns the transient codes in ascending order.
    pub fn transient_codes(&self) -> impl Iterator<Item = u32> + '_ {
        self.transient.iter().copied()
    }

    /// Classifies the result of a delivery attempt.
    ///
    /// Success and non-transient rejections are resolved. Transient
    /// rejections and failures without a code are retried, since a
    /// request that may or may not have landed must not be lost.
    #[must_use]
    pub fn classify<E: DeliveryFailure>(&self, result: &Result<(), E>) -> Disposition {
        match result {
            Ok(()) => Disposition::Drop,
            Err(err) => match err.rejection_code() {
                Some(code) if !self.is_transient(code) => Disposition::Drop,
                _ => Disposition::Retry,
            },
        }
    }
}

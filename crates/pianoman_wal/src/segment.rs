//! WAL segments.
//!
//! A segment is an ordered batch of records sharing one [`SegmentId`]. The
//! on-disk encoding is a JSON array of every record in the segment followed
//! by a newline:
//!
//! ```text
//! [1,2,3]
//! ```
//!
//! There is no incremental encoding. Each commit writes the full record set,
//! so any segment file can be decoded on its own.

use crate::error::{WalError, WalResult};
use crate::id::SegmentId;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An ordered collection of records in the WAL.
///
/// The WAL appends at most `max_segment_size` records to a segment before
/// cutting a new one. The segment itself does not enforce that limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment<T> {
    id: SegmentId,
    records: Vec<T>,
}

impl<T> Segment<T> {
    /// Creates an empty segment.
    #[must_use]
    pub fn new(id: SegmentId) -> Self {
        Self {
            id,
            records: Vec::new(),
        }
    }

    /// Returns the segment id.
    #[must_use]
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Returns the number of records in the segment.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the segment holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds a record to the end of the segment.
    pub fn append(&mut self, record: T) {
        tracing::trace!(segment = %self.id, len = self.records.len() + 1, "appending record");
        self.records.push(record);
    }

    /// Removes the most recently appended record.
    pub(crate) fn pop(&mut self) -> Option<T> {
        self.records.pop()
    }
}

impl<T: Clone> Segment<T> {
    /// Returns a copy of the records in this segment, in append order.
    #[must_use]
    pub fn records(&self) -> Vec<T> {
        self.records.clone()
    }
}

impl<T: Serialize> Segment<T> {
    /// Serializes every record in the segment.
    ///
    /// # Errors
    ///
    /// Returns [`WalError::EncodeSegment`] if a record cannot be serialized.
    pub fn encode(&self) -> WalResult<Vec<u8>> {
        tracing::trace!(segment = %self.id, len = self.records.len(), "serializing segment");

        let mut data = serde_json::to_vec(&self.records)
            .map_err(|source| WalError::EncodeSegment { id: self.id, source })?;
        data.push(b'\n');
        Ok(data)
    }
}

impl<T: DeserializeOwned> Segment<T> {
    /// Decodes a segment previously produced by [`Segment::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`WalError::CorruptSegment`] if the bytes are not a JSON array
    /// of the expected record type.
    pub fn decode(id: SegmentId, data: &[u8]) -> WalResult<Self> {
        let records = serde_json::from_slice(data)
            .map_err(|source| WalError::CorruptSegment { id, source })?;
        Ok(Self { id, records })
    }
}

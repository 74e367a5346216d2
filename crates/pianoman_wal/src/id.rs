//! Segment identifiers.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::{NoContext, Timestamp, Uuid};

/// Length of the canonical text encoding.
const ENCODED_LEN: usize = 32;

/// Identifier of a WAL segment.
///
/// Segment ids are UUIDv7 values: the leading 48 bits are the creation time
/// in milliseconds, so both the binary value and the canonical text encoding
/// (32 lowercase hex digits) sort in creation order. Segment files are named
/// with this encoding.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(Uuid);

impl SegmentId {
    /// Creates an id from a UUIDv7.
    ///
    /// Returns `None` for any other UUID version.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        (uuid.get_version_num() == 7).then_some(Self(uuid))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parses a file name as a segment id.
    ///
    /// Only the exact canonical encoding is accepted: 32 lowercase hex digits
    /// of a version 7 UUID. Anything else (hyphenated forms, uppercase,
    /// temporary file suffixes) is not a segment.
    #[must_use]
    pub fn parse_strict(name: &str) -> Option<Self> {
        if name.len() != ENCODED_LEN
            || !name
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return None;
        }

        Uuid::try_parse(name).ok().and_then(Self::from_uuid)
    }

    /// Returns the time the segment was created.
    #[must_use]
    pub fn created_at(&self) -> SystemTime {
        let (secs, nanos) = self
            .0
            .get_timestamp()
            .map(|ts| ts.to_unix())
            .unwrap_or_default();
        UNIX_EPOCH + Duration::new(secs, nanos)
    }

    /// Returns the canonical file name for this segment.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Debug for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SegmentId({})", self.0.simple())
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for SegmentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_strict(s).ok_or_else(|| format!("not a segment id: {s:?}"))
    }
}

/// Hands out strictly increasing segment ids.
///
/// UUIDv7 alone only orders ids across milliseconds. The generator remembers
/// the last id it issued (or the newest id recovered from disk) and, when a
/// fresh id would not sort after it, moves one millisecond past the previous
/// timestamp instead. This also covers the wall clock stepping backwards.
#[derive(Debug, Default, Clone)]
pub struct SegmentIdGenerator {
    last: Option<SegmentId>,
}

impl SegmentIdGenerator {
    /// Creates a generator with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator whose ids all sort after `last`.
    #[must_use]
    pub fn after(last: Option<SegmentId>) -> Self {
        Self { last }
    }

    /// Returns the next id.
    pub fn next_id(&mut self) -> SegmentId {
        let candidate = SegmentId(Uuid::now_v7());

        let id = match self.last {
            Some(last) if candidate <= last => {
                let next = last.created_at() + Duration::from_millis(1);
                let since_epoch = next.duration_since(UNIX_EPOCH).unwrap_or_default();
                SegmentId(Uuid::new_v7(Timestamp::from_unix(
                    NoContext,
                    since_epoch.as_secs(),
                    since_epoch.subsec_nanos(),
                )))
            }
            _ => candidate,
        };

        self.last = Some(id);
        id
    }
}

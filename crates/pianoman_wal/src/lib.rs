//! # Pianoman WAL
//!
//! A small segmented write-ahead queue that keeps records on disk until they
//! have been delivered somewhere else.
//!
//! The queue is rooted at a directory. Records are grouped into segments of
//! at most `max_segment_size` records, and every segment lives in its own
//! file named after its [`SegmentId`]. Segment ids are time ordered, so the
//! directory listing alone is enough to recover delivery order after a
//! crash.
//!
//! ## Design Principles
//!
//! - Every append rewrites the whole tail segment and fsyncs it before
//!   returning; any file on disk is a complete, decodable snapshot
//! - Segments are delivered oldest first, one at a time
//! - A failed delivery stops processing and leaves the failed segment and
//!   everything after it untouched
//! - Records are opaque: anything `Serialize + DeserializeOwned + Clone`
//!
//! ## Example
//!
//! ```rust
//! use pianoman_wal::Wal;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut wal = Wal::<u32>::open(dir.path(), 50).unwrap();
//! wal.append(1).unwrap();
//! wal.append(2).unwrap();
//!
//! let mut delivered = Vec::new();
//! wal.process(|segment| {
//!     delivered.extend(segment.records());
//!     Ok::<_, std::io::Error>(())
//! })
//! .unwrap();
//!
//! assert_eq!(delivered, vec![1, 2]);
//! assert!(wal.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod id;
mod segment;
mod wal;

pub use error::{ProcessError, WalError, WalResult};
pub use id::{SegmentId, SegmentIdGenerator};
pub use segment::Segment;
pub use wal::Wal;

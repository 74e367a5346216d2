//! The segmented write-ahead queue.
//!
//! ```text
//! <root>/
//! ├─ 0190b6c7a1e07b3c9f1d2e4a5b6c7d8e   # oldest segment, full
//! ├─ 0190b6c9f2a47e11a0b9c8d7e6f5a4b3   # tail segment, may be partial
//! └─ 0190b6c9f2a47e11a0b9c8d7e6f5a4b3.tmp   # only while a commit is in flight
//! ```
//!
//! Commits write the tail segment to a temporary sibling, fsync it, rename it
//! over the segment file, and fsync the directory. A crash at any point
//! leaves either the previous or the new snapshot in place. Leftover `.tmp`
//! files do not parse as segment ids and are ignored on open.

use crate::error::{ProcessError, WalError, WalResult};
use crate::id::{SegmentId, SegmentIdGenerator};
use crate::segment::Segment;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Suffix for in-flight segment commits.
const TEMP_SUFFIX: &str = ".tmp";

/// A write-ahead log of records rooted at a directory.
///
/// Each file in the directory is a [`Segment`] named with its [`SegmentId`].
/// Segments hold at most `max_segment_size` records; new segments are cut as
/// records are appended and removed as they are successfully processed.
///
/// The WAL is a single-writer structure. It performs no locking and must not
/// be opened by two processes at once.
#[derive(Debug)]
pub struct Wal<T> {
    root: PathBuf,
    segments: VecDeque<Segment<T>>,
    max_segment_size: usize,
    ids: SegmentIdGenerator,
}

impl<T: Serialize + DeserializeOwned> Wal<T> {
    /// Opens the WAL rooted at `path`, loading every segment found there.
    ///
    /// The directory is created if it does not exist. Directories and files
    /// whose names are not segment ids are ignored. Segments are ordered by
    /// id, which is their creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `max_segment_size` is zero
    /// - The directory cannot be created or listed
    /// - Any segment file cannot be read or decoded
    pub fn open(path: impl AsRef<Path>, max_segment_size: usize) -> WalResult<Self> {
        let root = path.as_ref().to_path_buf();

        if max_segment_size == 0 {
            return Err(WalError::InvalidSegmentSize(max_segment_size));
        }

        fs::create_dir_all(&root).map_err(|source| WalError::CreateDir {
            path: root.clone(),
            source,
        })?;

        let list_err = |source| WalError::ListDir {
            path: root.clone(),
            source,
        };

        let mut segments = Vec::new();
        for entry in fs::read_dir(&root).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            if !entry.file_type().map_err(list_err)?.is_file() {
                continue;
            }

            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(SegmentId::parse_strict) else {
                tracing::trace!(file = ?name, "skipping non-segment file");
                continue;
            };

            let data =
                fs::read(entry.path()).map_err(|source| WalError::ReadSegment { id, source })?;
            let segment = Segment::decode(id, &data)?;

            tracing::debug!(segment = %id, records = segment.len(), "loaded segment");
            segments.push(segment);
        }

        segments.sort_by_key(Segment::id);

        tracing::debug!(
            root = %root.display(),
            segments = segments.len(),
            "opened WAL"
        );

        Ok(Self {
            ids: SegmentIdGenerator::after(segments.last().map(Segment::id)),
            root,
            segments: segments.into(),
            max_segment_size,
        })
    }

    /// Appends a record, cutting a new segment if the tail is full.
    ///
    /// The tail segment is durably committed before this returns. If the
    /// commit fails the append is undone in memory and, best effort, on disk:
    /// a freshly cut segment file is removed and an existing tail is
    /// rewritten with its previous records. The append can then be retried
    /// without queueing the record twice.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment cannot be encoded or written.
    pub fn append(&mut self, record: T) -> WalResult<()> {
        let cut = self
            .segments
            .back()
            .map_or(true, |tail| tail.len() >= self.max_segment_size);

        if cut {
            let id = self.ids.next_id();
            tracing::debug!(segment = %id, "cutting new segment");
            self.segments.push_back(Segment::new(id));
        }

        if let Some(tail) = self.segments.back_mut() {
            tail.append(record);

            if let Err(err) = commit(&self.root, tail) {
                tail.pop();
                let id = tail.id();

                // The rename may have landed before the failure
                let restored = if cut {
                    self.segments.pop_back();
                    match fs::remove_file(self.segment_path(id)) {
                        Err(source) if source.kind() != io::ErrorKind::NotFound => {
                            Err(WalError::Commit { id, source })
                        }
                        _ => Ok(()),
                    }
                } else {
                    commit(&self.root, tail)
                };

                if let Err(restore_err) = restored {
                    tracing::warn!(segment = %id, error = %restore_err, "failed to roll back segment file");
                }
                return Err(err);
            }
        }

        Ok(())
    }
}

impl<T> Wal<T> {
    /// Visits segments oldest first, removing each one `visit` accepts.
    ///
    /// Processing stops at the first segment `visit` rejects; that segment
    /// and all later ones are left untouched. Segments removed before the
    /// failure stay removed.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::Visit`] when `visit` fails
    /// - [`ProcessError::Trim`] when a processed segment could not be removed
    ///   from disk
    /// - [`ProcessError::Sync`] when a processed segment was removed but the
    ///   directory could not be synced
    pub fn process<F, E>(&mut self, mut visit: F) -> Result<(), ProcessError<E>>
    where
        F: FnMut(&Segment<T>) -> Result<(), E>,
        E: std::error::Error + 'static,
    {
        while let Some(head) = self.segments.front() {
            let id = head.id();

            if let Err(source) = visit(head) {
                tracing::debug!(segment = %id, "segment not processed, stopping");
                return Err(ProcessError::Visit {
                    segment: id,
                    source,
                });
            }

            match fs::remove_file(self.segment_path(id)) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    tracing::warn!(segment = %id, "processed segment was already removed");
                }
                Err(source) => {
                    tracing::error!(segment = %id, error = %source, "failed to trim processed segment");
                    return Err(ProcessError::Trim {
                        segment: id,
                        source,
                    });
                }
            }

            self.segments.pop_front();
            tracing::debug!(segment = %id, remaining = self.segments.len(), "trimmed segment");

            sync_directory(&self.root).map_err(|source| {
                tracing::error!(segment = %id, error = %source, "failed to sync trimmed segment");
                ProcessError::Sync {
                    segment: id,
                    source,
                }
            })?;
        }

        Ok(())
    }

    /// Returns the WAL root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the maximum number of records per segment.
    #[must_use]
    pub fn max_segment_size(&self) -> usize {
        self.max_segment_size
    }

    /// Returns the pending segments, oldest first.
    pub fn segments(&self) -> impl ExactSizeIterator<Item = &Segment<T>> {
        self.segments.iter()
    }

    /// Returns the number of pending segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of pending records across all segments.
    #[must_use]
    pub fn pending_records(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    fn segment_path(&self, id: SegmentId) -> PathBuf {
        self.root.join(id.file_name())
    }
}

/// Durably replaces the file for `segment` with its current contents.
fn commit<T: Serialize>(root: &Path, segment: &Segment<T>) -> WalResult<()> {
    let id = segment.id();
    let data = segment.encode()?;

    let path = root.join(id.file_name());
    let temp_path = root.join(format!("{id}{TEMP_SUFFIX}"));

    let write = || -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &path)?;
        sync_directory(root)
    };

    write().map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        WalError::Commit { id, source }
    })?;

    tracing::trace!(segment = %id, bytes = data.len(), "committed segment");
    Ok(())
}

/// Syncs the WAL directory so file creation, rename, and removal are durable.
#[cfg(unix)]
fn sync_directory(root: &Path) -> io::Result<()> {
    File::open(root)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_root: &Path) -> io::Result<()> {
    // NTFS journals directory metadata; there is no directory fsync
    Ok(())
}

//! Inspect command implementation.

use pianoman_core::{Config, Track};
use pianoman_wal::{Segment, Wal};
use serde::Serialize;
use std::time::UNIX_EPOCH;

/// Queue inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// WAL directory.
    pub path: String,
    /// Tracks per segment.
    pub max_segment_size: usize,
    /// Number of queued tracks.
    pub pending_tracks: usize,
    /// Queued segments, oldest first.
    pub segments: Vec<SegmentInfo>,
}

/// A single queued segment.
#[derive(Debug, Serialize)]
pub struct SegmentInfo {
    /// Segment id, also its file name.
    pub id: String,
    /// Creation time in seconds since the Unix epoch.
    pub created_at: u64,
    /// Number of tracks.
    pub tracks: usize,
    /// The tracks themselves (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<Track>>,
}

/// Runs the inspect command.
pub fn run(config: &Config, json: bool, show_tracks: bool) -> Result<(), Box<dyn std::error::Error>> {
    let dir = config.wal_dir();

    let result = if dir.exists() {
        let wal = super::open_wal(config)?;
        inspect(&wal, show_tracks)
    } else {
        InspectResult {
            path: dir.display().to_string(),
            max_segment_size: config.scrobble.max_batch_size,
            pending_tracks: 0,
            segments: Vec::new(),
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_text_output(&result);
    }

    Ok(())
}

/// Summarizes the queue.
pub fn inspect(wal: &Wal<Track>, show_tracks: bool) -> InspectResult {
    InspectResult {
        path: wal.root().display().to_string(),
        max_segment_size: wal.max_segment_size(),
        pending_tracks: wal.pending_records(),
        segments: wal
            .segments()
            .map(|segment| segment_info(segment, show_tracks))
            .collect(),
    }
}

fn segment_info(segment: &Segment<Track>, show_tracks: bool) -> SegmentInfo {
    SegmentInfo {
        id: segment.id().to_string(),
        created_at: segment
            .id()
            .created_at()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default(),
        tracks: segment.len(),
        records: show_tracks.then(|| segment.records()),
    }
}

fn print_text_output(result: &InspectResult) {
    println!("pianoman Scrobble Queue");
    println!("=======================");
    println!();
    println!("Path: {}", result.path);
    println!("Max segment size: {}", result.max_segment_size);
    println!();
    println!("Pending:");
    println!("  Segments: {}", result.segments.len());
    println!("  Tracks:   {}", result.pending_tracks);

    if result.segments.is_empty() {
        return;
    }

    println!();
    println!("Segments:");
    for segment in &result.segments {
        println!(
            "  [{}] {} track(s), created at {}",
            segment.id, segment.tracks, segment.created_at
        );

        for track in segment.records.iter().flatten() {
            println!(
                "    {} - {} ({}) @ {}",
                track.artist, track.title, track.album, track.scrobble_at
            );
        }
    }
}

//! pianobar eventcmd handling.

use crate::eligibility::EligibilityPolicy;
use crate::error::CoreResult;
use crate::lastfm::{FeedbackProvider, LastFmError, Scrobbler};
use crate::retry::{DeliveryFailure, Disposition, RetryPolicy};
use crate::track::Track;
use pianoman_wal::{ProcessError, Wal};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use tracing::{debug, info, trace, warn};

/// A pianobar event pianoman knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// A track started playing.
    SongStart,
    /// A track finished playing.
    SongFinish,
    /// The user gave the track a thumbs up.
    SongLove,
    /// The user gave the track a thumbs down.
    SongBan,
}

impl Event {
    /// All handled events.
    pub const ALL: [Event; 4] = [
        Event::SongStart,
        Event::SongFinish,
        Event::SongLove,
        Event::SongBan,
    ];

    /// Parses an eventcmd event name, ignoring case.
    ///
    /// Returns `None` for events pianoman does not handle.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|event| event.name().eq_ignore_ascii_case(name))
    }

    /// Returns the eventcmd event name.
    pub fn name(self) -> &'static str {
        match self {
            Self::SongStart => "songstart",
            Self::SongFinish => "songfinish",
            Self::SongLove => "songlove",
            Self::SongBan => "songban",
        }
    }

    /// Returns the flag enabling this event.
    pub fn flag(self) -> EventFlags {
        match self {
            Self::SongStart => EventFlags::SONG_START,
            Self::SongFinish => EventFlags::SONG_FINISH,
            Self::SongLove => EventFlags::SONG_LOVE,
            Self::SongBan => EventFlags::SONG_BAN,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of events to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventFlags(u8);

impl EventFlags {
    /// No events.
    pub const NONE: Self = Self(0);
    /// Update now playing on `songstart`.
    pub const SONG_START: Self = Self(1 << 0);
    /// Scrobble on `songfinish`.
    pub const SONG_FINISH: Self = Self(1 << 1);
    /// Love on `songlove`.
    pub const SONG_LOVE: Self = Self(1 << 2);
    /// Unlove on `songban`.
    pub const SONG_BAN: Self = Self(1 << 3);
    /// Every event.
    pub const ALL: Self = Self(0b1111);

    /// Returns true if every flag in `other` is set.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns these flags with `other` cleared.
    #[must_use]
    pub fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Returns true if `event` is enabled.
    #[must_use]
    pub fn should_handle(self, event: Event) -> bool {
        self.contains(event.flag())
    }
}

impl BitOr for EventFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// What handling an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event is unknown or disabled.
    Ignored,
    /// Now playing was updated.
    NowPlaying,
    /// The finished track did not qualify as a scrobble.
    Ineligible,
    /// The finished track was queued and the backlog delivered.
    Scrobbled,
    /// The track was loved.
    Loved,
    /// The track was unloved.
    Unloved,
}

/// Handles pianobar events against Last.fm, queueing scrobbles in a WAL.
pub struct EventHandler<S, F> {
    wal: Wal<Track>,
    scrobbler: S,
    feedback: F,
    flags: EventFlags,
    eligibility: EligibilityPolicy,
    retry: RetryPolicy,
}

impl<S: Scrobbler, F: FeedbackProvider> EventHandler<S, F> {
    /// Creates a handler that only handles `songfinish` with default
    /// policies.
    pub fn new(wal: Wal<Track>, scrobbler: S, feedback: F) -> Self {
        Self {
            wal,
            scrobbler,
            feedback,
            flags: EventFlags::SONG_FINISH,
            eligibility: EligibilityPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the events to handle.
    #[must_use]
    pub fn with_flags(mut self, flags: EventFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the eligibility policy.
    #[must_use]
    pub fn with_eligibility(mut self, eligibility: EligibilityPolicy) -> Self {
        self.eligibility = eligibility;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the enabled events.
    pub fn flags(&self) -> EventFlags {
        self.flags
    }

    /// Returns the scrobble queue.
    pub fn wal(&self) -> &Wal<Track> {
        &self.wal
    }

    /// Handles one eventcmd invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is malformed, the track could not be
    /// queued, or Last.fm could not be reached. Queued tracks that could not
    /// be delivered stay in the WAL.
    pub fn handle(&mut self, event_name: &str, payload: &str) -> CoreResult<Outcome> {
        debug!(event = event_name, "received event");

        let Some(event) = Event::from_name(event_name) else {
            debug!(event = event_name, "ignoring unknown event");
            return Ok(Outcome::Ignored);
        };

        if !self.flags.should_handle(event) {
            trace!(event = %event, "ignoring event due to flags");
            return Ok(Outcome::Ignored);
        }

        trace!(payload, "received event payload");
        let track = Track::from_payload(payload)?;

        let span = tracing::info_span!(
            "track",
            artist = %track.artist,
            album = %track.album,
            title = %track.title
        );
        let _enter = span.enter();

        match event {
            Event::SongStart => {
                info!("updating now playing");
                self.scrobbler.update_now_playing(&track)?;
                Ok(Outcome::NowPlaying)
            }
            Event::SongFinish => self.finish(track),
            Event::SongLove => {
                info!("sending feedback to Last.FM");
                self.feedback.love_track(&track)?;
                Ok(Outcome::Loved)
            }
            Event::SongBan => {
                // Last.fm has no ban, the closest is removing the love
                info!("sending feedback to Last.FM");
                self.feedback.unlove_track(&track)?;
                Ok(Outcome::Unloved)
            }
        }
    }

    fn finish(&mut self, track: Track) -> CoreResult<Outcome> {
        if !self.eligibility.is_eligible(&track) {
            debug!(
                duration = track.song_duration.as_secs(),
                played = track.song_played.as_secs(),
                "track not eligible for scrobbling"
            );
            return Ok(Outcome::Ineligible);
        }

        info!("scrobbling track");
        self.wal.append(track)?;
        self.flush()?;
        Ok(Outcome::Scrobbled)
    }

    /// Delivers the queued backlog without handling an event.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery stopped before the queue was drained.
    pub fn flush(&mut self) -> CoreResult<()> {
        scrobble_backlog(&mut self.wal, &self.scrobbler, &self.retry)?;
        Ok(())
    }
}

/// Scrobbles queued tracks oldest segment first.
///
/// Each segment is sent as one batch. Segments Last.fm accepts or rejects
/// for good are removed; delivery stops at the first segment that should be
/// retried, leaving it and everything after it queued.
///
/// # Errors
///
/// Returns [`ProcessError::Visit`] with the delivery error when a segment is
/// kept for retry, [`ProcessError::Trim`] when a delivered segment could
/// not be removed, or [`ProcessError::Sync`] when its removal could not be
/// synced.
pub fn scrobble_backlog<S: Scrobbler + ?Sized>(
    wal: &mut Wal<Track>,
    scrobbler: &S,
    retry: &RetryPolicy,
) -> Result<(), ProcessError<LastFmError>> {
    if wal.is_empty() {
        trace!("no backlog to scrobble");
        return Ok(());
    }

    debug!(
        segments = wal.len(),
        tracks = wal.pending_records(),
        "scrobbling backlog"
    );

    wal.process(|segment| {
        if segment.is_empty() {
            return Ok(());
        }

        let tracks = segment.records();
        let result = scrobbler.scrobble(&tracks);

        match (retry.classify(&result), result) {
            (_, Ok(())) => {
                info!(segment = %segment.id(), tracks = tracks.len(), "scrobbled tracks");
                Ok(())
            }
            (Disposition::Drop, Err(err)) => {
                warn!(
                    segment = %segment.id(),
                    tracks = tracks.len(),
                    code = ?err.rejection_code(),
                    error = %err,
                    "Last.FM rejected tracks, dropping them"
                );
                Ok(())
            }
            (Disposition::Retry, Err(err)) => {
                warn!(
                    segment = %segment.id(),
                    tracks = tracks.len(),
                    error = %err,
                    "failed to scrobble tracks, will retry later"
                );
                Err(err)
            }
        }
    })
}

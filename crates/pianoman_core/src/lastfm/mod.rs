//! Last.fm API client.
//!
//! [`Api`] talks to the Last.fm 2.0 web service through an [`HttpClient`],
//! so the HTTP stack stays pluggable and tests can run without a network.
//! Callers should depend on the [`Scrobbler`] and [`FeedbackProvider`]
//! traits rather than on [`Api`] directly.

mod api;
mod error;
mod http;
mod request;
mod response;

pub use api::{Api, Credentials, API_ROOT, MAX_TRACKS_PER_SCROBBLE};
pub use error::{ApiError, LastFmError, LastFmResult};
pub use http::HttpClient;

use crate::track::Track;

/// Sends plays to Last.fm.
pub trait Scrobbler {
    /// Scrobbles a batch of tracks in one request.
    ///
    /// The caller is responsible for checking eligibility. A batch must hold
    /// between 1 and [`MAX_TRACKS_PER_SCROBBLE`] tracks.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch is invalid or the request fails.
    fn scrobble(&self, tracks: &[Track]) -> LastFmResult<()>;

    /// Tells Last.fm what the user is listening to right now.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn update_now_playing(&self, track: &Track) -> LastFmResult<()>;
}

/// Mirrors pianobar thumbs as Last.fm loves.
pub trait FeedbackProvider {
    /// Loves a track.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn love_track(&self, track: &Track) -> LastFmResult<()>;

    /// Removes the love from a track.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn unlove_track(&self, track: &Track) -> LastFmResult<()>;
}

impl<T: Scrobbler + ?Sized> Scrobbler for &T {
    fn scrobble(&self, tracks: &[Track]) -> LastFmResult<()> {
        (**self).scrobble(tracks)
    }

    fn update_now_playing(&self, track: &Track) -> LastFmResult<()> {
        (**self).update_now_playing(track)
    }
}

impl<T: FeedbackProvider + ?Sized> FeedbackProvider for &T {
    fn love_track(&self, track: &Track) -> LastFmResult<()> {
        (**self).love_track(track)
    }

    fn unlove_track(&self, track: &Track) -> LastFmResult<()> {
        (**self).unlove_track(track)
    }
}

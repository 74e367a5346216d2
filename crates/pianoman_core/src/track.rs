//! Tracks played by pianobar.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const KEY_ARTIST: &str = "artist";
const KEY_TITLE: &str = "title";
const KEY_ALBUM: &str = "album";
const KEY_SONG_DURATION: &str = "songDuration";
const KEY_SONG_PLAYED: &str = "songPlayed";
const KEY_RATING: &str = "rating";

/// A track as reported by pianobar, and the record stored in the WAL.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Artist name.
    pub artist: String,
    /// Track title.
    pub title: String,
    /// Album name.
    pub album: String,
    /// Whether the user gave the track a thumbs up.
    #[serde(default)]
    pub thumbs_up: bool,
    /// Total length of the track.
    #[serde(with = "duration_secs")]
    pub song_duration: Duration,
    /// How long the track was played.
    #[serde(with = "duration_secs")]
    pub song_played: Duration,
    /// When the event was received, in seconds since the Unix epoch.
    pub scrobble_at: u64,
}

impl Track {
    /// Parses a pianobar eventcmd payload, stamping it with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if a duration field is not a whole number of seconds.
    pub fn from_payload(payload: &str) -> CoreResult<Self> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self::from_payload_at(payload, now)
    }

    /// Parses a pianobar eventcmd payload.
    ///
    /// The payload is a list of `key=value` lines. Unknown keys and lines
    /// without a `=` are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a duration field is not a whole number of seconds.
    pub fn from_payload_at(payload: &str, scrobble_at: u64) -> CoreResult<Self> {
        let mut track = Self {
            scrobble_at,
            ..Self::default()
        };

        for line in payload.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };

            match key {
                KEY_ARTIST => track.artist = value.to_string(),
                KEY_TITLE => track.title = value.to_string(),
                KEY_ALBUM => track.album = value.to_string(),
                KEY_RATING => track.thumbs_up = value == "1",
                KEY_SONG_DURATION => track.song_duration = parse_seconds(key, value)?,
                KEY_SONG_PLAYED => track.song_played = parse_seconds(key, value)?,
                _ => {}
            }
        }

        Ok(track)
    }
}

fn parse_seconds(key: &str, value: &str) -> CoreResult<Duration> {
    if value.is_empty() {
        return Ok(Duration::ZERO);
    }

    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| CoreError::payload(format!("invalid {key} {value:?}: {e}")))
}

/// Serializes a [`Duration`] as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = "artist=Bad Wolves
title=NDA
album=Die About It
coverArt=http://example.com/cover.jpg
stationName=Hard Rock Radio
songStationName=
pRet=1
pRetStr=Everything is fine :)
wRet=0
wRetStr=No error
songDuration=313
songPlayed=200
rating=1
detailUrl=http://www.pandora.com/bad-wolves/die-about-it/nda?dc=232&ad=1:23:1:47805::0:0:0:0:506:307:PA:42003:0:0:0:0:0:0
";

    #[test]
    fn parse_payload() {
        let track = Track::from_payload_at(PAYLOAD, 1_287_141_093).unwrap();

        assert_eq!(track.artist, "Bad Wolves");
        assert_eq!(track.title, "NDA");
        assert_eq!(track.album, "Die About It");
        assert!(track.thumbs_up);
        assert_eq!(track.song_duration, Duration::from_secs(313));
        assert_eq!(track.song_played, Duration::from_secs(200));
        assert_eq!(track.scrobble_at, 1_287_141_093);
    }

    #[test]
    fn parse_ignores_junk_lines() {
        let track = Track::from_payload_at("no equals sign\n\nartist=a=b\n", 0).unwrap();
        assert_eq!(track.artist, "a=b");
        assert_eq!(track.song_duration, Duration::ZERO);
        assert!(!track.thumbs_up);
    }

    #[test]
    fn parse_rejects_bad_duration() {
        let result = Track::from_payload_at("songDuration=long\n", 0);
        assert!(matches!(result, Err(CoreError::Payload { .. })));
    }

    #[test]
    fn parse_empty_duration_is_zero() {
        let track = Track::from_payload_at("songPlayed=\n", 0).unwrap();
        assert_eq!(track.song_played, Duration::ZERO);
    }

    #[test]
    fn from_payload_stamps_current_time() {
        let track = Track::from_payload("artist=x\n").unwrap();
        assert!(track.scrobble_at > 1_600_000_000);
    }

    #[test]
    fn json_shape() {
        let track = Track::from_payload_at(PAYLOAD, 1_287_141_093).unwrap();
        let json = serde_json::to_value(&track).unwrap();

        assert_eq!(json["songDuration"], 313);
        assert_eq!(json["songPlayed"], 200);
        assert_eq!(json["scrobbleAt"], 1_287_141_093u64);

        let back: Track = serde_json::from_value(json).unwrap();
        assert_eq!(back, track);
    }
}

//! Scrobble eligibility.

use crate::track::Track;
use std::time::Duration;

/// Decides whether a finished track counts as a scrobble.
///
/// From <https://www.last.fm/api/scrobbling#when-is-a-scrobble-a-scrobble>:
/// the track must be longer than 30 seconds, and it must have been played
/// for at least half its duration or for 4 minutes, whichever comes first.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityPolicy {
    /// Shortest track that can be scrobbled.
    pub min_duration: Duration,
    /// Play time after which a track always counts.
    pub min_played: Duration,
    /// Fraction of the track that must be played otherwise.
    pub min_played_fraction: f64,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            min_duration: Duration::from_secs(30),
            min_played: Duration::from_secs(4 * 60),
            min_played_fraction: 0.5,
        }
    }
}

impl EligibilityPolicy {
    /// Returns true if `track` should be queued for scrobbling.
    #[must_use]
    pub fn is_eligible(&self, track: &Track) -> bool {
        if track.song_duration < self.min_duration {
            return false;
        }

        if track.song_played > self.min_played {
            return true;
        }

        if track.song_duration.is_zero() {
            return false;
        }

        track.song_played.as_secs_f64() / track.song_duration.as_secs_f64()
            > self.min_played_fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(duration: u64, played: u64) -> Track {
        Track {
            song_duration: Duration::from_secs(duration),
            song_played: Duration::from_secs(played),
            ..Track::default()
        }
    }

    #[test]
    fn too_short() {
        let policy = EligibilityPolicy::default();
        assert!(!policy.is_eligible(&track(29, 29)));
        assert!(policy.is_eligible(&track(30, 29)));
    }

    #[test]
    fn played_more_than_half() {
        let policy = EligibilityPolicy::default();
        assert!(policy.is_eligible(&track(200, 101)));
        assert!(!policy.is_eligible(&track(200, 100)));
        assert!(!policy.is_eligible(&track(200, 10)));
    }

    #[test]
    fn played_four_minutes_of_a_long_track() {
        let policy = EligibilityPolicy::default();
        assert!(policy.is_eligible(&track(1200, 241)));
        assert!(!policy.is_eligible(&track(1200, 240)));
    }

    #[test]
    fn custom_thresholds() {
        let policy = EligibilityPolicy {
            min_duration: Duration::ZERO,
            min_played: Duration::from_secs(10),
            min_played_fraction: 0.9,
        };

        assert!(policy.is_eligible(&track(100, 11)));
        assert!(policy.is_eligible(&track(5, 5)));
        assert!(!policy.is_eligible(&track(0, 0)));
    }
}

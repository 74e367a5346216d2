//! Configuration.
//!
//! pianoman reads a YAML file, by default `~/.config/pianoman/config.yaml`.
//! Every section is optional and falls back to the defaults below.
//!
//! ```yaml
//! auth:
//!   api: { key: "...", secret: "..." }
//!   user: { name: "...", password: "..." }
//! scrobble:
//!   nowPlaying: true
//!   thumbs: true
//!   ignoreThumbsDown: true
//!   wal: wal
//!   minDuration: 30
//!   minPlayed: 240
//!   minPlayedFraction: 0.5
//!   maxBatchSize: 50
//!   retryCodes: [8, 9, 11, 16, 29]
//! eventcmd:
//!   next: ""
//! verbosity: info
//! http:
//!   timeoutSecs: 30
//! ```

use crate::eligibility::EligibilityPolicy;
use crate::error::{CoreError, CoreResult};
use crate::handler::EventFlags;
use crate::lastfm::{Credentials, MAX_TRACKS_PER_SCROBBLE};
use crate::retry::{RetryPolicy, DEFAULT_TRANSIENT_CODES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file location relative to the home directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config/pianoman/config.yaml";

/// Name of the session key cache next to the config file.
pub const SESSION_FILE_NAME: &str = "session";

/// pianoman configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Last.fm credentials.
    pub auth: AuthConfig,
    /// Scrobbling behavior.
    pub scrobble: ScrobbleConfig,
    /// eventcmd chaining.
    pub eventcmd: EventCmdConfig,
    /// Log level filter, e.g. `info` or `debug`.
    pub verbosity: String,
    /// HTTP client settings.
    pub http: HttpConfig,
    /// Where the config was loaded from.
    #[serde(skip)]
    pub path: PathBuf,
}

/// Last.fm credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// API account.
    pub api: ApiCredentials,
    /// User login.
    pub user: UserCredentials,
}

/// Last.fm API account.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiCredentials {
    /// API key.
    pub key: String,
    /// Shared secret.
    pub secret: String,
}

/// Last.fm user login.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserCredentials {
    /// Username.
    pub name: String,
    /// Password.
    pub password: String,
}

/// Scrobbling behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrobbleConfig {
    /// Update now playing on `songstart`.
    pub now_playing: bool,
    /// Mirror thumbs as loves.
    pub thumbs: bool,
    /// Do not unlove tracks on thumbs down.
    pub ignore_thumbs_down: bool,
    /// WAL directory, relative to the config file unless absolute.
    pub wal: PathBuf,
    /// Shortest scrobbled track, in seconds.
    pub min_duration: u64,
    /// Play time after which a track always counts, in seconds.
    pub min_played: u64,
    /// Fraction of a track that must be played otherwise.
    pub min_played_fraction: f64,
    /// Tracks per WAL segment, and therefore per scrobble request.
    pub max_batch_size: usize,
    /// Last.fm error codes that keep tracks queued for retry.
    pub retry_codes: Vec<u32>,
}

/// eventcmd chaining.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventCmdConfig {
    /// Command to forward every event to after handling it.
    pub next: String,
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            scrobble: ScrobbleConfig::default(),
            eventcmd: EventCmdConfig::default(),
            verbosity: "info".to_string(),
            http: HttpConfig::default(),
            path: PathBuf::new(),
        }
    }
}

impl Default for ScrobbleConfig {
    fn default() -> Self {
        let eligibility = EligibilityPolicy::default();
        Self {
            now_playing: true,
            thumbs: true,
            ignore_thumbs_down: true,
            wal: PathBuf::from("wal"),
            min_duration: eligibility.min_duration.as_secs(),
            min_played: eligibility.min_played.as_secs(),
            min_played_fraction: eligibility.min_played_fraction,
            max_batch_size: MAX_TRACKS_PER_SCROBBLE,
            retry_codes: DEFAULT_TRANSIENT_CODES.to_vec(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl Config {
    /// Returns `~/.config/pianoman/config.yaml`, if the home directory is
    /// known.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(|home| PathBuf::from(home).join(DEFAULT_CONFIG_PATH))
    }

    /// Parses and validates a YAML config.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or a value is out of range.
    pub fn parse(yaml: &str) -> CoreResult<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Loads the config file at `path`.
    ///
    /// Permissions are not checked here since logging is usually set up
    /// from the loaded config; see [`insecure_mode`](Self::insecure_mode).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|source| CoreError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::parse(&yaml)?;
        config.path = path.to_path_buf();
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> CoreResult<()> {
        let scrobble = &self.scrobble;

        if scrobble.max_batch_size == 0 || scrobble.max_batch_size > MAX_TRACKS_PER_SCROBBLE {
            return Err(CoreError::invalid_config(format!(
                "scrobble.maxBatchSize must be between 1 and {MAX_TRACKS_PER_SCROBBLE}, got {}",
                scrobble.max_batch_size
            )));
        }

        if !(0.0..=1.0).contains(&scrobble.min_played_fraction) {
            return Err(CoreError::invalid_config(format!(
                "scrobble.minPlayedFraction must be between 0 and 1, got {}",
                scrobble.min_played_fraction
            )));
        }

        if self.http.timeout_secs == 0 {
            return Err(CoreError::invalid_config(
                "http.timeoutSecs must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Returns the directory holding the config file.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Returns the WAL directory, resolved against the config directory.
    pub fn wal_dir(&self) -> PathBuf {
        self.dir().join(&self.scrobble.wal)
    }

    /// Returns the session key cache path.
    pub fn session_path(&self) -> PathBuf {
        self.dir().join(SESSION_FILE_NAME)
    }

    /// Returns the chained eventcmd, if one is configured.
    pub fn next_command(&self) -> Option<&str> {
        let next = self.eventcmd.next.trim();
        (!next.is_empty()).then_some(next)
    }

    /// Returns the HTTP request timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Returns the Last.fm credentials.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_key: self.auth.api.key.clone(),
            api_secret: self.auth.api.secret.clone(),
            username: self.auth.user.name.clone(),
            password: self.auth.user.password.clone(),
        }
    }

    /// Returns the scrobble eligibility thresholds.
    pub fn eligibility(&self) -> EligibilityPolicy {
        EligibilityPolicy {
            min_duration: Duration::from_secs(self.scrobble.min_duration),
            min_played: Duration::from_secs(self.scrobble.min_played),
            min_played_fraction: self.scrobble.min_played_fraction,
        }
    }

    /// Returns the retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.scrobble.retry_codes.iter().copied())
    }

    /// Returns the events to handle.
    pub fn event_flags(&self) -> EventFlags {
        let mut flags = EventFlags::SONG_FINISH;

        if self.scrobble.now_playing {
            flags |= EventFlags::SONG_START;
        }

        if self.scrobble.thumbs {
            flags |= EventFlags::SONG_LOVE | EventFlags::SONG_BAN;
            if self.scrobble.ignore_thumbs_down {
                flags = flags.without(EventFlags::SONG_BAN);
            }
        }

        flags
    }

    /// Returns the file mode of the loaded config if anyone but the owner
    /// can access it.
    ///
    /// The file holds the Last.fm password, so anything but `0600` is
    /// reported. Always `None` off unix.
    pub fn insecure_mode(&self) -> Option<u32> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mode = fs::metadata(&self.path).ok()?.permissions().mode() & 0o777;
            (mode != 0o600).then_some(mode)
        }

        #[cfg(not(unix))]
        {
            None
        }
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredentials")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

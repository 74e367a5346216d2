//! CLI command implementations.

pub mod flush;
pub mod handle;
pub mod inspect;
pub mod session;

use crate::http::UreqClient;
use pianoman_core::lastfm::Api;
use pianoman_core::{Config, Track};
use pianoman_wal::Wal;
use session::SessionCache;

/// Opens the scrobble queue named in `config`.
pub fn open_wal(config: &Config) -> Result<Wal<Track>, Box<dyn std::error::Error>> {
    let dir = config.wal_dir();
    tracing::debug!(path = %dir.display(), "opening WAL");
    Ok(Wal::open(&dir, config.scrobble.max_batch_size)?)
}

/// Builds a Last.fm client sharing `session`'s key.
pub fn lastfm(config: &Config, session: &SessionCache) -> Api<UreqClient> {
    Api::new(
        UreqClient::new(config.http_timeout()),
        config.credentials(),
        session.value(),
    )
}

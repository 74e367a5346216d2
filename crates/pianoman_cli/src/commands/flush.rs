//! Flush command implementation.

use super::session::SessionCache;
use pianoman_core::{scrobble_backlog, Config, CoreError};

/// Scrobbles everything in the queue.
pub fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut wal = super::open_wal(config)?;
    let queued = wal.pending_records();

    if queued == 0 {
        println!("Nothing to scrobble");
        return Ok(());
    }

    let session = SessionCache::load(config.session_path());
    let lastfm = super::lastfm(config, &session);

    let result = scrobble_backlog(&mut wal, &lastfm, &config.retry_policy());
    session.persist();

    let pending = wal.pending_records();
    println!(
        "Delivered {} of {} queued track(s), {} pending",
        queued - pending,
        queued,
        pending
    );

    result.map_err(|e| CoreError::from(e).into())
}

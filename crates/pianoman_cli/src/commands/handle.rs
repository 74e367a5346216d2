//! eventcmd handling.

use super::session::SessionCache;
use pianoman_core::{Config, CoreResult, EventHandler, Outcome};
use pianoman_wal::Wal;
use std::io::{self, Read, Write};
use std::process::{Command, Stdio};

/// Handles one pianobar event read from stdin, then forwards it to the
/// chained eventcmd, if any.
pub fn run(config: &Config, event: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut raw = Vec::new();
    io::stdin()
        .read_to_end(&mut raw)
        .map_err(|e| format!("failed to read eventcmd payload: {e}"))?;
    let payload = String::from_utf8_lossy(&raw);

    let result = handle(config, event, &payload);

    if let Some(next) = config.next_command() {
        chain(next, event, &raw);
    }

    match result {
        Ok(outcome) => {
            tracing::debug!(?outcome, "event handled");
            Ok(())
        }
        Err(err) => {
            if err.is_inconsistent() {
                tracing::error!(error = %err, "delivered tracks are still queued and will be scrobbled again");
            } else if err.is_unsynced() {
                tracing::warn!(error = %err, "delivered tracks were dequeued but may reappear after a crash");
            }
            Err(err.into())
        }
    }
}

fn handle(config: &Config, event: &str, payload: &str) -> CoreResult<Outcome> {
    let wal = Wal::open(config.wal_dir(), config.scrobble.max_batch_size)?;

    let session = SessionCache::load(config.session_path());
    let lastfm = super::lastfm(config, &session);

    let mut handler = EventHandler::new(wal, &lastfm, &lastfm)
        .with_flags(config.event_flags())
        .with_eligibility(config.eligibility())
        .with_retry_policy(config.retry_policy());

    let result = handler.handle(event, payload);
    session.persist();
    result
}

/// Runs `next` with the same event name and payload.
///
/// Failures are logged and never affect pianoman's own exit status.
pub fn chain(next: &str, event: &str, payload: &[u8]) {
    tracing::debug!(command = next, event, "chaining eventcmd");

    let child = Command::new(next)
        .arg(event)
        .stdin(Stdio::piped())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(command = next, error = %err, "failed to start chained eventcmd");
            return;
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(err) = stdin.write_all(payload) {
            tracing::warn!(command = next, error = %err, "failed to send payload to chained eventcmd");
        }
    }

    match child.wait() {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::warn!(command = next, %status, "chained eventcmd failed"),
        Err(err) => tracing::warn!(command = next, error = %err, "failed to wait for chained eventcmd"),
    }
}

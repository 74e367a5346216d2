//! On-disk session key cache.

use pianoman_core::LazyValue;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A Last.fm session key persisted between runs.
///
/// The key is loaded on start, saved with [`persist`](Self::persist) before
/// exit, and the file is deleted as soon as Last.fm rejects the key.
pub struct SessionCache {
    path: PathBuf,
    value: Arc<LazyValue<String>>,
}

impl SessionCache {
    /// Loads the cache file at `path`, if there is one.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let cleanup = path.clone();
        let value = Arc::new(LazyValue::with_invalidate_callback(move || {
            tracing::debug!("deleting session token");
            match fs::remove_file(&cleanup) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    tracing::warn!(path = %cleanup.display(), error = %err, "failed to delete session token");
                }
            }
        }));

        match fs::read_to_string(&path) {
            Ok(token) if !token.trim().is_empty() => {
                tracing::debug!("using cached session token");
                value.set(token.trim().to_string());
            }
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read session token");
            }
        }

        Self { path, value }
    }

    /// Returns the shared session key.
    pub fn value(&self) -> Arc<LazyValue<String>> {
        Arc::clone(&self.value)
    }

    /// Returns the cache file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current session key to disk, readable only by the owner.
    ///
    /// Failures are logged, a missing cache only costs a login.
    pub fn persist(&self) {
        let Some(token) = self.value.get() else {
            tracing::debug!("no session token to cache");
            return;
        };

        tracing::debug!("caching session token");
        if let Err(err) = write_private(self.path(), token.as_bytes()) {
            tracing::error!(path = %self.path().display(), error = %err, "failed to cache session token");
        }
    }
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

//! Blocking HTTP client for the Last.fm API.

use pianoman_core::lastfm::HttpClient;
use std::time::Duration;

const USER_AGENT: &str = concat!("pianoman/", env!("CARGO_PKG_VERSION"));

/// [`HttpClient`] backed by a `ureq` agent.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    /// Creates a client whose requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl HttpClient for UreqClient {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        let mut response = self
            .agent
            .post(url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("User-Agent", USER_AGENT)
            .send(&body[..])
            .map_err(|e| e.to_string())?;

        tracing::trace!(status = %response.status(), "Last.FM responded");

        response
            .body_mut()
            .read_to_vec()
            .map_err(|e| format!("failed to read response: {e}"))
    }
}

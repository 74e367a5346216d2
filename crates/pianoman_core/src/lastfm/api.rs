//! The Last.fm 2.0 API client.

use super::error::{LastFmError, LastFmResult, CODE_INVALID_SESSION_KEY};
use super::http::HttpClient;
use super::request::{Request, PARAM_API_KEY, PARAM_SESSION_KEY};
use super::response::{self, Ignored, ScrobbleResponse, SessionResponse};
use super::{FeedbackProvider, Scrobbler};
use crate::lazy::LazyValue;
use crate::track::Track;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Default API endpoint.
pub const API_ROOT: &str = "https://ws.audioscrobbler.com/2.0/";

/// The most tracks Last.fm accepts in one `track.scrobble` request.
pub const MAX_TRACKS_PER_SCROBBLE: usize = 50;

// https://www.last.fm/api/show/auth.getMobileSession
const METHOD_GET_MOBILE_SESSION: &str = "auth.getMobileSession";
// https://www.last.fm/api/show/track.scrobble
const METHOD_SCROBBLE: &str = "track.scrobble";
// https://www.last.fm/api/show/track.updateNowPlaying
const METHOD_UPDATE_NOW_PLAYING: &str = "track.updateNowPlaying";
// https://www.last.fm/api/show/track.love
const METHOD_LOVE: &str = "track.love";
// https://www.last.fm/api/show/track.unlove
const METHOD_UNLOVE: &str = "track.unlove";

/// API account and user login.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// API key.
    pub api_key: String,
    /// API shared secret.
    pub api_secret: String,
    /// Last.fm username.
    pub username: String,
    /// Last.fm password.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Last.fm client.
///
/// The session key is obtained with `auth.getMobileSession` on first use and
/// cached in a shared [`LazyValue`], so the caller can seed it from disk and
/// persist it afterwards. An "invalid session key" error invalidates it.
pub struct Api<C: HttpClient> {
    client: C,
    api_root: String,
    credentials: Credentials,
    session: Arc<LazyValue<String>>,
}

impl<C: HttpClient> Api<C> {
    /// Creates a client against [`API_ROOT`].
    pub fn new(client: C, credentials: Credentials, session: Arc<LazyValue<String>>) -> Self {
        Self {
            client,
            api_root: API_ROOT.to_string(),
            credentials,
            session,
        }
    }

    /// Overrides the API endpoint.
    #[must_use]
    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into();
        self
    }

    /// Returns the API endpoint.
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Returns the shared session key cache.
    pub fn session(&self) -> &Arc<LazyValue<String>> {
        &self.session
    }

    /// Returns the session key, logging in if needed.
    ///
    /// # Errors
    ///
    /// Returns [`LastFmError::Login`] if the login fails.
    pub fn session_key(&self) -> LastFmResult<String> {
        self.session
            .get_or_try_init(|| self.login())
            .map_err(|e| LastFmError::Login(Box::new(e)))
    }

    fn login(&self) -> LastFmResult<String> {
        debug!(user = %self.credentials.username, "logging in to Last.FM");

        let mut request = Request::new(METHOD_GET_MOBILE_SESSION);
        request.set("username", self.credentials.username.as_str());
        request.set("password", self.credentials.password.as_str());

        let response: SessionResponse = self.send(request)?;
        Ok(response.session.key)
    }

    /// Sends a request that needs a session key.
    fn call<T: DeserializeOwned>(&self, mut request: Request) -> LastFmResult<T> {
        let session_key = self.session_key()?;
        request.set(PARAM_SESSION_KEY, session_key);

        let result = self.send(request);
        if let Err(err) = &result {
            if err.api_error().map(|e| e.code) == Some(CODE_INVALID_SESSION_KEY) {
                warn!("Last.FM rejected the session key, it will be refreshed");
                self.session.invalidate();
            }
        }
        result
    }

    fn send<T: DeserializeOwned>(&self, mut request: Request) -> LastFmResult<T> {
        let method = request.method().to_string();

        request.set(PARAM_API_KEY, self.credentials.api_key.as_str());
        trace!(method = %method, "signing request");
        request.sign(&self.credentials.api_secret);

        let body = self
            .client
            .post(&self.api_root, request.encode().into_bytes())
            .map_err(|message| LastFmError::Transport {
                method: method.clone(),
                message,
            })?;

        trace!(method = %method, bytes = body.len(), "received response");
        response::decode(&method, &body)
    }
}

fn track_request(method: &str, track: &Track) -> Request {
    let mut request = Request::new(method);
    request.set("artist", track.artist.as_str());
    request.set("track", track.title.as_str());
    request
}

impl<C: HttpClient> Scrobbler for Api<C> {
    fn scrobble(&self, tracks: &[Track]) -> LastFmResult<()> {
        if tracks.is_empty() || tracks.len() > MAX_TRACKS_PER_SCROBBLE {
            return Err(LastFmError::InvalidBatch {
                len: tracks.len(),
                max: MAX_TRACKS_PER_SCROBBLE,
            });
        }

        debug!(tracks = tracks.len(), "scrobbling");

        let mut request = Request::new(METHOD_SCROBBLE);
        for (i, track) in tracks.iter().enumerate() {
            request.set(format!("artist[{i}]"), track.artist.as_str());
            request.set(format!("track[{i}]"), track.title.as_str());
            request.set(format!("timestamp[{i}]"), track.scrobble_at.to_string());
            request.set(format!("album[{i}]"), track.album.as_str());
            request.set(format!("chosenByUser[{i}]"), "0");
            request.set(
                format!("duration[{i}]"),
                track.song_duration.as_secs().to_string(),
            );
        }

        let response: ScrobbleResponse = self.call(request)?;
        let counts = response.scrobbles.attr;
        if counts.ignored > 0 {
            warn!(
                accepted = counts.accepted,
                ignored = counts.ignored,
                "Last.FM ignored some scrobbles"
            );
        } else {
            debug!(accepted = counts.accepted, "Last.FM accepted scrobbles");
        }

        Ok(())
    }

    fn update_now_playing(&self, track: &Track) -> LastFmResult<()> {
        debug!(artist = %track.artist, title = %track.title, "updating now playing");

        let mut request = track_request(METHOD_UPDATE_NOW_PLAYING, track);
        request.set("album", track.album.as_str());
        request.set("duration", track.song_duration.as_secs().to_string());

        self.call::<Ignored>(request).map(drop)
    }
}

impl<C: HttpClient> FeedbackProvider for Api<C> {
    fn love_track(&self, track: &Track) -> LastFmResult<()> {
        debug!(artist = %track.artist, title = %track.title, "loving track");
        self.call::<Ignored>(track_request(METHOD_LOVE, track))
            .map(drop)
    }

    fn unlove_track(&self, track: &Track) -> LastFmResult<()> {
        debug!(artist = %track.artist, title = %track.title, "unloving track");
        self.call::<Ignored>(track_request(METHOD_UNLOVE, track))
            .map(drop)
    }
}

impl<C: HttpClient> fmt::Debug for Api<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("api_root", &self.api_root)
            .field("credentials", &self.credentials)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records requests and replays canned responses.
    #[derive(Default)]
    struct TestClient {
        requests: Mutex<Vec<HashMap<String, String>>>,
        responses: Mutex<VecDeque<Result<Vec<u8>, String>>>,
    }

    impl TestClient {
        fn respond(self, response: Result<&str, &str>) -> Self {
            self.responses.lock().push_back(
                response
                    .map(|body| body.as_bytes().to_vec())
                    .map_err(str::to_string),
            );
            self
        }

        fn request(&self, i: usize) -> HashMap<String, String> {
            self.requests.lock()[i].clone()
        }

        fn request_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    impl HttpClient for TestClient {
        fn post(&self, _url: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
            let params = url::form_urlencoded::parse(&body).into_owned().collect();
            self.requests.lock().push(params);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err("no response queued".to_string()))
        }
    }

    const SESSION: &str = r#"{"session":{"name":"user","key":"sk-1","subscriber":0}}"#;
    const SCROBBLED: &str = r#"{"scrobbles":{"@attr":{"accepted":2,"ignored":0}}}"#;

    fn credentials() -> Credentials {
        Credentials {
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            username: "user".to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn api(client: &TestClient) -> Api<&TestClient> {
        Api::new(client, credentials(), Arc::new(LazyValue::new()))
    }

    fn track(n: u64) -> Track {
        Track {
            artist: format!("Artist {n}"),
            title: format!("Title {n}"),
            album: format!("Album {n}"),
            song_duration: Duration::from_secs(200 + n),
            song_played: Duration::from_secs(200),
            scrobble_at: 1_287_141_093 + n,
            ..Track::default()
        }
    }

    #[test]
    fn scrobble_logs_in_and_sends_batch() {
        let client = TestClient::default()
            .respond(Ok(SESSION))
            .respond(Ok(SCROBBLED));
        let api = api(&client);

        api.scrobble(&[track(0), track(1)]).unwrap();
        assert_eq!(client.request_count(), 2);

        let login = client.request(0);
        assert_eq!(login["method"], "auth.getMobileSession");
        assert_eq!(login["username"], "user");
        assert_eq!(login["password"], "hunter2");
        assert_eq!(login["api_key"], "key");
        assert_eq!(login["format"], "json");
        assert!(!login.contains_key("sk"));

        let scrobble = client.request(1);
        assert_eq!(scrobble["method"], "track.scrobble");
        assert_eq!(scrobble["sk"], "sk-1");
        assert_eq!(scrobble["artist[0]"], "Artist 0");
        assert_eq!(scrobble["track[1]"], "Title 1");
        assert_eq!(scrobble["album[1]"], "Album 1");
        assert_eq!(scrobble["timestamp[0]"], "1287141093");
        assert_eq!(scrobble["timestamp[1]"], "1287141094");
        assert_eq!(scrobble["duration[1]"], "201");
        assert_eq!(scrobble["chosenByUser[0]"], "0");

        // The signature covers every parameter but format and api_sig
        let mut expected = Request::new("track.scrobble");
        for (k, v) in &scrobble {
            if k != "api_sig" {
                expected.set(k.as_str(), v.as_str());
            }
        }
        assert_eq!(scrobble["api_sig"], expected.signature("secret"));
    }

    #[test]
    fn session_key_is_reused() {
        let client = TestClient::default()
            .respond(Ok(SESSION))
            .respond(Ok("{}"))
            .respond(Ok("{}"));
        let api = api(&client);

        api.love_track(&track(0)).unwrap();
        api.unlove_track(&track(0)).unwrap();

        assert_eq!(client.request_count(), 3);
        assert_eq!(client.request(1)["method"], "track.love");
        assert_eq!(client.request(2)["method"], "track.unlove");
        assert_eq!(client.request(2)["sk"], "sk-1");
    }

    #[test]
    fn seeded_session_skips_login() {
        let client = TestClient::default().respond(Ok("{}"));
        let api = api(&client);
        api.session().set("cached".to_string());

        api.update_now_playing(&track(3)).unwrap();

        let request = client.request(0);
        assert_eq!(request["method"], "track.updateNowPlaying");
        assert_eq!(request["sk"], "cached");
        assert_eq!(request["album"], "Album 3");
        assert_eq!(request["duration"], "203");
    }

    #[test]
    fn invalid_session_key_invalidates_cache() {
        let invalidated = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invalidated);
        let session = Arc::new(LazyValue::with_invalidate_callback(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        session.set("stale".to_string());

        let client = TestClient::default()
            .respond(Ok(r#"{"error":9,"message":"Invalid session key"}"#))
            .respond(Ok(SESSION))
            .respond(Ok("{}"));
        let api = Api::new(&client, credentials(), Arc::clone(&session));

        let err = api.love_track(&track(0)).unwrap_err();
        assert_eq!(err.api_error().map(|e| e.code), Some(9));
        assert_eq!(invalidated.load(Ordering::SeqCst), 1);
        assert_eq!(session.get(), None);

        api.love_track(&track(0)).unwrap();
        assert_eq!(client.request(1)["method"], "auth.getMobileSession");
        assert_eq!(session.get().as_deref(), Some("sk-1"));
    }

    #[test]
    fn other_api_errors_keep_session() {
        let client = TestClient::default()
            .respond(Ok(r#"{"error":6,"message":"Track not found"}"#));
        let api = api(&client);
        api.session().set("good".to_string());

        let err = api.love_track(&track(0)).unwrap_err();
        assert_eq!(err.api_error().map(|e| e.code), Some(6));
        assert_eq!(api.session().get().as_deref(), Some("good"));
    }

    #[test]
    fn login_failure_is_wrapped() {
        let client = TestClient::default()
            .respond(Ok(r#"{"error":4,"message":"Authentication Failed"}"#));
        let api = api(&client);

        let err = api.scrobble(&[track(0)]).unwrap_err();
        assert!(matches!(err, LastFmError::Login(_)));
        assert!(err.api_error().is_none());
        assert_eq!(client.request_count(), 1);
    }

    #[test]
    fn transport_errors() {
        let client = TestClient::default().respond(Err("connection reset"));
        let api = api(&client);
        api.session().set("sk".to_string());

        let err = api.scrobble(&[track(0)]).unwrap_err();
        assert!(matches!(err, LastFmError::Transport { .. }));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn batch_bounds() {
        let client = TestClient::default();
        let api = api(&client);

        let err = api.scrobble(&[]).unwrap_err();
        assert!(matches!(err, LastFmError::InvalidBatch { len: 0, max: 50 }));

        let tracks: Vec<_> = (0..=MAX_TRACKS_PER_SCROBBLE as u64).map(track).collect();
        let err = api.scrobble(&tracks).unwrap_err();
        assert!(matches!(err, LastFmError::InvalidBatch { len: 51, .. }));

        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn full_batch_is_sent() {
        let client = TestClient::default()
            .respond(Ok(r#"{"scrobbles":{"@attr":{"accepted":50,"ignored":0}}}"#));
        let api = api(&client);
        api.session().set("sk".to_string());

        let tracks: Vec<_> = (0..MAX_TRACKS_PER_SCROBBLE as u64).map(track).collect();
        api.scrobble(&tracks).unwrap();
        assert_eq!(client.request(0)["artist[49]"], "Artist 49");
    }

    #[test]
    fn debug_hides_secrets() {
        let client = TestClient::default();
        let rendered = format!("{:?}", api(&client));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("secret"));
    }
}

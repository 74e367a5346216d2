//! Response decoding.
//!
//! With `format=json` Last.fm answers every method with either the method's
//! payload or an object carrying `error` and `message`.

use super::error::{ApiError, LastFmError, LastFmResult};
use serde::de::{self, DeserializeOwned, Deserializer, IgnoredAny};
use serde::Deserialize;
use serde_json::Value;

/// Decodes a response body for `method`.
pub(crate) fn decode<T: DeserializeOwned>(method: &str, body: &[u8]) -> LastFmResult<T> {
    let protocol = |source| LastFmError::Protocol {
        method: method.to_string(),
        source,
    };

    let value: Value = serde_json::from_slice(body).map_err(protocol)?;

    if value.get("error").is_some() {
        let source: ApiError = serde_json::from_value(value).map_err(protocol)?;
        return Err(LastFmError::Api {
            method: method.to_string(),
            source,
        });
    }

    serde_json::from_value(value).map_err(protocol)
}

/// Response to `auth.getMobileSession`.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionResponse {
    pub session: Session,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Session {
    pub key: String,
}

/// Response to `track.scrobble`.
#[derive(Debug, Deserialize)]
pub(crate) struct ScrobbleResponse {
    pub scrobbles: Scrobbles,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Scrobbles {
    #[serde(rename = "@attr")]
    pub attr: ScrobbleCounts,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScrobbleCounts {
    #[serde(default, deserialize_with = "lenient_u32")]
    pub accepted: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub ignored: u32,
}

/// Response to methods whose payload is not used.
pub(crate) type Ignored = IgnoredAny;

/// Last.fm sends counters as numbers or as strings depending on the method.
fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(u32),
        Text(String),
    }

    match Number::deserialize(deserializer)? {
        Number::Int(n) => Ok(n),
        Number::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

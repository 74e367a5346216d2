//! Signed API requests.

use md5::{Digest, Md5};
use std::collections::BTreeMap;

pub(crate) const PARAM_METHOD: &str = "method";
pub(crate) const PARAM_API_KEY: &str = "api_key";
pub(crate) const PARAM_SESSION_KEY: &str = "sk";
const PARAM_SIGNATURE: &str = "api_sig";
const PARAM_FORMAT: &str = "format";

/// The parameters of one API call, kept sorted by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Request {
    params: BTreeMap<String, String>,
}

impl Request {
    pub fn new(method: &str) -> Self {
        let mut params = BTreeMap::new();
        params.insert(PARAM_METHOD.to_string(), method.to_string());
        Self { params }
    }

    pub fn method(&self) -> &str {
        self.params
            .get(PARAM_METHOD)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Computes the request signature.
    ///
    /// Every parameter except `format` and `api_sig` is concatenated as key
    /// then value in key order, followed by the secret. The signature is the
    /// lowercase hex MD5 of that string.
    pub fn signature(&self, secret: &str) -> String {
        let mut hasher = Md5::new();
        for (key, value) in &self.params {
            if key == PARAM_SIGNATURE || key == PARAM_FORMAT {
                continue;
            }
            hasher.update(key.as_bytes());
            hasher.update(value.as_bytes());
        }
        hasher.update(secret.as_bytes());

        format!("{:x}", hasher.finalize())
    }

    pub fn sign(&mut self, secret: &str) {
        let signature = self.signature(secret);
        self.set(PARAM_SIGNATURE, signature);
    }

    /// Form-encodes the request, asking for a JSON response.
    pub fn encode(&self) -> String {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.params {
            if key != PARAM_FORMAT {
                form.append_pair(key, value);
            }
        }
        form.append_pair(PARAM_FORMAT, "json");
        form.finish()
    }
}

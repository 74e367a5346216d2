//! HTTP client abstraction.

/// A minimal blocking HTTP client.
///
/// Implementations are expected to enforce their own request timeout. A
/// timed out request must be reported as an error.
pub trait HttpClient: Send + Sync {
    /// Sends a form-encoded POST request and returns the response body.
    ///
    /// Non-2xx responses should still return the body when one was read,
    /// since Last.fm reports API errors with a JSON body.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        (**self).post(url, body)
    }
}

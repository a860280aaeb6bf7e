use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use url::Url;

/// Opaque bearer token handed out by the authentication service.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Authenticated HTTP session. Holds the shared client and the bearer token
/// for the lifetime of the run; there is no refresh.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    credential: Credential,
    request_timeout: Duration,
}

impl Session {
    pub fn new(client: Client, credential: Credential, request_timeout: Duration) -> Self {
        Self {
            client,
            credential,
            request_timeout,
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// GET for small JSON payloads, bounded by the overall request timeout.
    pub fn get_json(&self, url: &Url) -> RequestBuilder {
        tracing::debug!("GET {}", url);
        self.client
            .get(url.clone())
            .bearer_auth(self.credential.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.request_timeout)
    }

    /// HEAD for zone metadata, bounded by the overall request timeout.
    pub fn head(&self, url: &Url) -> RequestBuilder {
        tracing::debug!("HEAD {}", url);
        self.client
            .head(url.clone())
            .bearer_auth(self.credential.as_str())
            .timeout(self.request_timeout)
    }

    /// Streaming GET for zone files. Only the client's connect/read timeouts
    /// apply: a multi-gigabyte zone must not be cut off by a total deadline.
    pub fn get_stream(&self, url: &Url) -> RequestBuilder {
        tracing::debug!("GET {} (streamed)", url);
        self.client
            .get(url.clone())
            .bearer_auth(self.credential.as_str())
    }
}

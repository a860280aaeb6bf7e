use thiserror::Error;

use super::metadata::HeaderError;
use crate::types::ForbiddenPolicy;

/// Failures retrieving the link list. Any of these aborts the run: no zone
/// can be processed without the list.
#[derive(Debug, Error)]
pub enum ListError {
    #[error("Transport error fetching zone list: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Unexpected HTTP {status} from CZDS while fetching zone list")]
    HttpStatus { status: u16 },

    #[error("Unable to parse JSON returned from CZDS: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Zone list entry '{entry}' is not a valid URL: {source}")]
    InvalidTarget {
        entry: String,
        source: url::ParseError,
    },

    #[error("Giving up on zone list after {retries} retries: {last}")]
    RetriesExhausted {
        retries: u32,
        #[source]
        last: Box<ListError>,
    },
}

impl ListError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ListError::Transport(_) => true,
            ListError::HttpStatus { status } => *status == 429 || *status >= 500,
            ListError::Parse(_) => false,
            ListError::InvalidTarget { .. } => false,
            ListError::RetriesExhausted { .. } => false,
        }
    }
}

/// Per-zone failures. Caught by the orchestrator and tallied, except for the
/// kinds [`FetchError::is_fatal`] reports.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Unexpected HTTP {status} from CZDS while fetching {zone}")]
    HttpStatus { zone: String, status: u16 },

    #[error("Access to {zone} forbidden (HTTP 403), check the zone's approval status")]
    Forbidden { zone: String },

    #[error("Unexpected Content-Type for {zone}: expected {expected}, got '{actual}'")]
    ContentTypeMismatch {
        zone: String,
        expected: &'static str,
        actual: String,
    },

    #[error("Bad response headers for {zone}: {source}")]
    Header { zone: String, source: HeaderError },

    #[error("Transport error fetching {zone}: {source}")]
    Transport { zone: String, source: reqwest::Error },

    #[error("Truncated download of {zone}: expected {expected} bytes, received {received}")]
    Truncated {
        zone: String,
        expected: u64,
        received: u64,
    },

    #[error("Write error on {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Giving up on {zone} after {retries} retries: {last}")]
    RetriesExhausted {
        zone: String,
        retries: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether this error is transient and worth retrying.
    ///
    /// Content-type and header mismatches are retried because the service
    /// occasionally serves an HTML error page with a 200 status.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            FetchError::Forbidden { .. } => false,
            FetchError::ContentTypeMismatch { .. } => true,
            FetchError::Header { .. } => true,
            FetchError::Transport { .. } => true,
            FetchError::Truncated { .. } => true,
            FetchError::Write { .. } => false,
            FetchError::RetriesExhausted { .. } => false,
        }
    }

    /// Whether this error must stop the whole run instead of just this zone.
    pub fn is_fatal(&self, on_forbidden: ForbiddenPolicy) -> bool {
        match self.root_cause() {
            FetchError::Write { .. } => true,
            FetchError::Forbidden { .. } => on_forbidden == ForbiddenPolicy::Abort,
            _ => false,
        }
    }

    /// The underlying error, looking through `RetriesExhausted`.
    pub fn root_cause(&self) -> &FetchError {
        match self {
            FetchError::RetriesExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}

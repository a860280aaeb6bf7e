use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use thiserror::Error;

/// Media type every zone file is served with.
pub const ZONE_CONTENT_TYPE: &str = "application/x-gzip";

static CONTENT_DISPOSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^attachment;\s*filename="([^"]+)""#).expect("valid regex")
});

static ZONE_FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{8})-([a-z0-9-]+)-zone-data\.txt\.gz").expect("valid regex")
});

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("missing required 'content-disposition' header")]
    MissingContentDisposition,

    #[error("missing required 'content-length' header")]
    MissingContentLength,

    #[error("'content-length' is not a byte count: '{0}'")]
    InvalidContentLength(String),

    #[error("'content-disposition' header does not match: '{0}'")]
    ContentDispositionMismatch(String),

    #[error("filename does not match the zone-data pattern: '{0}'")]
    FilenameMismatch(String),
}

/// What the response headers say about a zone file. Lives only for the
/// duration of one fetch or prefetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneMetadata {
    /// `YYYYMMDD` as found in the served filename.
    pub date: String,
    /// Lowercased zone name, e.g. `com`.
    pub zone: String,
    pub filename: String,
    pub file_size: u64,
}

impl ZoneMetadata {
    /// `<date>-<zone>-`, the prefix every dated copy of this zone file starts with.
    pub fn dated_prefix(&self) -> String {
        format!("{}-{}-", self.date, self.zone)
    }
}

/// Parse `Content-Disposition` and `Content-Length` into [`ZoneMetadata`].
pub fn parse_headers(headers: &HeaderMap) -> Result<ZoneMetadata, HeaderError> {
    let disposition = headers
        .get(CONTENT_DISPOSITION)
        .ok_or(HeaderError::MissingContentDisposition)?;
    let disposition = String::from_utf8_lossy(disposition.as_bytes());

    let length = headers
        .get(CONTENT_LENGTH)
        .ok_or(HeaderError::MissingContentLength)?;
    let length = String::from_utf8_lossy(length.as_bytes());
    let file_size: u64 = length
        .trim()
        .parse()
        .map_err(|_| HeaderError::InvalidContentLength(length.to_string()))?;

    let filename = CONTENT_DISPOSITION_RE
        .captures(&disposition)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| HeaderError::ContentDispositionMismatch(disposition.to_string()))?;

    let caps = ZONE_FILENAME_RE
        .captures(&filename)
        .ok_or_else(|| HeaderError::FilenameMismatch(filename.clone()))?;

    Ok(ZoneMetadata {
        date: caps[1].to_string(),
        zone: caps[2].to_ascii_lowercase(),
        filename,
        file_size,
    })
}

/// The media type of the response without parameters, lowercased. Empty
/// when the header is absent.
pub fn media_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default()
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

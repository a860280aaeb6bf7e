use std::collections::BTreeSet;

use url::Url;

use super::error::ListError;
use crate::auth::{Endpoints, Session};
use crate::retry::{self, RetryAction, RetryConfig};

/// One downloadable zone as announced by the link list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZoneTarget {
    url: Url,
    name: String,
}

impl ZoneTarget {
    pub fn new(url: Url) -> Self {
        let name = url
            .path_segments()
            .and_then(|segments| segments.rev().find(|s| !s.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| url.as_str().to_string());
        Self { url, name }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Last path segment, e.g. `com.zone`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zone name with the `.zone` suffix removed, lowercased, e.g. `com`.
    pub fn zone(&self) -> String {
        let lower = self.name.to_ascii_lowercase();
        match lower.strip_suffix(".zone") {
            Some(stripped) => stripped.to_string(),
            None => lower,
        }
    }
}

impl std::fmt::Display for ZoneTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve raw link-list entries against the download base and deduplicate.
///
/// Absolute URLs are kept as they are; anything else is treated as a path
/// relative to `base`.
pub fn parse_targets(base: &Url, entries: Vec<String>) -> Result<BTreeSet<ZoneTarget>, ListError> {
    let mut targets = BTreeSet::new();
    for entry in entries {
        let url = match Url::parse(&entry) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => base
                .join(entry.trim_start_matches('/'))
                .map_err(|source| ListError::InvalidTarget {
                    entry: entry.clone(),
                    source,
                })?,
            Err(source) => return Err(ListError::InvalidTarget { entry, source }),
        };
        targets.insert(ZoneTarget::new(url));
    }
    Ok(targets)
}

/// Fetch the set of zones this account may download.
///
/// Transport failures and 429/5xx answers are retried with backoff; a
/// malformed body fails at once. Exhaustion surfaces as
/// `ListError::RetriesExhausted`.
pub async fn get_targets(
    session: &Session,
    endpoints: &Endpoints,
    retry_config: &RetryConfig,
) -> Result<BTreeSet<ZoneTarget>, ListError> {
    let result = retry::retry_with_backoff(
        retry_config,
        |e: &ListError| {
            if e.is_retryable() {
                RetryAction::Retry
            } else {
                RetryAction::Abort
            }
        },
        || fetch_links(session, endpoints),
    )
    .await;

    let entries = match result {
        Ok(entries) => entries,
        Err(e) if e.is_retryable() => {
            return Err(ListError::RetriesExhausted {
                retries: retry_config.max_retries,
                last: Box::new(e),
            })
        }
        Err(e) => return Err(e),
    };

    let raw_count = entries.len();
    let targets = parse_targets(&endpoints.downloads_base, entries)?;
    tracing::info!(
        "Zone list returned {} entries ({} unique)",
        raw_count,
        targets.len()
    );
    Ok(targets)
}

/// Single attempt at the link list.
async fn fetch_links(session: &Session, endpoints: &Endpoints) -> Result<Vec<String>, ListError> {
    let response = session
        .get_json(&endpoints.links)
        .send()
        .await
        .map_err(ListError::Transport)?;

    let status = response.status().as_u16();
    if status != 200 {
        return Err(ListError::HttpStatus { status });
    }

    let body = response.bytes().await.map_err(ListError::Transport)?;
    serde_json::from_slice(&body).map_err(ListError::Parse)
}

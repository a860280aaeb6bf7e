//! Size-based change detection for the optional prefetch path.

use std::io;
use std::path::Path;

use tokio::fs;

use super::paths;
use crate::auth::Session;
use crate::czds::zone;
use crate::czds::{FetchError, ZoneMetadata, ZoneTarget};
use crate::retry::{self, RetryAction, RetryConfig};

/// HEAD the zone with the same validation and retry policy as a download.
pub async fn prefetch(
    session: &Session,
    target: &ZoneTarget,
    retry_config: &RetryConfig,
) -> Result<ZoneMetadata, FetchError> {
    let result = retry::retry_with_backoff(
        retry_config,
        |e: &FetchError| {
            if e.is_retryable() {
                RetryAction::Retry
            } else {
                RetryAction::Abort
            }
        },
        || zone::head_zone(session, target),
    )
    .await;

    match result {
        Ok(meta) => Ok(meta),
        Err(e) if e.is_retryable() => Err(FetchError::RetriesExhausted {
            zone: target.zone(),
            retries: retry_config.max_retries,
            last: Box::new(e),
        }),
        Err(e) => Err(e),
    }
}

/// Whether the local copy of a zone differs from what the server reports.
///
/// A file in `dir` whose name contains `<date>-<zone>-`, or the final
/// `<zone>.zone.gz`, with a byte size equal to `meta.file_size` means the
/// zone is up to date. A missing directory means everything is stale.
pub async fn is_stale(dir: &Path, meta: &ZoneMetadata) -> io::Result<bool> {
    let prefix = meta.dated_prefix();
    let canonical = paths::zone_file_path(dir, &meta.zone);

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.contains(&prefix) && path != canonical {
            continue;
        }
        let metadata = entry.metadata().await?;
        if metadata.is_file() && metadata.len() == meta.file_size {
            tracing::debug!(
                "{} matches remote size {}, {} is up to date",
                path.display(),
                meta.file_size,
                meta.zone
            );
            return Ok(false);
        }
    }
    Ok(true)
}

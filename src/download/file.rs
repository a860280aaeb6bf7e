use std::path::Path;

use futures_util::{Stream, StreamExt};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::paths;
use super::DownloadOutcome;
use crate::auth::Session;
use crate::czds::zone;
use crate::czds::{FetchError, ZoneTarget};
use crate::retry::{self, RetryAction, RetryConfig};

/// Per-zone knobs for [`fetch_zone`].
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Write buffer size; the body is flushed to disk in blocks of this size.
    pub chunk_size: usize,
    pub retry: RetryConfig,
    /// Replace an existing `<zone>.zone.gz` instead of reporting it as
    /// already present. Set when a prefetch found the local copy stale.
    pub overwrite: bool,
}

/// Download one zone into `dir` as `<zone>.zone.gz`.
///
/// The file is named after the zone in the served `Content-Disposition`, not
/// the link URL, so it matches what [`super::change::is_stale`] looks for.
/// Each attempt re-issues the GET and streams into `<zone>.zone.gz.tmp`,
/// which is renamed into place only once the byte count matches
/// `Content-Length`. Retryable failures are retried with backoff and
/// surface as `FetchError::RetriesExhausted` once the ceiling is reached.
pub async fn fetch_zone(
    session: &Session,
    target: &ZoneTarget,
    dir: &Path,
    options: &FetchOptions,
) -> Result<DownloadOutcome, FetchError> {
    let result = retry::retry_with_backoff(
        &options.retry,
        |e: &FetchError| {
            if e.is_retryable() {
                RetryAction::Retry
            } else {
                RetryAction::Abort
            }
        },
        || attempt_fetch(session, target, dir, options),
    )
    .await;

    match result {
        Ok(outcome) => Ok(outcome),
        Err(e) if e.is_retryable() => Err(FetchError::RetriesExhausted {
            zone: target.zone(),
            retries: options.retry.max_retries,
            last: Box::new(e),
        }),
        Err(e) => Err(e),
    }
}

/// Single GET-validate-write attempt.
async fn attempt_fetch(
    session: &Session,
    target: &ZoneTarget,
    dir: &Path,
    options: &FetchOptions,
) -> Result<DownloadOutcome, FetchError> {
    let (meta, response) = zone::request_zone(session, target).await?;
    let zone = meta.zone.clone();
    let final_path = paths::zone_file_path(dir, &zone);

    if !options.overwrite {
        let exists = fs::try_exists(&final_path)
            .await
            .map_err(|source| FetchError::Write {
                path: final_path.display().to_string(),
                source,
            })?;
        if exists {
            tracing::info!("{} already present, skipping", final_path.display());
            return Ok(DownloadOutcome::AlreadyPresent);
        }
    }

    tracing::info!(
        zone = %zone,
        size_bytes = meta.file_size,
        "Downloading {} to {}",
        meta.filename,
        final_path.display()
    );

    let stream_zone = zone.clone();
    let body = response.bytes_stream().map(move |chunk| {
        chunk.map_err(|source| FetchError::Transport {
            zone: stream_zone.clone(),
            source,
        })
    });
    let bytes = write_atomically(body, &final_path, meta.file_size, options.chunk_size, &zone).await?;

    tracing::info!("Wrote {} ({} bytes)", final_path.display(), bytes);
    Ok(DownloadOutcome::Downloaded { bytes })
}

/// Stream `body` into `<final_path>.tmp`, then rename it to `final_path`.
///
/// On any failure the temp file is removed and `final_path` is untouched,
/// so a finished zone file is either complete or absent.
pub(crate) async fn write_atomically<S, B>(
    body: S,
    final_path: &Path,
    expected: u64,
    chunk_size: usize,
    zone: &str,
) -> Result<u64, FetchError>
where
    S: Stream<Item = Result<B, FetchError>>,
    B: AsRef<[u8]>,
{
    let tmp = paths::temp_path(final_path);

    let written = match write_temp(body, &tmp, expected, chunk_size, zone).await {
        Ok(n) => n,
        Err(e) => {
            remove_temp(&tmp).await;
            return Err(e);
        }
    };

    if let Err(source) = fs::rename(&tmp, final_path).await {
        remove_temp(&tmp).await;
        return Err(FetchError::Write {
            path: final_path.display().to_string(),
            source,
        });
    }
    Ok(written)
}

async fn write_temp<S, B>(
    body: S,
    tmp: &Path,
    expected: u64,
    chunk_size: usize,
    zone: &str,
) -> Result<u64, FetchError>
where
    S: Stream<Item = Result<B, FetchError>>,
    B: AsRef<[u8]>,
{
    let write_err = |source: std::io::Error| FetchError::Write {
        path: tmp.display().to_string(),
        source,
    };

    let file = fs::File::create(tmp).await.map_err(write_err)?;
    let mut writer = BufWriter::with_capacity(chunk_size, file);
    let mut body = std::pin::pin!(body);
    let mut received: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        let chunk = chunk.as_ref();
        writer.write_all(chunk).await.map_err(write_err)?;
        received += chunk.len() as u64;
    }
    writer.flush().await.map_err(write_err)?;
    writer.into_inner().sync_all().await.map_err(write_err)?;

    if received != expected {
        return Err(FetchError::Truncated {
            zone: zone.to_string(),
            expected,
            received,
        });
    }
    Ok(received)
}

async fn remove_temp(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove {}: {}", tmp.display(), e);
        }
    }
}

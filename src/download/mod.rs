//! Download engine: list the zones, pick the configured ones and fetch them
//! one after another into the dated output directory, tallying every
//! outcome in a [`RunSummary`].

pub mod change;
pub mod error;
pub mod file;
pub mod paths;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::auth::{Endpoints, Session};
use crate::config::{Config, ZoneSelection};
use crate::czds::{list, FetchError, ZoneTarget};
use crate::retry::RetryConfig;
use crate::types::ForbiddenPolicy;

pub use self::error::RunError;
use self::file::FetchOptions;

/// Subset of application config consumed by the download engine.
/// Decoupled from CLI parsing so the engine can be tested independently.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// The dated directory for this run, already created.
    pub(crate) directory: PathBuf,
    pub(crate) zones: ZoneSelection,
    pub(crate) prefetch: bool,
    pub(crate) chunk_size: usize,
    pub(crate) retry: RetryConfig,
    pub(crate) on_forbidden: ForbiddenPolicy,
}

impl DownloadConfig {
    pub fn from_config(config: &Config, directory: PathBuf) -> Self {
        Self {
            directory,
            zones: config.zones.clone(),
            prefetch: config.prefetch,
            chunk_size: config.chunk_size,
            retry: config.retry(),
            on_forbidden: config.on_forbidden,
        }
    }
}

/// What happened to a zone that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The prefetch found a local copy with the server's size.
    UpToDate,
    /// `<zone>.zone.gz` already exists in today's directory.
    AlreadyPresent,
    Downloaded { bytes: u64 },
}

/// Counters for one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub discovered: usize,
    pub downloaded: usize,
    pub up_to_date: usize,
    pub already_present: usize,
    pub bytes: u64,
    /// `(zone, reason)` for every zone that failed without stopping the run.
    pub failed: Vec<(String, String)>,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    fn record(&mut self, outcome: DownloadOutcome) {
        match outcome {
            DownloadOutcome::UpToDate => self.up_to_date += 1,
            DownloadOutcome::AlreadyPresent => self.already_present += 1,
            DownloadOutcome::Downloaded { bytes } => {
                self.downloaded += 1;
                self.bytes += bytes;
            }
        }
    }

    /// One-line summary, e.g. `2 of 3 downloaded`.
    pub fn headline(&self) -> String {
        format!("{} of {} downloaded", self.downloaded, self.discovered)
    }

    /// Multi-line report used for the log and the completion email.
    pub fn report(&self) -> String {
        let mut lines = vec![self.headline()];
        if self.interrupted {
            lines.push("  interrupted before all zones were processed".to_string());
        }
        lines.push(format!("  up to date: {}", self.up_to_date));
        lines.push(format!("  already present: {}", self.already_present));
        lines.push(format!("  bytes written: {}", self.bytes));
        lines.push(format!("  failed: {}", self.failed.len()));
        for (zone, reason) in &self.failed {
            lines.push(format!("    {}: {}", zone, reason));
        }
        lines.push(format!("  elapsed: {}", format_duration(self.elapsed)));
        lines.join("\n")
    }
}

/// Fetch the link list and download every selected zone sequentially.
///
/// Per-zone failures are tallied and the loop continues, unless
/// [`FetchError::is_fatal`] says otherwise, in which case the run stops with
/// [`RunError::Zone`]. The shutdown token is checked between zones.
pub async fn download_zones(
    session: &Session,
    endpoints: &Endpoints,
    config: &DownloadConfig,
    shutdown_token: CancellationToken,
) -> Result<RunSummary, RunError> {
    let started = Instant::now();
    let targets = list::get_targets(session, endpoints, &config.retry).await?;

    let (selected, skipped): (Vec<ZoneTarget>, Vec<ZoneTarget>) = targets
        .into_iter()
        .partition(|t| config.zones.includes(&t.zone()));
    if !skipped.is_empty() {
        tracing::debug!(
            "{} zones available but not selected: {}",
            skipped.len(),
            skipped
                .iter()
                .map(|t| t.zone())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    if let ZoneSelection::Only(names) = &config.zones {
        for name in names {
            if !selected.iter().any(|t| t.zone() == *name) {
                tracing::warn!("Zone {} is configured but not available to this account", name);
            }
        }
    }

    let mut summary = RunSummary {
        discovered: selected.len(),
        ..RunSummary::default()
    };
    tracing::info!(
        "Processing {} zones into {}",
        summary.discovered,
        config.directory.display()
    );

    for target in &selected {
        if shutdown_token.is_cancelled() {
            tracing::info!("Shutdown requested, stopping before {}", target);
            summary.interrupted = true;
            break;
        }

        let zone = target.zone();
        match process_zone(session, target, config).await {
            Ok(outcome) => summary.record(outcome),
            Err(e) if e.is_fatal(config.on_forbidden) => {
                tracing::error!(zone = %zone, error = %e, "Fatal error, stopping run");
                return Err(RunError::Zone { zone, source: e });
            }
            Err(e) => {
                tracing::error!(zone = %zone, error = %e, "Download failed");
                summary.failed.push((zone, e.to_string()));
            }
        }
    }

    summary.elapsed = started.elapsed();
    tracing::info!("── Summary ──");
    for line in summary.report().lines() {
        tracing::info!("{}", line);
    }
    Ok(summary)
}

/// Optional prefetch and staleness check, then the download itself.
async fn process_zone(
    session: &Session,
    target: &ZoneTarget,
    config: &DownloadConfig,
) -> Result<DownloadOutcome, FetchError> {
    let mut overwrite = false;
    if config.prefetch {
        let meta = change::prefetch(session, target, &config.retry).await?;
        let stale = change::is_stale(&config.directory, &meta)
            .await
            .map_err(|source| FetchError::Write {
                path: config.directory.display().to_string(),
                source,
            })?;
        if !stale {
            tracing::info!("{} is up to date ({} bytes)", target, meta.file_size);
            return Ok(DownloadOutcome::UpToDate);
        }
        overwrite = true;
    }

    file::fetch_zone(
        session,
        target,
        &config.directory,
        &FetchOptions {
            chunk_size: config.chunk_size,
            retry: config.retry,
            overwrite,
        },
    )
    .await
}

/// `42s`, `12m 05s` or `1h 02m 03s`.
fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 3600, secs / 60 % 60, secs % 60) {
        (0, 0, s) => format!("{}s", s),
        (0, m, s) => format!("{}m {:02}s", m, s),
        (h, m, s) => format!("{}h {:02}m {:02}s", h, m, s),
    }
}

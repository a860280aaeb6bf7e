//! One complete run: authenticate, download, notify.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::auth::{self, Credentials, Endpoints};
use crate::config::Config;
use crate::download::{self, DownloadConfig, RunError, RunSummary};
use crate::notify::Notifier;

/// Run against the already-prepared dated `directory` and send exactly one
/// notification describing how it ended.
pub async fn run(
    config: &Config,
    directory: &Path,
    notifier: &dyn Notifier,
    shutdown_token: CancellationToken,
) -> Result<RunSummary, RunError> {
    let result = execute(config, directory, shutdown_token).await;
    match &result {
        Ok(summary) => {
            tracing::info!("Run complete: {}", summary.headline());
            if let Err(e) = notifier.notify(&summary.headline(), &summary.report()).await {
                tracing::warn!("Failed to send completion notification: {:#}", e);
            }
        }
        Err(e) => report_failure(notifier, e).await,
    }
    result
}

async fn execute(
    config: &Config,
    directory: &Path,
    shutdown_token: CancellationToken,
) -> Result<RunSummary, RunError> {
    let client = config
        .http_client()
        .map_err(|e| RunError::Client(format!("{:#}", e)))?;
    let endpoints = Endpoints::from_config(config)?;

    let credentials = Credentials {
        username: &config.username,
        password: config.password.as_deref().unwrap_or_default(),
    };
    let session =
        auth::authenticate(client, &endpoints, &credentials, config.request_timeout()).await?;

    let download_config = DownloadConfig::from_config(config, directory.to_path_buf());
    download::download_zones(&session, &endpoints, &download_config, shutdown_token).await
}

/// Log a fatal error and send the failure notification. A notifier error is
/// only logged: the run has already failed.
pub async fn report_failure(notifier: &dyn Notifier, error: &(dyn std::error::Error + '_)) {
    let body = failure_body(error);
    tracing::error!("Run failed: {}", body);

    let subject = format!("Run failed: {}", error);
    if let Err(e) = notifier.notify(&subject, &body).await {
        tracing::warn!("Failed to send failure notification: {:#}", e);
    }
}

/// The error message followed by every cause in its source chain that the
/// message does not already spell out.
fn failure_body(error: &(dyn std::error::Error + '_)) -> String {
    let mut body = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !body.contains(&text) {
            body.push_str(&format!("\n  caused by: {}", text));
        }
        source = cause.source();
    }
    body
}

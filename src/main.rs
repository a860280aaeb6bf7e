//! czds-dl: batch downloader for zone files published through ICANN's
//! Centralized Zone Data Service.
//!
//! Authenticates once, asks the service which zones the account may
//! download, and streams each selected zone into a dated directory. Files
//! are written to a `.tmp` path and renamed into place, so a zone file is
//! either complete or absent.

#![warn(clippy::all)]

mod auth;
mod cli;
mod config;
mod czds;
mod download;
mod job;
mod notify;
pub mod retry;
mod shutdown;
mod types;

use std::fs::{File, OpenOptions};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use download::paths;
use download::RunError;

/// Console output on stderr, plus a plain-text copy in the run's log file
/// when one could be opened.
fn init_tracing(level: types::LogLevel, log_file: Option<File>) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    let file_layer = log_file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let config = match config::Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(cli.log_level, None);
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let notifier = notify::from_config(config.mail.as_ref());

    let directory = paths::dated_directory(
        &config.download_directory,
        chrono::Local::now().date_naive(),
    );
    if let Err(source) = std::fs::create_dir_all(&directory) {
        init_tracing(cli.log_level, None);
        let err = RunError::Directory {
            path: directory.display().to_string(),
            source,
        };
        job::report_failure(notifier.as_ref(), &err).await;
        return ExitCode::FAILURE;
    }

    let log_path = directory.join(paths::LOG_FILE_NAME);
    let log_file = OpenOptions::new().create(true).append(true).open(&log_path);
    let log_error = log_file.as_ref().err().map(|e| e.to_string());
    init_tracing(cli.log_level, log_file.ok());
    if let Some(e) = log_error {
        tracing::warn!("Could not open log file {}: {}", log_path.display(), e);
    }

    tracing::info!("Starting czds-dl {}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(?config, "Loaded configuration");

    match paths::prepare_output_directory(&directory) {
        Ok(0) => {}
        Ok(n) => tracing::info!("Removed {} partial downloads from a previous run", n),
        Err(source) => {
            let err = RunError::Directory {
                path: directory.display().to_string(),
                source,
            };
            job::report_failure(notifier.as_ref(), &err).await;
            return ExitCode::FAILURE;
        }
    }

    let shutdown_token = match shutdown::install_signal_handler() {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to install signal handlers: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match job::run(&config, &directory, notifier.as_ref(), shutdown_token).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

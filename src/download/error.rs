use thiserror::Error;

use crate::auth::AuthError;
use crate::czds::{FetchError, ListError};

/// Errors that end a run early. Everything here maps to a non-zero exit
/// status and a failure notification.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    List(#[from] ListError),

    #[error("Invalid service URL: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Unable to prepare output directory {path}: {source}")]
    Directory {
        path: String,
        source: std::io::Error,
    },

    #[error("Aborting run on {zone}: {source}")]
    Zone { zone: String, source: FetchError },
}

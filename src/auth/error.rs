use thiserror::Error;

/// Authentication failures. All of them are fatal for the run: nothing wraps
/// the authenticate call in a retry loop.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication rejected: invalid username or password")]
    Unauthorized,

    #[error("Authentication endpoint not found: {url}")]
    EndpointNotFound { url: String },

    #[error("Authentication service unavailable: {0}")]
    Transient(String),

    #[error("Unexpected HTTP {status} from authentication service")]
    UnexpectedStatus { status: u16 },

    #[error("Malformed authentication response: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    /// Map a non-200 authentication status onto the error taxonomy.
    pub fn from_status(status: u16, url: &str) -> Self {
        match status {
            401 => AuthError::Unauthorized,
            404 => AuthError::EndpointNotFound {
                url: url.to_string(),
            },
            s if s >= 500 => AuthError::Transient(format!("HTTP {}", s)),
            s => AuthError::UnexpectedStatus { status: s },
        }
    }
}

//! CZDS authentication: trade a username/password for a bearer token once per
//! run, then hand out a [`Session`] that signs every later request.

pub mod endpoints;
pub mod error;
pub mod responses;
pub mod session;

use std::time::Duration;

use reqwest::Client;

pub use self::endpoints::Endpoints;
pub use self::error::AuthError;
use self::responses::{AuthenticateRequest, AuthenticateResponse};
pub use self::session::{Credential, Session};

/// Username/password pair read from configuration.
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl std::fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `POST /api/authenticate` and wrap the returned token in a [`Session`].
///
/// 401 and 404 fail immediately as `Unauthorized` / `EndpointNotFound`; 5xx
/// and transport errors fail as `Transient`. No retry is attempted.
pub async fn authenticate(
    client: Client,
    endpoints: &Endpoints,
    credentials: &Credentials<'_>,
    request_timeout: Duration,
) -> Result<Session, AuthError> {
    let url = endpoints.authenticate.as_str();
    tracing::debug!("Authenticating as {} at {}", credentials.username, url);

    let response = client
        .post(endpoints.authenticate.clone())
        .header(reqwest::header::ACCEPT, "application/json")
        .json(&AuthenticateRequest {
            username: credentials.username,
            password: credentials.password,
        })
        .timeout(request_timeout)
        .send()
        .await
        .map_err(|e| AuthError::Transient(e.to_string()))?;

    let status = response.status().as_u16();
    if status != 200 {
        return Err(AuthError::from_status(status, url));
    }

    let body: AuthenticateResponse = response
        .json()
        .await
        .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

    let token = body
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::MalformedResponse("no accessToken in response".into()))?;

    tracing::info!("Authentication completed successfully");
    Ok(Session::new(
        client,
        Credential::new(token),
        request_timeout,
    ))
}

use serde::{Deserialize, Serialize};

/// Body of `POST /api/authenticate`.
#[derive(Serialize)]
pub struct AuthenticateRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response from `/api/authenticate`. Only the token is used; everything
/// else the service sends back is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialize() {
        let body = serde_json::to_value(AuthenticateRequest {
            username: "u@example.com",
            password: "pw",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"username": "u@example.com", "password": "pw"}));
    }

    #[test]
    fn test_response_with_token() {
        let json = r#"{"accessToken": "eyJ.abc.def", "message": "Authentication Successful"}"#;
        let resp: AuthenticateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.access_token.as_deref(), Some("eyJ.abc.def"));
    }

    #[test]
    fn test_response_without_token() {
        let resp: AuthenticateResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.access_token.is_none());
    }
}

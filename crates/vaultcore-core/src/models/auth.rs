//! Request and response bodies for the `/auth` endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

/// Returned by both login and refresh. Refresh may omit `refreshToken`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "refreshToken", default)]
    pub refresh_token: Option<String>,
    #[serde(rename = "type", default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RefreshTokenRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// Generic `{"message": "..."}` acknowledgement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_response_without_refresh_token() {
        let parsed: AuthResponse = serde_json::from_str(r#"{"token": "a2"}"#).unwrap();
        assert_eq!(parsed.token, "a2");
        assert!(parsed.refresh_token.is_none());
    }

    #[test]
    fn test_login_response_full() {
        let parsed: AuthResponse = serde_json::from_str(
            r#"{"token": "a1", "refreshToken": "r1", "type": "Bearer"}"#,
        )
        .unwrap();
        assert_eq!(parsed.refresh_token.as_deref(), Some("r1"));
        assert_eq!(parsed.token_type.as_deref(), Some("Bearer"));
    }

    #[test]
    fn test_refresh_request_wire_name() {
        let body = serde_json::to_value(RefreshTokenRequest {
            refresh_token: "r1".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "refreshToken": "r1" }));
    }
}

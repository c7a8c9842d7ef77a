//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MfaRequest {
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SetPasswordRequest {
    pub password: String,
}

/// Query parameters carried by the reset link.
#[derive(Deserialize, Debug)]
pub struct SetPasswordQuery {
    pub email: String,
    pub temp_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub email: String,
    pub pending_mfa: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn register_request_round_trips() -> Result<()> {
        let request = RegisterRequest {
            email: "alice@example.com".to_string(),
            password: "hunter2!".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let email = value
            .get("email")
            .and_then(serde_json::Value::as_str)
            .context("missing email")?;
        assert_eq!(email, "alice@example.com");
        let decoded: RegisterRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.password, "hunter2!");
        Ok(())
    }

    #[test]
    fn mfa_request_round_trips() -> Result<()> {
        let request = MfaRequest {
            code: "123456".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let decoded: MfaRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.code, "123456");
        Ok(())
    }

    #[test]
    fn set_password_query_parses_link_parameters() -> Result<()> {
        let query: SetPasswordQuery =
            serde_json::from_value(serde_json::json!({
                "email": "bob@example.com",
                "temp_token": "tok"
            }))?;
        assert_eq!(query.email, "bob@example.com");
        assert_eq!(query.temp_token, "tok");
        Ok(())
    }

    #[test]
    fn session_response_serializes_pending_flag() -> Result<()> {
        let response = SessionResponse {
            email: "bob@example.com".to_string(),
            pending_mfa: true,
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(
            value.get("pending_mfa").and_then(serde_json::Value::as_bool),
            Some(true)
        );
        Ok(())
    }
}

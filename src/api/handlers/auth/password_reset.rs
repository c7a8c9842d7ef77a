//! Stateless password reset: emailed link plus a browser-bound digest cookie.
//!
//! No reset state is persisted. The link carries `{email, temp_token}` and
//! the browser carries the keyed digest in the short-lived `msg_hash`
//! cookie, so only the browser that initiated the request can complete it.

use axum::{
    extract::{ConnectInfo, Extension, Query},
    http::{
        header::{InvalidHeaderValue, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    api::email::{enqueue_email, EmailMessage},
    cli::globals::GlobalArgs,
};

use super::{
    digest::{hash_msg, verify_hash},
    guard::{self, ANONYMOUS_ONLY, FORGOT_PASSWORD_ROUTE},
    session::resolve_auth,
    state::{AuthConfig, AuthState},
    storage::update_password,
    types::{ForgotPasswordRequest, SetPasswordQuery, SetPasswordRequest},
    utils::{extract_cookie, generate_reset_token, hash_password, normalize_email, valid_email},
};

const MSG_HASH_COOKIE_NAME: &str = "msg_hash";
const MIN_PASSWORD_LENGTH: usize = 8;

#[utoipa::path(
    post,
    path = "/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 204, description = "If the account exists a reset email was queued"),
        (status = 303, description = "Already authenticated, redirect to account")
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
    Json(request): Json<ForgotPasswordRequest>,
) -> impl IntoResponse {
    let context = match resolve_auth(&headers, peer, &pool).await {
        Ok(context) => context,
        Err(status) => return status.into_response(),
    };
    if let guard::AuthDecision::Redirect(route) =
        guard::evaluate(&ANONYMOUS_ONLY, context.session_login())
    {
        return guard::see_other(auth_state.config(), route);
    }

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return StatusCode::BAD_REQUEST.into_response();
    }

    // Always 204 with a cookie, whether or not the account exists; the
    // update later is what actually gates on the email.
    let token = match generate_reset_token() {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to generate reset token: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let digest = hash_msg(auth_state.server_secret(), &email, &token);

    let url = format!(
        "{}/set-password?email={email}&temp_token={token}",
        auth_state.config().frontend_base_url().trim_end_matches('/')
    );
    let message = EmailMessage {
        to_email: email,
        from_email: globals.mail_from.clone(),
        subject: "Forgot Password".to_string(),
        body: format!("Change Password: {url}\n Access page within the same browser window"),
    };
    if let Err(err) = enqueue_email(&pool, &message).await {
        error!("Failed to enqueue reset email: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let mut response_headers = HeaderMap::new();
    match msg_hash_cookie(auth_state.config(), &digest) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build msg_hash cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    info!("Password reset requested");
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/set-password",
    request_body = SetPasswordRequest,
    params(
        ("email" = String, Query, description = "Email from the reset link"),
        ("temp_token" = String, Query, description = "Token from the reset link")
    ),
    responses(
        (status = 204, description = "Password updated"),
        (status = 303, description = "Digest mismatch or expired, redirect to forgot-password")
    ),
    tag = "auth"
)]
pub async fn set_password(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Query(query): Query<SetPasswordQuery>,
    Json(request): Json<SetPasswordRequest>,
) -> impl IntoResponse {
    let context = match resolve_auth(&headers, peer, &pool).await {
        Ok(context) => context,
        Err(status) => return status.into_response(),
    };
    if let guard::AuthDecision::Redirect(route) =
        guard::evaluate(&ANONYMOUS_ONLY, context.session_login())
    {
        return guard::see_other(auth_state.config(), route);
    }

    // The cookie only exists in the browser that asked for the reset and
    // expires on its own; a missing cookie means start over.
    let Some(stored_digest) = extract_cookie(&headers, MSG_HASH_COOKIE_NAME) else {
        return guard::see_other(auth_state.config(), FORGOT_PASSWORD_ROUTE);
    };

    let email = normalize_email(&query.email);
    let expected = hash_msg(auth_state.server_secret(), &email, &query.temp_token);
    if !verify_hash(&stored_digest, &expected) {
        return guard::see_other(auth_state.config(), FORGOT_PASSWORD_ROUTE);
    }

    if request.password.len() < MIN_PASSWORD_LENGTH {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let password_hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match update_password(&pool, &email, &password_hash).await {
        Ok(true) => {
            info!("Password updated via reset link");
            let mut response_headers = HeaderMap::new();
            if let Ok(cookie) = clear_msg_hash_cookie(auth_state.config()) {
                response_headers.insert(SET_COOKIE, cookie);
            }
            (StatusCode::NO_CONTENT, response_headers).into_response()
        }
        // A valid digest for an unknown account means the email never had
        // one; send the caller back to the start of the flow.
        Ok(false) => guard::see_other(auth_state.config(), FORGOT_PASSWORD_ROUTE),
        Err(err) => {
            error!("Failed to update password: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Build the short-lived digest cookie for the reset handshake.
fn msg_hash_cookie(
    auth_config: &AuthConfig,
    digest: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = auth_config.reset_ttl_seconds();
    let secure = auth_config.cookie_secure();
    let mut cookie =
        format!("{MSG_HASH_COOKIE_NAME}={digest}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_msg_hash_cookie(
    auth_config: &AuthConfig,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = auth_config.cookie_secure();
    let mut cookie = format!("{MSG_HASH_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

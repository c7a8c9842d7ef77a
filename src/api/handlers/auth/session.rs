//! Session endpoints and the per-request auth context.

use axum::{
    extract::{ConnectInfo, Extension},
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
use tracing::error;

use super::{
    state::{AuthConfig, AuthState},
    storage::{delete_session, lookup_session, SessionRecord},
    types::SessionResponse,
    utils::{extract_cookie, hash_session_token, resolve_client_ip},
};

const SESSION_COOKIE_NAME: &str = "tasklane_session";

/// Resolved auth state for one request: the session row (if any) plus the
/// client IP the request arrived from.
pub(crate) struct AuthContext {
    pub(crate) record: Option<SessionRecord>,
    pub(crate) client_ip: String,
}

impl AuthContext {
    /// Full validity: logged in, MFA promoted, and bound to this client IP.
    pub(crate) fn session_login(&self) -> bool {
        self.record.as_ref().is_some_and(|record| {
            record.logged_in && record.mfa_verified && record.client_ip == self.client_ip
        })
    }

    /// Logged in but the one-time code has not been verified yet. Bound to
    /// the client IP like the full predicate; a pending cookie presented
    /// from elsewhere reveals nothing.
    pub(crate) fn pending_mfa(&self) -> bool {
        self.record.as_ref().is_some_and(|record| {
            record.logged_in && !record.mfa_verified && record.client_ip == self.client_ip
        })
    }
}

/// Resolve the session cookie and client IP into an [`AuthContext`].
///
/// Missing or unknown cookies yield an empty context, not an error.
pub(crate) async fn resolve_auth(
    headers: &HeaderMap,
    peer: SocketAddr,
    pool: &PgPool,
) -> Result<AuthContext, StatusCode> {
    let client_ip = resolve_client_ip(headers, peer);

    let Some(token) = extract_session_token(headers) else {
        return Ok(AuthContext {
            record: None,
            client_ip,
        });
    };

    // Only the hash is stored; never compare raw tokens against the database.
    let token_hash = hash_session_token(&token);
    match lookup_session(pool, &token_hash).await {
        Ok(record) => Ok(AuthContext { record, client_ip }),
        Err(err) => {
            error!("Failed to lookup session: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    pool: Extension<PgPool>,
) -> impl IntoResponse {
    let context = match resolve_auth(&headers, peer, &pool).await {
        Ok(context) => context,
        Err(status) => return status.into_response(),
    };

    // A session pending MFA is reported so the frontend can show the code
    // prompt; anything else is "no session".
    if context.session_login() || context.pending_mfa() {
        if let Some(record) = context.record {
            let response = SessionResponse {
                pending_mfa: !record.mfa_verified,
                email: record.user_email,
            };
            return (StatusCode::OK, Json(response)).into_response();
        }
    }

    StatusCode::NO_CONTENT.into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared; idempotent")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Unconditional: pending, promoted, or already-gone sessions all end up
    // in the same place, with the cookie cleared.
    if let Some(token) = extract_session_token(&headers) {
        let token_hash = hash_session_token(&token);
        if let Err(err) = delete_session(&pool, &token_hash).await {
            error!("Failed to delete session: {err}");
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Build a secure `HttpOnly` cookie for the session token.
pub(super) fn session_cookie(
    auth_state: &AuthState,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = auth_state.config().session_ttl_seconds();
    // Only mark cookies secure when the frontend is served over HTTPS.
    let secure = auth_state.config().cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_session_cookie(
    auth_config: &AuthConfig,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = auth_config.cookie_secure();
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    extract_cookie(headers, SESSION_COOKIE_NAME)
}

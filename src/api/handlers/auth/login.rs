//! Registration and password login (first factor).

use axum::{
    extract::{ConnectInfo, Extension},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
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
    guard::{self, ANONYMOUS_ONLY},
    password_reset::clear_msg_hash_cookie,
    session::{resolve_auth, session_cookie},
    state::AuthState,
    storage::{insert_session, insert_user, issue_otp, lookup_user, SignupOutcome},
    types::{LoginRequest, RegisterRequest},
    utils::{hash_password, normalize_email, valid_email, verify_password},
};

const MIN_PASSWORD_LENGTH: usize = 8;
const INVALID_CREDENTIALS: &str = "Invalid Credentials";

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered"),
        (status = 303, description = "Already authenticated, redirect to account")
    ),
    tag = "auth"
)]
pub async fn register(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    axum::Json(request): axum::Json<RegisterRequest>,
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
    if !valid_email(&email) || request.password.len() < MIN_PASSWORD_LENGTH {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let password_hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match insert_user(&pool, &email, &password_hash).await {
        Ok(SignupOutcome::Created) => {
            info!("New account registered");
            StatusCode::CREATED.into_response()
        }
        Ok(SignupOutcome::Conflict) => StatusCode::CONFLICT.into_response(),
        Err(err) => {
            error!("Failed to register user: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 204, description = "First factor accepted, one-time code emailed"),
        (status = 401, description = "Invalid credentials"),
        (status = 303, description = "Already authenticated, redirect to account")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
    axum::Json(request): axum::Json<LoginRequest>,
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

    // Unknown email and wrong password are indistinguishable to the caller.
    let user = match lookup_user(&pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS).into_response();
        }
        Err(err) => {
            error!("Failed to lookup user: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !verify_password(&request.password, &user.password_hash) {
        return (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS).into_response();
    }

    // The session is bound to the IP that passed the first factor; the
    // one-time code check later runs against the same binding.
    let token = match insert_session(
        &pool,
        &user.email,
        &context.client_ip,
        auth_state.config().session_ttl_seconds(),
    )
    .await
    {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to insert session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let code = match issue_otp(&pool, &user.email, auth_state.config().otp_ttl_seconds()).await {
        Ok(code) => code,
        Err(err) => {
            error!("Failed to issue one-time code: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let ttl_minutes = auth_state.config().otp_ttl_seconds() / 60;
    let message = EmailMessage {
        to_email: user.email.clone(),
        from_email: globals.mail_from.clone(),
        subject: "Your one-time code".to_string(),
        body: format!("Your one-time code is: {code}\nIt expires in {ttl_minutes} minutes"),
    };
    if let Err(err) = enqueue_email(&pool, &message).await {
        error!("Failed to enqueue one-time code email: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let mut response_headers = HeaderMap::new();
    match session_cookie(&auth_state, &token) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    // A fresh login invalidates any in-flight password reset handshake.
    if let Ok(cookie) = clear_msg_hash_cookie(auth_state.config()) {
        response_headers.append(SET_COOKIE, cookie);
    }

    (StatusCode::NO_CONTENT, response_headers).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::state::AuthConfig;
    use axum::{extract::ConnectInfo, Extension, Json};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::net::{IpAddr, Ipv4Addr};

    fn peer() -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            443,
        ))
    }

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy("postgres://postgres@127.0.0.1:1/unreachable")
            .expect("lazy pool")
    }

    fn auth_state() -> Arc<AuthState> {
        Arc::new(AuthState::new(
            AuthConfig::new("https://tasklane.dev".to_string()),
            SecretString::from("secret"),
        ))
    }

    #[tokio::test]
    async fn register_rejects_invalid_email_before_touching_storage() {
        let response = register(
            HeaderMap::new(),
            peer(),
            Extension(lazy_pool()),
            Extension(auth_state()),
            Json(RegisterRequest {
                email: "not-an-email".to_string(),
                password: "long-enough-password".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_short_password_before_touching_storage() {
        let response = register(
            HeaderMap::new(),
            peer(),
            Extension(lazy_pool()),
            Extension(auth_state()),
            Json(RegisterRequest {
                email: "a@example.com".to_string(),
                password: "short".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

//! One-time code verification (second factor).

use axum::{
    extract::{ConnectInfo, Extension},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::net::SocketAddr;
use tracing::{error, info};

use super::{
    session::{extract_session_token, resolve_auth},
    storage::{consume_otp, promote_session, record_otp_miss},
    types::MfaRequest,
    utils::hash_session_token,
};

#[utoipa::path(
    post,
    path = "/v1/auth/mfa",
    request_body = MfaRequest,
    responses(
        (status = 204, description = "Code accepted, session promoted"),
        (status = 401, description = "No pending session or invalid code")
    ),
    tag = "auth"
)]
pub async fn mfa(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    pool: Extension<PgPool>,
    Json(request): Json<MfaRequest>,
) -> impl IntoResponse {
    let context = match resolve_auth(&headers, peer, &pool).await {
        Ok(context) => context,
        Err(status) => return status.into_response(),
    };

    // Only a pending session from the IP that passed the first factor may
    // present a code.
    let pending = context
        .record
        .as_ref()
        .filter(|record| {
            record.logged_in && !record.mfa_verified && record.client_ip == context.client_ip
        })
        .map(|record| record.user_email.clone());

    let Some(user_email) = pending else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    // The challenge is deleted on first use; a replayed code finds nothing.
    match consume_otp(&pool, request.code.trim(), &user_email).await {
        Ok(true) => {}
        Ok(false) => {
            // Wrong codes burn the attempt budget; the challenge is revoked
            // once it runs out.
            if let Err(err) = record_otp_miss(&pool, &user_email).await {
                error!("Failed to record code miss: {err}");
            }
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Err(err) => {
            error!("Failed to consume one-time code: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let Some(token) = extract_session_token(&headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let token_hash = hash_session_token(&token);
    match promote_session(&pool, &token_hash).await {
        Ok(true) => {
            info!("Session promoted after code verification");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Failed to promote session: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::ConnectInfo, Extension, Json};
    use sqlx::postgres::PgPoolOptions;
    use std::net::{IpAddr, Ipv4Addr};

    #[tokio::test]
    async fn mfa_without_session_cookie_is_unauthorized() {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy("postgres://postgres@127.0.0.1:1/unreachable")
            .expect("lazy pool");
        let peer = ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            443,
        ));

        let response = mfa(
            HeaderMap::new(),
            peer,
            Extension(pool),
            Json(MfaRequest {
                code: "123456".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

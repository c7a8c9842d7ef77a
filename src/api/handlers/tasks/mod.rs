//! Task CRUD endpoints.
//!
//! All routes require a fully verified session. Creates and edits hand
//! `(previous, current)` task state to the notification bridge so the
//! one-off reminder job tracks what was actually written.

pub(crate) mod storage;
pub(crate) mod types;

use axum::{
    extract::{ConnectInfo, Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::{
    cli::globals::GlobalArgs,
    scheduler::{bridge::schedule_notification, models::IntervalSpec},
};

use super::auth::{
    guard::{self, AUTHENTICATED_ONLY},
    session::resolve_auth,
    AuthState,
};
use storage::{delete_task, get_task, insert_task, list_tasks, update_task, TaskRecord};
use types::{TaskRequest, TaskResponse};

fn response_from(record: TaskRecord) -> TaskResponse {
    TaskResponse {
        id: record.id.to_string(),
        title: record.title,
        description: record.description,
        complete: record.complete,
        notify: record.notify,
        period: record.period,
        created_at: record.created_at,
    }
}

fn valid_request(request: &TaskRequest) -> bool {
    if request.title.trim().is_empty() {
        return false;
    }
    // Rejects half-specified or unknown schedules before anything is stored.
    IntervalSpec::from_parts(request.notify, request.period.as_deref()).is_ok()
}

/// Resolve the request into the owning user, or the error/redirect response.
async fn require_user(
    headers: &HeaderMap,
    peer: SocketAddr,
    pool: &PgPool,
    auth_state: &AuthState,
) -> Result<String, axum::response::Response> {
    let context = match resolve_auth(headers, peer, pool).await {
        Ok(context) => context,
        Err(status) => return Err(status.into_response()),
    };
    if let guard::AuthDecision::Redirect(route) =
        guard::evaluate(&AUTHENTICATED_ONLY, context.session_login())
    {
        return Err(guard::see_other(auth_state.config(), route));
    }
    context
        .record
        .map(|record| record.user_email)
        .ok_or_else(|| StatusCode::UNAUTHORIZED.into_response())
}

#[utoipa::path(
    get,
    path = "/v1/tasks",
    responses(
        (status = 200, description = "The user's tasks, incomplete first", body = [TaskResponse]),
        (status = 303, description = "Not authenticated, redirect to login")
    ),
    tag = "tasks"
)]
pub async fn list(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let user_email = match require_user(&headers, peer, &pool, &auth_state).await {
        Ok(user_email) => user_email,
        Err(response) => return response,
    };

    match list_tasks(&pool, &user_email).await {
        Ok(records) => {
            let tasks: Vec<TaskResponse> = records.into_iter().map(response_from).collect();
            (StatusCode::OK, Json(tasks)).into_response()
        }
        Err(err) => {
            error!("Failed to list tasks: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/tasks",
    request_body = TaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Invalid title or schedule"),
        (status = 303, description = "Not authenticated, redirect to login")
    ),
    tag = "tasks"
)]
pub async fn create(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
    Json(request): Json<TaskRequest>,
) -> impl IntoResponse {
    let user_email = match require_user(&headers, peer, &pool, &auth_state).await {
        Ok(user_email) => user_email,
        Err(response) => return response,
    };

    if !valid_request(&request) {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let record = match insert_task(&pool, &user_email, &request).await {
        Ok(record) => record,
        Err(err) => {
            error!("Failed to insert task: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Err(err) = schedule_notification(
        &pool,
        None,
        &record.snapshot(),
        &globals.mail_from,
        &globals.notify_to,
    )
    .await
    {
        error!("Failed to schedule notification: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (StatusCode::CREATED, Json(response_from(record))).into_response()
}

#[utoipa::path(
    put,
    path = "/v1/tasks/{id}",
    request_body = TaskRequest,
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Invalid title or schedule"),
        (status = 404, description = "No such task for this user"),
        (status = 303, description = "Not authenticated, redirect to login")
    ),
    tag = "tasks"
)]
pub async fn update(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
    Path(id): Path<Uuid>,
    Json(request): Json<TaskRequest>,
) -> impl IntoResponse {
    let user_email = match require_user(&headers, peer, &pool, &auth_state).await {
        Ok(user_email) => user_email,
        Err(response) => return response,
    };

    if !valid_request(&request) {
        return StatusCode::BAD_REQUEST.into_response();
    }

    // Snapshot before the write; the bridge needs the previous schedule to
    // know whether an existing job must be replaced.
    let previous = match get_task(&pool, &user_email, id).await {
        Ok(Some(record)) => record,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to get task: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let record = match update_task(&pool, &user_email, id, &request).await {
        Ok(Some(record)) => record,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update task: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Err(err) = schedule_notification(
        &pool,
        Some(&previous.snapshot()),
        &record.snapshot(),
        &globals.mail_from,
        &globals.notify_to,
    )
    .await
    {
        error!("Failed to schedule notification: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (StatusCode::OK, Json(response_from(record))).into_response()
}

#[utoipa::path(
    delete,
    path = "/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "No such task for this user"),
        (status = 303, description = "Not authenticated, redirect to login")
    ),
    tag = "tasks"
)]
pub async fn delete(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let user_email = match require_user(&headers, peer, &pool, &auth_state).await {
        Ok(user_email) => user_email,
        Err(response) => return response,
    };

    match delete_task(&pool, &user_email, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to delete task: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(
        title: &str,
        notify: Option<i32>,
        period: Option<&str>,
    ) -> TaskRequest {
        TaskRequest {
            title: title.to_string(),
            description: String::new(),
            complete: false,
            notify,
            period: period.map(std::string::ToString::to_string),
        }
    }

    #[test]
    fn valid_request_requires_title() {
        assert!(!valid_request(&request("   ", None, None)));
        assert!(valid_request(&request("standup", None, None)));
    }

    #[test]
    fn valid_request_requires_schedule_pair() {
        assert!(valid_request(&request("standup", Some(10), Some("minutes"))));
        assert!(!valid_request(&request("standup", Some(10), None)));
        assert!(!valid_request(&request("standup", None, Some("minutes"))));
        assert!(!valid_request(&request("standup", Some(10), Some("fortnights"))));
        assert!(!valid_request(&request("standup", Some(0), Some("minutes"))));
    }
}

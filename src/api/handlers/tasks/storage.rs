//! Database helpers for tasks.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::TaskRequest;
use crate::scheduler::models::TaskSnapshot;

/// Task row as stored, including the scheduling columns the bridge reads.
pub(crate) struct TaskRecord {
    pub(crate) id: Uuid,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) complete: bool,
    pub(crate) notify: Option<i32>,
    pub(crate) period: Option<String>,
    pub(crate) created_at: String,
}

impl TaskRecord {
    /// View of the fields the notification bridge cares about.
    pub(crate) fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            notify: self.notify,
            period: self.period.clone(),
        }
    }
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> TaskRecord {
    TaskRecord {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        complete: row.get("complete"),
        notify: row.get("notify"),
        period: row.get("period"),
        created_at: row.get("created_at"),
    }
}

/// List the user's tasks, incomplete before complete, oldest first within
/// each group.
pub(super) async fn list_tasks(pool: &PgPool, user_email: &str) -> Result<Vec<TaskRecord>> {
    let query = r"
        SELECT id, title, description, complete, notify, period,
               created_at::text AS created_at
        FROM tasks
        WHERE user_email = $1
        ORDER BY complete, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_email)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list tasks")?;

    Ok(rows.iter().map(record_from_row).collect())
}

/// Fetch one of the user's tasks. Ownership is part of the lookup key.
pub(super) async fn get_task(
    pool: &PgPool,
    user_email: &str,
    task_id: Uuid,
) -> Result<Option<TaskRecord>> {
    let query = r"
        SELECT id, title, description, complete, notify, period,
               created_at::text AS created_at
        FROM tasks
        WHERE id = $1
          AND user_email = $2
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(task_id)
        .bind(user_email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to get task")?;

    Ok(row.as_ref().map(record_from_row))
}

pub(super) async fn insert_task(
    pool: &PgPool,
    user_email: &str,
    request: &TaskRequest,
) -> Result<TaskRecord> {
    let query = r"
        INSERT INTO tasks (id, user_email, title, description, complete, notify, period)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, title, description, complete, notify, period,
                  created_at::text AS created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(Uuid::new_v4())
        .bind(user_email)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.complete)
        .bind(request.notify)
        .bind(&request.period)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert task")?;

    Ok(record_from_row(&row))
}

/// Replace the user's task. Returns the updated row, or `None` when the id
/// does not exist or belongs to another user.
pub(super) async fn update_task(
    pool: &PgPool,
    user_email: &str,
    task_id: Uuid,
    request: &TaskRequest,
) -> Result<Option<TaskRecord>> {
    let query = r"
        UPDATE tasks
        SET title = $3,
            description = $4,
            complete = $5,
            notify = $6,
            period = $7
        WHERE id = $1
          AND user_email = $2
        RETURNING id, title, description, complete, notify, period,
                  created_at::text AS created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(task_id)
        .bind(user_email)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.complete)
        .bind(request.notify)
        .bind(&request.period)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update task")?;

    Ok(row.as_ref().map(record_from_row))
}

/// Delete the user's task. Returns false when nothing matched.
pub(super) async fn delete_task(pool: &PgPool, user_email: &str, task_id: Uuid) -> Result<bool> {
    let query = r"
        DELETE FROM tasks
        WHERE id = $1
          AND user_email = $2
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(task_id)
        .bind(user_email)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete task")?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::TaskRecord;
    use uuid::Uuid;

    #[test]
    fn snapshot_carries_schedule_fields() {
        let record = TaskRecord {
            id: Uuid::nil(),
            title: "standup".to_string(),
            description: "daily sync".to_string(),
            complete: false,
            notify: Some(10),
            period: Some("minutes".to_string()),
            created_at: "2026-01-01 00:00:00+00".to_string(),
        };
        let snapshot = record.snapshot();
        assert_eq!(snapshot.task_id, Uuid::nil());
        assert_eq!(snapshot.title, "standup");
        assert_eq!(snapshot.notify, Some(10));
        assert_eq!(snapshot.period.as_deref(), Some("minutes"));
    }
}

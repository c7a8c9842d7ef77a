//! Database-backed tests for the notification bridge invariants.
//!
//! These need a reachable Postgres; they skip silently when
//! `TASKLANE_TEST_DSN` is unset.

use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::test_db;

use super::{bridge::schedule_notification, models::TaskSnapshot};

const MAIL_FROM: &str = "notify@tasklane.dev";
const MAIL_TO: &str = "inbox@tasklane.dev";

fn snapshot(task_id: Uuid, notify: Option<i32>, period: Option<&str>) -> TaskSnapshot {
    TaskSnapshot {
        task_id,
        title: "standup".to_string(),
        description: "daily reminder".to_string(),
        notify,
        period: period.map(str::to_string),
    }
}

async fn job_count(pool: &PgPool, task_id: Uuid) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS jobs FROM notification_jobs WHERE task_id = $1")
        .bind(task_id)
        .fetch_one(pool)
        .await?;
    Ok(row.get("jobs"))
}

#[tokio::test]
async fn repeated_edits_keep_a_single_job() -> Result<()> {
    let Some(pool) = test_db::connect().await? else {
        return Ok(());
    };
    let task_id = Uuid::new_v4();

    let created = snapshot(task_id, Some(10), Some("minutes"));
    schedule_notification(&pool, None, &created, MAIL_FROM, MAIL_TO).await?;
    assert_eq!(job_count(&pool, task_id).await?, 1);

    // Each edit replaces the job; the count never grows.
    let edited = snapshot(task_id, Some(2), Some("hours"));
    schedule_notification(&pool, Some(&created), &edited, MAIL_FROM, MAIL_TO).await?;
    assert_eq!(job_count(&pool, task_id).await?, 1);

    let edited_again = snapshot(task_id, Some(1), Some("days"));
    schedule_notification(&pool, Some(&edited), &edited_again, MAIL_FROM, MAIL_TO).await?;
    assert_eq!(job_count(&pool, task_id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn removing_the_schedule_removes_the_job() -> Result<()> {
    let Some(pool) = test_db::connect().await? else {
        return Ok(());
    };
    let task_id = Uuid::new_v4();

    let created = snapshot(task_id, Some(5), Some("minutes"));
    schedule_notification(&pool, None, &created, MAIL_FROM, MAIL_TO).await?;
    assert_eq!(job_count(&pool, task_id).await?, 1);

    let cleared = snapshot(task_id, None, None);
    schedule_notification(&pool, Some(&created), &cleared, MAIL_FROM, MAIL_TO).await?;
    assert_eq!(job_count(&pool, task_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn missing_job_on_edit_is_an_error() -> Result<()> {
    let Some(pool) = test_db::connect().await? else {
        return Ok(());
    };
    let task_id = Uuid::new_v4();

    let created = snapshot(task_id, Some(5), Some("minutes"));
    schedule_notification(&pool, None, &created, MAIL_FROM, MAIL_TO).await?;

    // Simulate the inconsistency: the job vanished out from under the task.
    sqlx::query("DELETE FROM notification_jobs WHERE task_id = $1")
        .bind(task_id)
        .execute(&pool)
        .await?;

    let edited = snapshot(task_id, Some(2), Some("hours"));
    let result = schedule_notification(&pool, Some(&created), &edited, MAIL_FROM, MAIL_TO).await;
    assert!(result.is_err());

    Ok(())
}

#[tokio::test]
async fn interval_schedules_are_shared_across_tasks() -> Result<()> {
    let Some(pool) = test_db::connect().await? else {
        return Ok(());
    };

    for _ in 0..2 {
        let task = snapshot(Uuid::new_v4(), Some(37), Some("minutes"));
        schedule_notification(&pool, None, &task, MAIL_FROM, MAIL_TO).await?;
    }

    let row = sqlx::query(
        "SELECT COUNT(*) AS schedules FROM interval_schedules WHERE every = 37 AND period = 'minutes'",
    )
    .fetch_one(&pool)
    .await?;
    let schedules: i64 = row.get("schedules");
    assert_eq!(schedules, 1);

    Ok(())
}

//! Post-write bridge from task state to one-off notification jobs.
//!
//! Invoked synchronously after every task create or edit with the previous
//! and current task state. The bridge keeps at most one live job per task:
//! edits delete the existing job before inserting the replacement, and a
//! task without scheduling columns ends up with no job at all.

use anyhow::{anyhow, bail, Context, Result};
use rand::{rngs::OsRng, Rng};
use sqlx::{PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::models::{IntervalSpec, TaskSnapshot};

/// Generate a job name. Uniqueness is enforced by the database; the random
/// prefix makes collisions improbable and retries cheap.
pub(crate) fn job_name() -> String {
    let prefix: u32 = OsRng.gen();
    format!("{prefix}task")
}

/// Reconcile the task's notification job with its just-written state.
///
/// `previous` is `None` on the create path. On the edit path a missing job
/// for a task that was scheduled is a data inconsistency and propagates as
/// an error instead of being masked.
pub async fn schedule_notification(
    pool: &PgPool,
    previous: Option<&TaskSnapshot>,
    current: &TaskSnapshot,
    mail_from: &str,
    mail_to: &str,
) -> Result<()> {
    let current_interval = current.interval()?;

    let mut tx = pool.begin().await.context("begin bridge transaction")?;

    if let Some(previous) = previous {
        let deleted = delete_job_for_task(&mut tx, previous.task_id).await?;
        if previous.interval()?.is_some() && deleted == 0 {
            bail!(
                "no notification job found for edited task {}",
                previous.task_id
            );
        }
    }

    if let Some(interval) = current_interval {
        let schedule_id = get_or_create_schedule(&mut tx, interval).await?;
        insert_job(&mut tx, schedule_id, current, interval, mail_from, mail_to).await?;
    }

    tx.commit().await.context("commit bridge transaction")?;
    Ok(())
}

/// Idempotent get-or-create on `(every, period)`.
async fn get_or_create_schedule(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    interval: IntervalSpec,
) -> Result<i64> {
    let query = r"
        INSERT INTO interval_schedules (every, period)
        VALUES ($1, $2)
        ON CONFLICT (every, period) DO NOTHING
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(interval.every)
        .bind(interval.unit.as_str())
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert interval schedule")?;

    let query = r"
        SELECT id
        FROM interval_schedules
        WHERE every = $1
          AND period = $2
        LIMIT 1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(interval.every)
        .bind(interval.unit.as_str())
        .fetch_one(&mut **tx)
        .instrument(span)
        .await
        .context("failed to select interval schedule")?;

    Ok(row.get("id"))
}

/// Remove the task's job, returning how many rows went away.
async fn delete_job_for_task(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    task_id: Uuid,
) -> Result<u64> {
    let query = "DELETE FROM notification_jobs WHERE task_id = $1";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(task_id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to delete notification job")?;

    Ok(result.rows_affected())
}

async fn insert_job(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    schedule_id: i64,
    task: &TaskSnapshot,
    interval: IntervalSpec,
    mail_from: &str,
    mail_to: &str,
) -> Result<()> {
    let query = r"
        INSERT INTO notification_jobs
            (id, name, schedule_id, task_id, one_off, enabled,
             subject, body, mail_from, mail_to, run_at)
        VALUES ($1, $2, $3, $4, TRUE, TRUE, $5, $6, $7, $8,
                NOW() + ($9 * INTERVAL '1 second'))
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    let subject = format!("Notification for: {}", task.title);

    for _ in 0..3 {
        let result = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(job_name())
            .bind(schedule_id)
            .bind(task.task_id)
            .bind(&subject)
            .bind(&task.description)
            .bind(mail_from)
            .bind(mail_to)
            .bind(interval.total_seconds())
            .execute(&mut **tx)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => return Ok(()),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert notification job"),
        }
    }

    Err(anyhow!("failed to generate unique job name"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

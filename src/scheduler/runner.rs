//! Background runner that fires due notification jobs.
//!
//! The runner polls `notification_jobs` for enabled one-off rows whose
//! `run_at` has passed, locks a batch via `FOR UPDATE SKIP LOCKED`, hands
//! each job to the email outbox, and disables the job in the same
//! transaction so it fires exactly once.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::api::email::{enqueue_email_tx, EmailMessage};

#[derive(Clone, Copy, Debug)]
pub struct NotificationRunnerConfig {
    poll_interval: Duration,
    batch_size: usize,
}

impl NotificationRunnerConfig {
    /// Default runner config: 5s poll interval, 10 jobs per batch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 10,
        }
    }

    #[must_use]
    pub fn with_poll_interval_seconds(mut self, seconds: u64) -> Self {
        self.poll_interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn normalize(self) -> Self {
        let poll_interval = if self.poll_interval.is_zero() {
            Duration::from_secs(1)
        } else {
            self.poll_interval
        };
        let batch_size = if self.batch_size == 0 {
            1
        } else {
            self.batch_size
        };
        Self {
            poll_interval,
            batch_size,
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Default for NotificationRunnerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the background task that polls and fires due notification jobs.
pub fn spawn_notification_runner(
    pool: PgPool,
    config: NotificationRunnerConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let config = config.normalize();
        let poll_interval = config.poll_interval();

        loop {
            match process_due_jobs(&pool, &config).await {
                Ok(fired) if fired > 0 => {
                    info!(fired, "notification jobs fired");
                }
                Ok(_) => {}
                Err(err) => {
                    error!("notification batch failed: {err}");
                }
            }

            sleep(poll_interval).await;
        }
    })
}

async fn process_due_jobs(pool: &PgPool, config: &NotificationRunnerConfig) -> Result<usize> {
    let mut tx = pool
        .begin()
        .await
        .context("failed to start notification transaction")?;

    // Lock the batch so concurrent runners never fire the same job twice.
    let query = r"
        SELECT id, subject, body, mail_from, mail_to
        FROM notification_jobs
        WHERE enabled
          AND one_off
          AND run_at <= NOW()
        ORDER BY run_at ASC
        LIMIT $1
        FOR UPDATE SKIP LOCKED
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(i64::try_from(config.batch_size()).unwrap_or(0))
        .fetch_all(&mut *tx)
        .instrument(span)
        .await
        .context("failed to load due notification jobs")?;

    if rows.is_empty() {
        tx.commit()
            .await
            .context("failed to commit empty notification batch")?;
        return Ok(0);
    }

    let row_count = rows.len();
    for row in rows {
        let id: Uuid = row.get("id");
        let message = EmailMessage {
            to_email: row.get("mail_to"),
            from_email: row.get("mail_from"),
            subject: row.get("subject"),
            body: row.get("body"),
        };

        // Enqueue and disable atomically: the one-off job is consumed in
        // the same transaction that hands its email to the outbox.
        enqueue_email_tx(&mut tx, &message).await?;
        disable_job(&mut tx, id).await?;
    }

    tx.commit()
        .await
        .context("failed to commit notification batch")?;

    Ok(row_count)
}

async fn disable_job(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, id: Uuid) -> Result<()> {
    let query = r"
        UPDATE notification_jobs
        SET enabled = FALSE
        WHERE id = $1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to disable notification job")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_fixes_zero_values() {
        let config = NotificationRunnerConfig::new()
            .with_poll_interval_seconds(0)
            .with_batch_size(0)
            .normalize();

        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.batch_size(), 1);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = NotificationRunnerConfig::new()
            .with_poll_interval_seconds(30)
            .with_batch_size(50);

        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.batch_size(), 50);
    }
}

//! Shared Postgres harness for database-backed tests.
//!
//! Tests connect to the database named by `TASKLANE_TEST_DSN` and skip
//! silently when the variable is unset, so the suite stays green on
//! machines without a reachable Postgres.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/db/schema.sql"));

/// Connect to the test database and apply the schema.
///
/// Returns `None` when `TASKLANE_TEST_DSN` is unset; callers treat that as
/// a skipped test. The schema is idempotent, so repeated applications and
/// concurrent tests sharing one database are fine.
pub(crate) async fn connect() -> Result<Option<PgPool>> {
    let Ok(dsn) = std::env::var("TASKLANE_TEST_DSN") else {
        eprintln!("Skipping database test: TASKLANE_TEST_DSN is not set");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&dsn)
        .await
        .context("failed to connect test pool")?;

    for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
    }

    Ok(Some(pool))
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

#[cfg(test)]
mod tests {
    use super::split_sql_statements;

    #[test]
    fn split_drops_comments_and_keeps_statements() {
        let sql = "-- a comment\nCREATE TABLE t (\n    id INT\n);\nCREATE INDEX i ON t (id);\n";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE"));
        assert!(statements[1].starts_with("CREATE INDEX"));
    }

    #[test]
    fn schema_splits_into_statements() {
        let statements = split_sql_statements(super::SCHEMA_SQL);
        assert!(statements.len() >= 7);
        assert!(statements.iter().all(|statement| statement.ends_with(';')));
    }
}

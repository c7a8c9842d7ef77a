//! Database helpers for users, sessions, and one-time codes.

use anyhow::{anyhow, Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::utils::{
    generate_otp_code, generate_session_token, hash_otp_code, hash_session_token,
    is_unique_violation,
};

/// Outcome when attempting to create a new user record.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created,
    Conflict,
}

/// Credential fields needed to check a login attempt.
pub(super) struct UserRecord {
    pub(super) email: String,
    pub(super) password_hash: String,
}

/// Session row as stored; validity predicates live on this struct.
pub(crate) struct SessionRecord {
    pub(crate) user_email: String,
    pub(crate) client_ip: String,
    pub(crate) logged_in: bool,
    pub(crate) mfa_verified: bool,
}

/// Look up credential data by normalized email.
pub(super) async fn lookup_user(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = "SELECT email, password_hash FROM users WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user")?;

    Ok(row.map(|row| UserRecord {
        email: row.get("email"),
        password_hash: row.get("password_hash"),
    }))
}

pub(super) async fn insert_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<SignupOutcome> {
    let query = r"
        INSERT INTO users (email, password_hash)
        VALUES ($1, $2)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await;

    match result {
        Ok(_) => Ok(SignupOutcome::Created),
        Err(err) if is_unique_violation(&err) => Ok(SignupOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Replace a user's password hash. Returns false when the email is unknown.
pub(super) async fn update_password(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<bool> {
    let query = r"
        UPDATE users
        SET password_hash = $2
        WHERE email = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password")?;

    Ok(result.rows_affected() > 0)
}

/// Create a pending session bound to the resolved client IP.
///
/// The session starts with `logged_in = TRUE` and no MFA timestamp; only
/// `promote_session` makes it valid for protected routes. The raw token is
/// returned so the caller can set the cookie; only the hash is stored.
pub(super) async fn insert_session(
    pool: &PgPool,
    user_email: &str,
    client_ip: &str,
    ttl_seconds: i64,
) -> Result<String> {
    let query = r"
        INSERT INTO user_sessions
            (session_hash, user_email, client_ip, logged_in, expires_at)
        VALUES ($1, $2, $3, TRUE, NOW() + ($4 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(user_email)
            .bind(client_ip)
            .bind(ttl_seconds)
            .execute(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => return Ok(token),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to generate unique session token"))
}

/// Fetch an unexpired session row by token hash.
pub(crate) async fn lookup_session(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<SessionRecord>> {
    let query = r"
        SELECT user_email, client_ip, logged_in,
               mfa_verified_at IS NOT NULL AS mfa_verified
        FROM user_sessions
        WHERE session_hash = $1
          AND expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    Ok(row.map(|row| SessionRecord {
        user_email: row.get("user_email"),
        client_ip: row.get("client_ip"),
        logged_in: row.get("logged_in"),
        mfa_verified: row.get("mfa_verified"),
    }))
}

pub(super) async fn delete_session(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    // Logout is idempotent; it's fine if no rows are deleted.
    let query = "DELETE FROM user_sessions WHERE session_hash = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete session")?;
    Ok(())
}

/// Mark the session as MFA-verified. Returns false when the session is gone
/// or already expired.
pub(super) async fn promote_session(pool: &PgPool, token_hash: &[u8]) -> Result<bool> {
    let query = r"
        UPDATE user_sessions
        SET mfa_verified_at = NOW()
        WHERE session_hash = $1
          AND logged_in
          AND expires_at > NOW()
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to promote session")?;

    Ok(result.rows_affected() > 0)
}

/// Issue a fresh one-time code for the user, superseding any live challenge.
///
/// Returns the raw six-digit code for the notification email; the database
/// only sees its hash.
pub(super) async fn issue_otp(pool: &PgPool, user_email: &str, ttl_seconds: i64) -> Result<String> {
    // Delete-then-insert keeps at most one live challenge per user.
    let mut tx = pool.begin().await.context("begin otp transaction")?;

    let query = "DELETE FROM otp_challenges WHERE user_email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_email)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to delete previous otp challenges")?;

    let query = r"
        INSERT INTO otp_challenges (code_hash, user_email, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let code = generate_otp_code();
        let code_hash = hash_otp_code(&code);
        let result = sqlx::query(query)
            .bind(code_hash)
            .bind(user_email)
            .bind(ttl_seconds)
            .execute(&mut *tx)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => {
                tx.commit().await.context("commit otp transaction")?;
                return Ok(code);
            }
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert otp challenge"),
        }
    }

    Err(anyhow!("failed to generate unique otp code"))
}

/// Failed verifications allowed before the challenge is revoked. A six-digit
/// code must not be guessable by hammering the endpoint within its TTL.
pub(super) const MAX_OTP_ATTEMPTS: i32 = 5;

/// Count a failed code check against the user's live challenge, revoking it
/// once the attempt budget is spent.
pub(super) async fn record_otp_miss(pool: &PgPool, user_email: &str) -> Result<()> {
    let mut tx = pool.begin().await.context("begin otp miss transaction")?;

    let query = r"
        UPDATE otp_challenges
        SET attempts = attempts + 1
        WHERE user_email = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_email)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to record otp miss")?;

    let query = r"
        DELETE FROM otp_challenges
        WHERE user_email = $1
          AND attempts >= $2
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_email)
        .bind(MAX_OTP_ATTEMPTS)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to revoke exhausted otp challenge")?;

    tx.commit().await.context("commit otp miss transaction")?;
    Ok(())
}

/// Consume a live challenge for the user. The DELETE .. RETURNING makes the
/// verification exactly-once; a replayed code finds no row.
pub(super) async fn consume_otp(pool: &PgPool, code: &str, user_email: &str) -> Result<bool> {
    let code_hash = hash_otp_code(code);

    let query = r"
        DELETE FROM otp_challenges
        WHERE code_hash = $1
          AND user_email = $2
          AND expires_at > NOW()
        RETURNING user_email
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(code_hash)
        .bind(user_email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume otp challenge")?;

    Ok(row.is_some())
}

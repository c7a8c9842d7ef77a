//! # Tasklane
//!
//! `tasklane` is a small multi-user task management service. It exposes a JSON
//! HTTP API for registration, password + one-time-code (MFA) login, session
//! management, password reset, and per-user tasks with scheduled email
//! notifications.
//!
//! ## Authentication
//!
//! Login is a two-step state machine: a password check establishes a pending
//! session bound to the client IP, and a one-time code sent by email promotes
//! it to a fully authenticated session. A session is only valid for protected
//! routes when the request's resolved client IP matches the IP recorded at
//! login time.
//!
//! ## Notifications
//!
//! Every task save runs the scheduler bridge synchronously: it resolves an
//! interval schedule, replaces the task's single live one-off notification
//! job, and a background runner later turns due jobs into outbox emails.
//! Email delivery goes through a DB-backed outbox with retry and backoff.

pub mod api;
pub mod cli;
pub mod scheduler;
#[cfg(test)]
pub(crate) mod test_db;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}

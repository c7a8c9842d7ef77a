use crate::{
    api,
    api::handlers::auth::AuthConfig,
    cli::globals::GlobalArgs,
    scheduler::runner::NotificationRunnerConfig,
};
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub server_secret: SecretString,
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub otp_ttl_seconds: i64,
    pub reset_ttl_seconds: i64,
    pub mail_from: String,
    pub notify_to: String,
    pub outbox_poll_seconds: u64,
    pub outbox_batch_size: usize,
    pub outbox_max_attempts: u32,
    pub outbox_backoff_base_seconds: u64,
    pub outbox_backoff_max_seconds: u64,
    pub notify_poll_seconds: u64,
    pub notify_batch_size: usize,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let globals = GlobalArgs::new(args.server_secret, args.mail_from, args.notify_to);

    let auth_config = AuthConfig::new(args.frontend_base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_otp_ttl_seconds(args.otp_ttl_seconds)
        .with_reset_ttl_seconds(args.reset_ttl_seconds);

    let email_config = api::email::EmailWorkerConfig::new()
        .with_poll_interval_seconds(args.outbox_poll_seconds)
        .with_batch_size(args.outbox_batch_size)
        .with_max_attempts(args.outbox_max_attempts)
        .with_backoff_base_seconds(args.outbox_backoff_base_seconds)
        .with_backoff_max_seconds(args.outbox_backoff_max_seconds);

    let runner_config = NotificationRunnerConfig::new()
        .with_poll_interval_seconds(args.notify_poll_seconds)
        .with_batch_size(args.notify_batch_size);

    api::new(
        args.port,
        args.dsn,
        globals,
        auth_config,
        email_config,
        runner_config,
    )
    .await
}

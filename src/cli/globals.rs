use secrecy::SecretString;

/// Process-wide settings shared with request handlers and workers.
///
/// The server secret keys the password-reset digest and is kept in a
/// `SecretString` so it never shows up in Debug output or logs.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub server_secret: SecretString,
    pub mail_from: String,
    pub notify_to: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(server_secret: SecretString, mail_from: String, notify_to: String) -> Self {
        Self {
            server_secret,
            mail_from,
            notify_to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(
            SecretString::from("s3cret"),
            "notify@tasklane.dev".to_string(),
            "inbox@tasklane.dev".to_string(),
        );
        assert_eq!(args.server_secret.expose_secret(), "s3cret");
        assert_eq!(args.mail_from, "notify@tasklane.dev");
        assert_eq!(args.notify_to, "inbox@tasklane.dev");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let args = GlobalArgs::new(
            SecretString::from("s3cret"),
            "notify@tasklane.dev".to_string(),
            "inbox@tasklane.dev".to_string(),
        );
        let debug = format!("{args:?}");
        assert!(!debug.contains("s3cret"));
    }
}

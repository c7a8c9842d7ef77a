//! Route guard: a pure decision over session validity.
//!
//! Handlers pass the already-resolved auth state through `evaluate` before
//! doing any work. The guard only redirects when a target is configured for
//! the observed state; with no target the handler runs regardless of auth
//! state. It never denies by itself.

use axum::{
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
};

use super::state::AuthConfig;

pub(crate) const ACCOUNT_ROUTE: &str = "/account";
pub(crate) const LOGIN_ROUTE: &str = "/login";
pub(crate) const FORGOT_PASSWORD_ROUTE: &str = "/forgot-password";

/// Where to send the client depending on its resolved auth state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct GuardPolicy {
    pub(crate) redirect_if_authenticated: Option<&'static str>,
    pub(crate) redirect_if_unauthenticated: Option<&'static str>,
}

/// Routes that only make sense for anonymous clients (login, register, reset).
pub(crate) const ANONYMOUS_ONLY: GuardPolicy = GuardPolicy {
    redirect_if_authenticated: Some(ACCOUNT_ROUTE),
    redirect_if_unauthenticated: None,
};

/// Routes that require a fully authenticated session.
pub(crate) const AUTHENTICATED_ONLY: GuardPolicy = GuardPolicy {
    redirect_if_authenticated: None,
    redirect_if_unauthenticated: Some(LOGIN_ROUTE),
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AuthDecision {
    Permit,
    Redirect(&'static str),
}

/// Decide what to do with a request given the policy and session validity.
///
/// `authenticated` means the session passed the full validity predicate
/// (logged in, MFA promoted, IP bound). Pure and total; no I/O.
pub(crate) fn evaluate(policy: &GuardPolicy, authenticated: bool) -> AuthDecision {
    let target = if authenticated {
        policy.redirect_if_authenticated
    } else {
        policy.redirect_if_unauthenticated
    };

    target.map_or(AuthDecision::Permit, AuthDecision::Redirect)
}

/// Build the `303 See Other` a `Redirect` decision turns into.
pub(crate) fn see_other(config: &AuthConfig, route: &str) -> Response {
    let location = format!("{}{route}", config.frontend_base_url().trim_end_matches('/'));
    (StatusCode::SEE_OTHER, [(LOCATION, location)]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[test]
    fn anonymous_only_redirects_authenticated() {
        assert_eq!(
            evaluate(&ANONYMOUS_ONLY, true),
            AuthDecision::Redirect(ACCOUNT_ROUTE)
        );
        assert_eq!(evaluate(&ANONYMOUS_ONLY, false), AuthDecision::Permit);
    }

    #[test]
    fn authenticated_only_redirects_anonymous() {
        assert_eq!(
            evaluate(&AUTHENTICATED_ONLY, false),
            AuthDecision::Redirect(LOGIN_ROUTE)
        );
        assert_eq!(evaluate(&AUTHENTICATED_ONLY, true), AuthDecision::Permit);
    }

    #[test]
    fn pass_through_when_no_target_configured() {
        let open = GuardPolicy {
            redirect_if_authenticated: None,
            redirect_if_unauthenticated: None,
        };
        assert_eq!(evaluate(&open, true), AuthDecision::Permit);
        assert_eq!(evaluate(&open, false), AuthDecision::Permit);
    }

    #[test]
    fn see_other_joins_route_to_frontend() {
        let config = AuthConfig::new("https://tasklane.dev/".to_string());
        let response = see_other(&config, LOGIN_ROUTE);
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok()),
            Some("https://tasklane.dev/login")
        );
    }
}

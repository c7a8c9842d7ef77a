//! OpenAPI document for the HTTP surface.

use utoipa::OpenApi;

use super::handlers::{auth, health, tasks};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::login::register,
        auth::login::login,
        auth::mfa::mfa,
        auth::session::session,
        auth::session::logout,
        auth::password_reset::forgot_password,
        auth::password_reset::set_password,
        tasks::list,
        tasks::create,
        tasks::update,
        tasks::delete,
    ),
    components(schemas(
        health::Health,
        auth::types::RegisterRequest,
        auth::types::LoginRequest,
        auth::types::MfaRequest,
        auth::types::ForgotPasswordRequest,
        auth::types::SetPasswordRequest,
        auth::types::SessionResponse,
        tasks::types::TaskRequest,
        tasks::types::TaskResponse,
    )),
    tags(
        (name = "auth", description = "Two-step login, sessions, and password reset"),
        (name = "tasks", description = "Task management and notification scheduling"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::openapi;

    #[test]
    fn openapi_lists_all_routes() {
        let spec = openapi();
        let paths: Vec<&String> = spec.paths.paths.keys().collect();
        assert!(paths.iter().any(|path| path.as_str() == "/health"));
        assert!(paths.iter().any(|path| path.as_str() == "/v1/auth/login"));
        assert!(paths.iter().any(|path| path.as_str() == "/v1/auth/mfa"));
        assert!(paths.iter().any(|path| path.as_str() == "/v1/tasks"));
        assert!(paths.iter().any(|path| path.as_str() == "/v1/tasks/{id}"));
    }
}

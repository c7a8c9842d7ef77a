//! API handlers for Tasklane.
//!
//! Auth (two-step login, sessions, password reset) and task CRUD, plus the
//! operational `/` and `/health` endpoints.

pub mod auth;
pub mod health;
pub mod root;
pub mod tasks;

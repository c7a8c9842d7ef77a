//! Auth handlers and supporting modules.
//!
//! This module coordinates the two-step login (password, then an emailed
//! one-time code), session management, and the stateless password reset.
//!
//! ## Session state machine
//!
//! A successful password check creates a session bound to the client IP
//! that presented it. The session is *pending* until the one-time code is
//! verified; only then does it satisfy the full validity predicate
//! (logged in, code verified, unexpired, same client IP) that protected
//! routes require.
//!
//! ## Password reset
//!
//! No reset state is persisted. The emailed link carries
//! `{email, temp_token}` and the browser carries the keyed HMAC digest of
//! that pair in the short-lived `msg_hash` cookie, so the link only works
//! from the browser window that requested it.

mod digest;
pub(crate) mod guard;
pub(crate) mod login;
pub(crate) mod mfa;
pub(crate) mod password_reset;
pub(crate) mod session;
mod state;
mod storage;
pub(crate) mod types;
mod utils;

pub use state::{AuthConfig, AuthState};

//! Task notification scheduling.
//!
//! Task writes are bridged into one-off `notification_jobs` rows keyed by
//! an interval schedule (get-or-create on `(every, period)`). A background
//! runner polls for due jobs, enqueues the notification email through the
//! outbox, and disables each job once consumed.

pub mod bridge;
#[cfg(test)]
mod integration_tests;
pub mod models;
pub mod runner;

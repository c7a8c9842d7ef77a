//! Request/response types for task endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Payload for creating or replacing a task.
///
/// `notify` and `period` are optional as a pair: both present schedules a
/// notification, both absent schedules nothing.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub notify: Option<i32>,
    #[serde(default)]
    pub period: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TaskResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub complete: bool,
    pub notify: Option<i32>,
    pub period: Option<String>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn task_request_defaults_optional_fields() -> Result<()> {
        let request: TaskRequest = serde_json::from_value(serde_json::json!({
            "title": "water the plants"
        }))?;
        assert_eq!(request.title, "water the plants");
        assert_eq!(request.description, "");
        assert!(!request.complete);
        assert_eq!(request.notify, None);
        assert_eq!(request.period, None);
        Ok(())
    }

    #[test]
    fn task_request_round_trips_schedule_fields() -> Result<()> {
        let request: TaskRequest = serde_json::from_value(serde_json::json!({
            "title": "standup",
            "description": "daily sync",
            "complete": false,
            "notify": 10,
            "period": "minutes"
        }))?;
        assert_eq!(request.notify, Some(10));
        assert_eq!(request.period.as_deref(), Some("minutes"));
        Ok(())
    }

    #[test]
    fn task_response_serializes_all_fields() -> Result<()> {
        let response = TaskResponse {
            id: "00000000-0000-0000-0000-000000000000".to_string(),
            title: "standup".to_string(),
            description: String::new(),
            complete: true,
            notify: None,
            period: None,
            created_at: "2026-01-01 00:00:00+00".to_string(),
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(
            value.get("complete").and_then(serde_json::Value::as_bool),
            Some(true)
        );
        assert!(value.get("notify").is_some_and(serde_json::Value::is_null));
        Ok(())
    }
}

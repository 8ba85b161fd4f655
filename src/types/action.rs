//! Outcome of running an external action.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Whether an action run succeeded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Error,
}

/// Structured result of one action invocation.
///
/// A failed JSON parse of the output is not an error: `parsed_payload` is
/// simply `None` while `raw_output` still carries the text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionOutcome {
    pub status: ActionStatus,
    pub raw_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ActionOutcome {
    /// Successful run; the output is parsed as JSON when possible.
    pub fn success(raw_output: impl Into<String>) -> Self {
        let raw_output = raw_output.into();
        let parsed_payload = serde_json::from_str(raw_output.trim()).ok();
        Self {
            status: ActionStatus::Success,
            raw_output,
            parsed_payload,
            error_message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Error,
            raw_output: String::new(),
            parsed_payload: None,
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_parses_json_output() {
        let outcome = ActionOutcome::success("[\"a\",\"b\"]\n");
        assert!(outcome.is_success());
        assert_eq!(outcome.parsed_payload, Some(serde_json::json!(["a", "b"])));
        assert_eq!(outcome.raw_output, "[\"a\",\"b\"]\n");
    }

    #[test]
    fn success_with_plain_text_keeps_raw_output() {
        let outcome = ActionOutcome::success("not json");
        assert!(outcome.is_success());
        assert!(outcome.parsed_payload.is_none());
        assert_eq!(outcome.raw_output, "not json");
    }

    #[test]
    fn error_carries_message() {
        let outcome = ActionOutcome::error("boom");
        assert_eq!(outcome.status, ActionStatus::Error);
        assert_eq!(outcome.error_message.as_deref(), Some("boom"));
        assert_eq!(outcome.status.to_string(), "error");
    }
}

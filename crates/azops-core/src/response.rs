use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ArgumentInfo, CommandError};

pub const SUCCESS_STATUS: u16 = 200;
pub const SUCCESS_MESSAGE: &str = "Success";

/// Outcome of one invocation, shared by the CLI and the tool adapter.
///
/// `arguments` is populated while the chain is being negotiated and
/// `results` only after a successful execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub status: u16,
    pub message: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<ArgumentInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
}

impl Default for CommandResponse {
    fn default() -> Self {
        Self {
            status: SUCCESS_STATUS,
            message: SUCCESS_MESSAGE.to_string(),
            duration_ms: 0,
            arguments: None,
            results: None,
        }
    }
}

impl CommandResponse {
    /// A response describing `err`.
    pub fn from_error(err: &CommandError) -> Self {
        let mut response = Self::default();
        response.apply_error(err);
        response
    }

    /// Records `err` as the outcome, dropping any partial results.
    pub fn apply_error(&mut self, err: &CommandError) {
        self.status = err.status();
        self.message = err.to_string();
        self.results = None;
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the operation stopped to ask for more input.
    pub fn needs_input(&self) -> bool {
        self.is_success() && self.results.is_none() && self.arguments.is_some()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_default_response_is_success() {
        let response = CommandResponse::default();
        assert_eq!(response.status, 200);
        assert_eq!(response.message, "Success");
        assert!(!response.needs_input());
    }

    #[test]
    fn test_serializes_duration_in_camel_case_and_skips_absent_fields() {
        let response = CommandResponse {
            duration_ms: 12,
            results: Some(json!([{"id": "sub-1"}])),
            ..CommandResponse::default()
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "status": 200,
                "message": "Success",
                "durationMs": 12,
                "results": [{"id": "sub-1"}]
            })
        );
    }

    #[test]
    fn test_apply_error_clears_results() {
        let mut response = CommandResponse {
            results: Some(json!({"partial": true})),
            ..CommandResponse::default()
        };
        response.apply_error(&CommandError::service(403, "forbidden"));
        assert_eq!(response.status, 403);
        assert_eq!(response.message, "forbidden");
        assert!(response.results.is_none());
    }
}

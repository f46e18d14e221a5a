//! Uniform tool response: `{success, result | error}`.

use rmcp::model::{CallToolResult, Content};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message returned when no session could be established for a call. The
/// cause of the last failed attempt is appended in parentheses when known.
pub const AUTH_FAILED_MESSAGE: &str =
    "Authentication failed: could not establish a SimplyBook session";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolEnvelope {
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("success".to_string(), Value::Bool(self.success));
        if let Some(result) = &self.result {
            map.insert("result".to_string(), result.clone());
        }
        if let Some(error) = &self.error {
            map.insert("error".to_string(), Value::String(error.clone()));
        }
        Value::Object(map)
    }

    /// Render for the MCP wire: the envelope as JSON text, flagged as an
    /// error result when the call failed.
    pub fn into_call_result(self) -> CallToolResult {
        let content = vec![Content::text(self.to_value().to_string())];
        if self.success {
            CallToolResult::success(content)
        } else {
            CallToolResult::error(content)
        }
    }
}

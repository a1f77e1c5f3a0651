//! JSON-RPC 2.0 and MCP wire types for the stdio transport.
//!
//! Defines the message frames exchanged with the MCP host, one JSON
//! object per line. Field names follow the MCP schema, so several structs
//! rename to camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const JSONRPC_VERSION: &str = "2.0";

// Standard JSON-RPC 2.0 error codes.
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

// ── Frames ───────────────────────────────────────────────────────────────

/// Incoming request or notification.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    /// Absent (or null) for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    /// Notifications carry no id and must not be answered.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Outgoing response, carrying either a result or an error.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Outgoing notification (no id, never answered).
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: Value,
}

impl Notification {
    /// `notifications/progress` frame echoing the caller's token.
    pub fn progress(token: Value, progress: u32, total: u32) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: "notifications/progress",
            params: json!({
                "progressToken": token,
                "progress": progress,
                "total": total,
            }),
        }
    }
}

// ── Tool call payloads ───────────────────────────────────────────────────

/// Params of a `tools/call` request.
#[derive(Debug, Clone, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
    #[serde(rename = "_meta", default)]
    pub meta: Option<CallMeta>,
}

/// Request metadata; only the progress token is used.
#[derive(Debug, Clone, Deserialize)]
pub struct CallMeta {
    #[serde(rename = "progressToken", default)]
    pub progress_token: Option<Value>,
}

impl CallToolParams {
    /// Progress token from `_meta`, when the caller asked for progress.
    pub fn progress_token(&self) -> Option<Value> {
        self.meta.as_ref()?.progress_token.clone()
    }
}

/// One content block of a tool result. MCP defines several kinds; this
/// server only ever emits text.
#[derive(Debug, Clone, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Result payload of a `tools/call` response.
///
/// `is_error: true` marks requests that were refused or could not be
/// served; a Gradle build that ran and failed is reported with
/// `is_error: false` and the failure inside the payload text.
#[derive(Debug, Clone, Serialize)]
pub struct CallToolResult {
    pub content: Vec<TextContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text",
                text: text.into(),
            }],
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text",
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

/// Entry of the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_with_id() {
        let json = r#"{"jsonrpc": "2.0", "id": 7, "method": "tools/list"}"#;
        let request: Request = serde_json::from_str(json).unwrap();

        assert_eq!(request.method, "tools/list");
        assert_eq!(request.id, Some(json!(7)));
        assert!(!request.is_notification());
        assert!(request.params.is_none());
    }

    #[test]
    fn test_parse_notification_without_id() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let request: Request = serde_json::from_str(json).unwrap();

        assert!(request.is_notification());
    }

    #[test]
    fn test_string_ids_are_preserved() {
        let json = r#"{"jsonrpc": "2.0", "id": "req-42", "method": "ping"}"#;
        let request: Request = serde_json::from_str(json).unwrap();

        assert_eq!(request.id, Some(json!("req-42")));
    }

    #[test]
    fn test_success_response_has_no_error_key() {
        let response = Response::success(json!(1), json!({"ok": true}));
        let wire = serde_json::to_value(&response).unwrap();

        assert_eq!(wire["jsonrpc"], "2.0");
        assert_eq!(wire["id"], 1);
        assert_eq!(wire["result"]["ok"], true);
        assert!(wire.get("error").is_none());
    }

    #[test]
    fn test_error_response_has_no_result_key() {
        let response = Response::error(json!("abc"), METHOD_NOT_FOUND, "Method not found: nope");
        let wire = serde_json::to_value(&response).unwrap();

        assert_eq!(wire["error"]["code"], -32601);
        assert_eq!(wire["error"]["message"], "Method not found: nope");
        assert!(wire.get("result").is_none());
    }

    #[test]
    fn test_progress_notification_shape() {
        let notification = Notification::progress(json!("tok-1"), 42, 100);
        let wire = serde_json::to_value(&notification).unwrap();

        assert_eq!(wire["method"], "notifications/progress");
        assert_eq!(wire["params"]["progressToken"], "tok-1");
        assert_eq!(wire["params"]["progress"], 42);
        assert_eq!(wire["params"]["total"], 100);
        assert!(wire.get("id").is_none());
    }

    #[test]
    fn test_parse_call_tool_params_with_progress_token() {
        let json = r#"{
            "name": "run_task",
            "arguments": {"task": "build", "args": ["--info"]},
            "_meta": {"progressToken": 3}
        }"#;
        let params: CallToolParams = serde_json::from_str(json).unwrap();

        assert_eq!(params.name, "run_task");
        assert_eq!(params.progress_token(), Some(json!(3)));
        assert_eq!(params.arguments.unwrap()["task"], "build");
    }

    #[test]
    fn test_parse_call_tool_params_minimal() {
        let json = r#"{"name": "list_projects"}"#;
        let params: CallToolParams = serde_json::from_str(json).unwrap();

        assert_eq!(params.name, "list_projects");
        assert!(params.arguments.is_none());
        assert!(params.progress_token().is_none());
    }

    #[test]
    fn test_tool_result_text_shape() {
        let result = CallToolResult::text("{\"success\": true}");
        let wire = serde_json::to_value(&result).unwrap();

        assert_eq!(wire["content"][0]["type"], "text");
        assert_eq!(wire["content"][0]["text"], "{\"success\": true}");
        assert_eq!(wire["isError"], false);
    }

    #[test]
    fn test_tool_result_error_shape() {
        let result = CallToolResult::error("Invalid arguments: missing field `task`");
        let wire = serde_json::to_value(&result).unwrap();

        assert_eq!(wire["isError"], true);
        assert_eq!(
            wire["content"][0]["text"],
            "Invalid arguments: missing field `task`"
        );
    }

    #[test]
    fn test_tool_descriptor_renames_input_schema() {
        let descriptor = ToolDescriptor {
            name: "clean",
            description: "Clean build artifacts.",
            input_schema: json!({"type": "object"}),
        };
        let wire = serde_json::to_value(&descriptor).unwrap();

        assert_eq!(wire["inputSchema"]["type"], "object");
        assert!(wire.get("input_schema").is_none());
    }
}

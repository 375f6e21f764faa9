use std::borrow::Cow;

use box_core::control::{ControlError, ControlResult};
use box_core::services::SessionError;
use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content, ErrorCode};
use rmcp::schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

/// Advertised shape of id parameters: Box ids arrive as strings or integers.
pub(crate) enum IdSchema {}

impl JsonSchema for IdSchema {
    fn schema_name() -> Cow<'static, str> {
        "BoxId".into()
    }

    fn inline_schema() -> bool {
        true
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": ["string", "integer"],
            "description": "Box id, as a string or a number"
        })
    }
}

pub(crate) fn mcp_err(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: None,
    }
}

pub(crate) fn map_session_err(err: SessionError) -> ErrorData {
    match err {
        SessionError::Uninitialized => mcp_err(
            ErrorCode::INTERNAL_ERROR,
            "Box session is not initialized; the server must authenticate before serving tools",
        ),
        SessionError::BuildFailed(message) => mcp_err(
            ErrorCode::INTERNAL_ERROR,
            format!("failed to build Box client: {message}"),
        ),
    }
}

/// Tool-level failure: `{"error": kind, "message": text, "status"?: code}`.
pub(crate) fn failure(err: &ControlError) -> CallToolResult {
    warn!(kind = err.kind(), error = %err, "tool call failed");
    let mut body = json!({
        "error": err.kind(),
        "message": err.to_string(),
    });
    if let Some(status) = err.status() {
        body["status"] = json!(status);
    }
    CallToolResult::error(vec![Content::text(body.to_string())])
}

/// Renders an operation result as a tool result with JSON content.
pub(crate) fn render<T: Serialize>(result: ControlResult<T>) -> Result<CallToolResult, ErrorData> {
    match result {
        Ok(value) => Ok(CallToolResult::success(vec![Content::json(value)?])),
        Err(err) => Ok(failure(&err)),
    }
}

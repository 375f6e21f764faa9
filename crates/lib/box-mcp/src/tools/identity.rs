use rmcp::{ErrorData, model::CallToolResult, tool, tool_router};

use crate::{BoxMcp, helpers};

#[tool_router(router = tool_router_identity, vis = "pub")]
impl BoxMcp {
    #[tool(description = "Returns the Box user the server is authenticated as.")]
    async fn box_who_am_i(&self) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.who_am_i().await)
    }

    #[tool(description = "Starts the Box OAuth authorization flow. Returns the URL to open in a browser; other auth modes report that no authorization is needed.")]
    async fn box_authorize_app(&self) -> Result<CallToolResult, ErrorData> {
        let control = self.control()?;
        helpers::render(control.authorize().await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use box_core::services::{BoxSession, BuildClientFn, SessionError};
    use box_core::testing::RecordingApi;
    use rmcp::model::ErrorCode;
    use serde_json::json;

    use crate::tests::{json_body, ready_server};
    use crate::{BoxMcp, ServerDescriptor};

    #[tokio::test]
    async fn uninitialized_session_is_a_protocol_error() {
        let build: BuildClientFn = Arc::new(|| Box::pin(async { Err(SessionError::Uninitialized) }));
        let server = BoxMcp::new(BoxSession::new(build), ServerDescriptor::stdio("test"));
        let err = server.box_who_am_i().await.expect_err("uninitialized session");
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert!(err.message.contains("not initialized"));
    }

    #[tokio::test]
    async fn who_am_i_returns_the_user_record() {
        let api = Arc::new(
            RecordingApi::new().respond("current_user", json!({"type": "user", "id": "7", "name": "Ada"})),
        );
        let result = ready_server(api).box_who_am_i().await.expect("tool result");
        assert_ne!(result.is_error, Some(true));
        assert_eq!(json_body(&result)["name"], json!("Ada"));
    }

    #[tokio::test]
    async fn remote_failures_are_tool_errors() {
        let api = Arc::new(RecordingApi::new().fail("current_user", 401, "unauthorized"));
        let result = ready_server(api).box_who_am_i().await.expect("tool result");
        assert_eq!(result.is_error, Some(true));
        let body = json_body(&result);
        assert_eq!(body["error"], json!("api_error"));
        assert_eq!(body["status"], json!(401));
    }
}

//! MCP server implementation for box-mcp.
//!
//! This crate wires the Box control plane into rmcp tool handlers. Every tool
//! reads the process-wide [`BoxSession`] through [`BoxMcp::control`]; a session
//! that was never initialized surfaces as a protocol error, while failures of
//! the operation itself are returned as tool errors.

mod helpers;
mod tools;
pub mod server;

use std::sync::Arc;

use box_core::control::BoxControlPlane;
use box_core::services::BoxSession;
use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};

pub use server::{ServerDescriptor, Transport};

const SERVER_INSTRUCTIONS: &str = r"box-mcp exposes a Box account (files, folders, metadata, Box AI and Doc Gen) as MCP tools.

Workflow:
1. Call `box_who_am_i` to confirm which account the server is authenticated as.
   In OAuth mode, `box_authorize_app` starts a new browser authorization.
2. Locate content with `box_search`, `box_search_folder_by_name` or
   `box_list_folder_content_by_folder_id`. The root folder id is `0`.
3. Work with files:
   - `box_read` returns extracted text; `box_download_file` returns text or images inline
     and can save the file locally.
   - `box_upload_file_from_path` and `box_upload_file_from_content` upload into a folder.
4. Ask or extract with Box AI: `box_ai_ask_file_single`, `box_ai_ask_file_multi`,
   `box_ai_ask_hub`, `box_ai_extract_freeform` and the `box_ai_extract_structured_*` tools.
5. Metadata: `box_metadata_template_*` manage enterprise templates and
   `box_metadata_*_instance_on_file` manage values on a file.
6. Doc Gen: mark a file as template with `box_docgen_template_create`, then
   generate documents with `box_docgen_create_batch`.

Notes:
- Every id parameter accepts a string or a number.
- Failed operations return `{error, message, status?}` with `is_error` set.";

/// MCP server wrapper around the Box session and tool routers.
#[derive(Clone)]
pub struct BoxMcp {
    tool_router: ToolRouter<Self>,
    session: Arc<BoxSession>,
    descriptor: ServerDescriptor,
}

impl BoxMcp {
    /// Creates a new server owning its session.
    #[must_use]
    pub fn new(session: BoxSession, descriptor: ServerDescriptor) -> Self {
        Self::with_session(Arc::new(session), descriptor)
    }

    /// Creates a new server using a shared session handle.
    #[must_use]
    pub fn with_session(session: Arc<BoxSession>, descriptor: ServerDescriptor) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_identity()
            + Self::tool_router_search()
            + Self::tool_router_ai()
            + Self::tool_router_docgen()
            + Self::tool_router_files()
            + Self::tool_router_folders()
            + Self::tool_router_metadata();
        Self {
            tool_router,
            session,
            descriptor,
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &ServerDescriptor {
        &self.descriptor
    }

    /// Control plane bound to the session's client.
    pub(crate) fn control(&self) -> Result<BoxControlPlane, ErrorData> {
        self.session.control().map_err(helpers::map_session_err)
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl BoxMcp {
    #[tool(description = "Returns information about the MCP server: name, transport, host and port.")]
    async fn mcp_server_info(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::json(self.descriptor.info())?]))
    }
}

#[tool_handler]
impl ServerHandler for BoxMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: self.descriptor.server_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::default()
            },
            ..Default::default()
        }
    }
}

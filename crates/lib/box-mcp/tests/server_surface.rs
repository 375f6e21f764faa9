use std::sync::Arc;

use box_core::services::{BoxSession, SessionState};
use box_core::testing::RecordingApi;
use box_mcp::{BoxMcp, ServerDescriptor, Transport};
use rmcp::ServerHandler;

fn build_server(descriptor: ServerDescriptor) -> BoxMcp {
    BoxMcp::new(BoxSession::ready(Arc::new(RecordingApi::new())), descriptor)
}

#[test]
fn server_info_advertises_tools_and_name() {
    let server = build_server(ServerDescriptor::http("Box MCP HTTP Server", "127.0.0.1", 8000));
    let info = server.get_info();

    assert_eq!(info.server_info.name, "Box MCP HTTP Server");
    assert!(info.capabilities.tools.is_some());
    let instructions = info.instructions.expect("instructions");
    assert!(instructions.contains("box_who_am_i"));
}

#[test]
fn descriptor_is_shared_by_every_connection() {
    let session = Arc::new(BoxSession::ready(Arc::new(RecordingApi::new())));
    let descriptor = ServerDescriptor::stdio(ServerDescriptor::default_name(Transport::Stdio));

    let first = BoxMcp::with_session(session.clone(), descriptor.clone());
    let second = BoxMcp::with_session(session.clone(), descriptor);

    assert_eq!(first.descriptor(), second.descriptor());
    assert_eq!(first.descriptor().server_name, "Box MCP STDIO Server");
    assert_eq!(session.state(), SessionState::Ready);
}

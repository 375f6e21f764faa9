//! MCP server runners for box-mcp.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use box_core::services::BoxSession;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig,
    StreamableHttpService,
    session::local::LocalSessionManager,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::BoxMcp;

const NOT_APPLICABLE: &str = "N/A";

/// Transport the server is reachable over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    Http,
}

impl Transport {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" | "streamable-http" => Ok(Self::Http),
            other => Err(format!("unsupported transport: {other}")),
        }
    }
}

/// Identity of the running server, reported by `mcp_server_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    pub server_name: String,
    pub transport: Transport,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ServerDescriptor {
    #[must_use]
    pub fn stdio(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            transport: Transport::Stdio,
            host: None,
            port: None,
        }
    }

    #[must_use]
    pub fn http(server_name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            server_name: server_name.into(),
            transport: Transport::Http,
            host: Some(host.into()),
            port: Some(port),
        }
    }

    /// Default display name for a transport, e.g. `Box MCP STDIO Server`.
    #[must_use]
    pub fn default_name(transport: Transport) -> String {
        format!("Box MCP {} Server", transport.as_str().to_ascii_uppercase())
    }

    /// Payload returned to clients. Host and port read `N/A` over stdio.
    #[must_use]
    pub fn info(&self) -> ServerInfoPayload {
        let (host, port) = match (self.transport, &self.host, self.port) {
            (Transport::Http, Some(host), Some(port)) => (host.clone(), Value::from(port)),
            _ => (NOT_APPLICABLE.to_string(), Value::from(NOT_APPLICABLE)),
        };
        ServerInfoPayload {
            server_name: self.server_name.clone(),
            transport: self.transport,
            host,
            port,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerInfoPayload {
    pub server_name: String,
    pub transport: Transport,
    pub host: String,
    /// Port number, or the string `N/A`.
    pub port: Value,
}

/// Configuration for the MCP streamable HTTP server.
#[derive(Debug, Clone)]
pub struct McpHttpServerConfig {
    pub addr: SocketAddr,
    pub stateful_mode: bool,
    pub sse_keep_alive: Option<Duration>,
    pub sse_retry: Option<Duration>,
}

impl McpHttpServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stateful_mode: false,
            sse_keep_alive: Some(Duration::from_secs(15)),
            sse_retry: Some(Duration::from_secs(3)),
        }
    }

    #[must_use]
    pub const fn with_stateful_mode(mut self, stateful_mode: bool) -> Self {
        self.stateful_mode = stateful_mode;
        self
    }
}

/// Serves the MCP server over stdio.
///
/// # Errors
/// Returns any transport or server error.
pub async fn serve_stdio(
    session: Arc<BoxSession>,
    descriptor: ServerDescriptor,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!(server_name = %descriptor.server_name, "serving MCP over stdio");
    let service = BoxMcp::with_session(session, descriptor);
    let (stdin, stdout) = stdio();
    let running = serve_server(service, (stdin, stdout)).await?;
    let _ = running.waiting().await?;
    Ok(())
}

/// Serves the MCP server using streamable HTTP transport.
///
/// The MCP endpoint is mounted at `/mcp`; `/health` answers `ok`.
///
/// # Errors
/// Returns any listener or server error.
pub async fn serve_streamable_http(
    session: Arc<BoxSession>,
    descriptor: ServerDescriptor,
    config: McpHttpServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service: StreamableHttpService<BoxMcp, LocalSessionManager> = StreamableHttpService::new(
        move || Ok(BoxMcp::with_session(session.clone(), descriptor.clone())),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            sse_keep_alive: config.sse_keep_alive,
            sse_retry: config.sse_retry,
            stateful_mode: config.stateful_mode,
            ..Default::default()
        },
    );

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, stateful = config.stateful_mode, "serving MCP over streamable HTTP");
    axum::serve(listener, app).await?;
    Ok(())
}

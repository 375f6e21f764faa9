//! Daemon entry point for the Box MCP server.
//!
//! Loads configuration from CLI flags and the environment, authenticates the
//! Box session, and serves the MCP protocol over stdio or streamable HTTP.

mod config;
mod session;

use std::sync::Arc;

use box_mcp::Transport;
use box_mcp::server::{serve_stdio, serve_streamable_http};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::BoxConfig;
use crate::session::build_session;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the stdio transport.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = BoxConfig::from_args()?;
    let session = Arc::new(build_session(&config));
    if let Err(err) = session.initialize().await {
        error!(error = %err, "Box session could not be initialized");
        return Err(err.into());
    }

    let descriptor = config.descriptor();
    info!(
        server_name = %descriptor.server_name,
        transport = %config.transport,
        "starting Box MCP server"
    );
    match config.transport {
        Transport::Stdio => serve_stdio(session, descriptor).await?,
        Transport::Http => serve_streamable_http(session, descriptor, config.http_server()).await?,
    }
    Ok(())
}

//! Core services for box-mcp.
//!
//! This crate owns the Box API client and its authentication, the session
//! context that hands one authenticated client to every tool call, and the
//! control plane that normalizes tool input before delegating to the client.

pub mod auth;
pub mod client;
pub mod control;
pub mod paths;
pub mod services;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

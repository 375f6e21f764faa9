//! Wire models and API constants for box-mcp.
//!
//! This crate defines the typed request and response records exchanged with the
//! Box content API, the identifier type accepted by every tool, and the constant
//! tables (endpoints, content types, MIME guesses) shared by the client and the
//! control plane.

pub mod ids;
pub mod models;
pub mod schema;

pub use ids::BoxId;
pub use models::*;

//! MCP tool modules.
//!
//! Tools are grouped by Box API area. Each group contributes one router that
//! `BoxMcp` sums at construction.

mod ai;
mod docgen;
mod files;
mod folders;
mod identity;
mod metadata;
mod search;

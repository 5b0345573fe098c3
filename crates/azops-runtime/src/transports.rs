//! Transport layer implementations for serving tools over different protocols.
//!
//! Each transport wraps a [`ToolAdapter`](crate::ToolAdapter) and maps its
//! tool listing and call outcomes onto a wire protocol.

/// Model Context Protocol (MCP) transport implementation.
///
/// Provides [`McpService`](mcp::McpService), an `rmcp` server handler usable
/// over stdio or streamable HTTP.
pub mod mcp;

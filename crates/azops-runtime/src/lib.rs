//! Serving the azops command registry to agents.
//!
//! [`ToolAdapter`] turns every non-hidden command of a
//! [`CommandRegistry`](azops_core::CommandRegistry) into a tool with a JSON
//! schema and dispatches tool calls through the same parse, bind, resolve
//! and execute path the CLI uses. [`McpService`] exposes the adapter over
//! the Model Context Protocol.

mod adapter;
pub mod transports;

pub use adapter::{ToolAdapter, ToolDescriptor, ToolOutcome, input_schema};
pub use transports::mcp::McpService;

//! Static CLI commands.
//!
//! Cloud operations come from the command registry and are wired into clap
//! at startup (see `cli`). The modules here are the commands that exist
//! outside the registry:
//!
//! - **`server`**: Run a Model Context Protocol (MCP) server exposing every
//!   non-hidden registry command as a tool

pub mod server;

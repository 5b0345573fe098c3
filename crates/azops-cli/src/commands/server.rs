//! `azops server start`: serve the command registry over MCP.
//!
//! Two transports are available:
//!
//! - **stdio** (default): the client spawns `azops server start` and talks
//!   over standard input/output
//! - **http**: a streamable HTTP endpoint on a configurable address and path
//!
//! Unset flags fall back to the `[server]` section of `azops.toml`.

use std::{future::Future, net::SocketAddr};

use anyhow::{Context, Result, anyhow};
use azops_core::ServerConfig;
use azops_runtime::{McpService, ToolAdapter};
use clap::{Args, ValueEnum};
use console::style;
use rmcp::{
    service::ServiceExt,
    transport::{stdio, streamable_http_server::StreamableHttpServerConfig},
};
use tokio::signal;
use tracing::info;

const DEFAULT_ADDR: &str = "127.0.0.1:3333";
const DEFAULT_PATH: &str = "/mcp";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

/// Command-line arguments for `server start`.
#[derive(Debug, Args)]
pub struct ServerArgs {
    /// Transport to serve MCP over (defaults to `stdio`).
    #[arg(long, value_enum)]
    pub transport: Option<Transport>,

    /// Address to bind the HTTP server to (defaults to `127.0.0.1:3333`).
    #[arg(short = 'a', long)]
    pub addr: Option<String>,

    /// HTTP path for the MCP endpoint (defaults to `/mcp`).
    #[arg(long)]
    pub path: Option<String>,
}

/// Server settings after applying config fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ServerSettings {
    transport: Transport,
    addr: String,
    path: String,
}

impl ServerSettings {
    fn resolve(args: &ServerArgs, config: &ServerConfig) -> Result<Self> {
        let transport = match (args.transport, config.transport.as_deref()) {
            (Some(transport), _) => transport,
            (None, Some(raw)) => Transport::from_str(raw, true)
                .map_err(|_| anyhow!("invalid [server] transport in config: {raw}"))?,
            (None, None) => Transport::default(),
        };
        let addr = args
            .addr
            .clone()
            .or_else(|| config.addr.clone())
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let path = args
            .path
            .as_deref()
            .or(config.path.as_deref())
            .map_or_else(|| DEFAULT_PATH.to_string(), normalize_path);
        Ok(Self {
            transport,
            addr,
            path,
        })
    }
}

/// Runs the MCP server until Ctrl+C.
pub async fn run(args: &ServerArgs, config: &ServerConfig, adapter: ToolAdapter) -> Result<()> {
    let shutdown = async {
        let _ = signal::ctrl_c().await;
        info!("Received shutdown signal");
    };
    run_with_shutdown(args, config, adapter, shutdown).await
}

async fn run_with_shutdown<F>(
    args: &ServerArgs,
    config: &ServerConfig,
    adapter: ToolAdapter,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let settings = ServerSettings::resolve(args, config)?;
    let tools = adapter.list_tools().len();

    if settings.transport == Transport::Stdio {
        return run_stdio(adapter, tools, shutdown).await;
    }

    println!("{} Starting MCP server...", style("→").cyan());
    println!("{} Loaded {tools} tool(s)", style("✓").green().bold());

    let addr: SocketAddr = settings
        .addr
        .parse()
        .with_context(|| format!("invalid --addr value: {}", settings.addr))?;

    let service = McpService::new(adapter).streamable_http_service_with_config(
        StreamableHttpServerConfig {
            // Stateless mode keeps compatibility with MCP clients that don't
            // send the initialized notification after initialize.
            stateful_mode: false,
            ..Default::default()
        },
    );
    let router = axum::Router::new().nest_service(settings.path.as_str(), service);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind MCP server on {addr}"))?;
    let local = listener.local_addr().unwrap_or(addr);

    info!(address = %local, path = %settings.path, "Starting MCP server");
    println!(
        "{} MCP server running on http://{local}{}",
        style("✓").green().bold(),
        settings.path
    );
    println!("Press Ctrl+C to stop\n");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("mcp server error")?;

    info!("azops MCP server stopped");
    Ok(())
}

/// Serves MCP over stdin/stdout. Status messages go to stderr.
async fn run_stdio<F>(adapter: ToolAdapter, tools: usize, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    eprintln!("{} Starting MCP stdio server...", style("→").cyan());
    eprintln!("{} Loaded {tools} tool(s)", style("✓").green().bold());

    let running = McpService::new(adapter)
        .serve(stdio())
        .await
        .context("failed to start MCP stdio server")?;

    eprintln!("{} MCP stdio server running", style("✓").green().bold());

    let cancel = running.cancellation_token();
    let mut waiting = Box::pin(running.waiting());

    tokio::select! {
        result = &mut waiting => {
            result.context("mcp stdio server exited")?;
        }
        () = shutdown => {
            cancel.cancel();
            let _ = waiting.await;
        }
    }

    info!("azops MCP stdio server stopped");
    Ok(())
}

/// Ensures an HTTP path starts with `/`, defaulting to `/mcp` when empty.
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        DEFAULT_PATH.to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use azops_commands::{CatalogDefaults, build_registry};
    use azops_core::CommandContext;
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct ServerArgsCli {
        #[command(flatten)]
        server: ServerArgs,
    }

    fn parse(argv: &[&str]) -> ServerArgs {
        ServerArgsCli::try_parse_from(argv.iter().copied())
            .expect("args should parse")
            .server
    }

    #[test]
    fn test_server_args_defaults() {
        let settings = ServerSettings::resolve(&parse(&["test"]), &ServerConfig::default())
            .expect("settings should resolve");
        assert_eq!(
            settings,
            ServerSettings {
                transport: Transport::Stdio,
                addr: "127.0.0.1:3333".to_string(),
                path: "/mcp".to_string(),
            }
        );
    }

    #[test]
    fn test_server_args_override_config() {
        let config = ServerConfig {
            transport: Some("stdio".to_string()),
            addr: Some("0.0.0.0:8080".to_string()),
            path: Some("tools".to_string()),
        };
        let args = parse(&[
            "test",
            "--transport",
            "http",
            "--addr",
            "127.0.0.1:9000",
        ]);

        let settings = ServerSettings::resolve(&args, &config).expect("settings should resolve");
        assert_eq!(settings.transport, Transport::Http);
        assert_eq!(settings.addr, "127.0.0.1:9000");
        assert_eq!(settings.path, "/tools");
    }

    #[test]
    fn test_server_config_transport_is_validated() {
        let config = ServerConfig {
            transport: Some("carrier-pigeon".to_string()),
            ..ServerConfig::default()
        };
        assert!(ServerSettings::resolve(&parse(&["test"]), &config).is_err());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/mcp");
        assert_eq!(normalize_path("/custom"), "/custom");
        assert_eq!(normalize_path("custom"), "/custom");
    }

    #[tokio::test]
    async fn test_http_server_stops_on_shutdown() {
        let registry = Arc::new(build_registry(&CatalogDefaults::default()).expect("catalog"));
        let adapter = ToolAdapter::new(registry, CommandContext::new());
        let args = parse(&["test", "--transport", "http", "--addr", "127.0.0.1:0"]);

        run_with_shutdown(&args, &ServerConfig::default(), adapter, async {})
            .await
            .expect("server should stop cleanly");
    }
}

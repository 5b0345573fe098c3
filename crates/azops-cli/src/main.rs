//! The `azops` command line.
//!
//! Usage:
//! ```bash
//! azops subscription list
//! azops group list --subscription-id <id>
//! azops storage blob container list --subscription-id <id> --resource-group <rg> --account <name>
//! azops server start --transport http
//! ```
//!
//! Every invocation prints one JSON response on stdout. When required
//! arguments are missing the response lists them with suggested values
//! instead of results.

use std::{path::Path, process::ExitCode, sync::Arc};

use anyhow::{Context, Result, bail};
use azops_commands::{ArmClient, CatalogDefaults, ResourceService, build_registry};
use azops_core::{
    AzopsConfig, CommandContext, CommandError, CommandRegistry, CommandResponse, TokenCache,
};
use azops_runtime::ToolAdapter;
use clap::FromArgMatches;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Invocation, LogFormat},
    commands::server::ServerArgs,
};

mod cli;
mod commands;

#[tokio::main]
async fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().collect();
    match run(&argv).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let response = CommandResponse {
                status: 500,
                message: format!("{err:#}"),
                ..CommandResponse::default()
            };
            if let Err(print_err) = print_response(&response) {
                eprintln!("{err:#}: {print_err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(argv: &[String]) -> Result<()> {
    let opts = cli::bootstrap_options(argv);
    init_tracing(opts.log_format)?;

    let config = load_config(opts.config.as_deref())?;
    let registry = Arc::new(
        build_registry(&CatalogDefaults::from_config(&config))
            .context("failed to build command registry")?,
    );
    let context = build_context(&config, &registry);
    debug!(commands = registry.len(), "Command registry ready");

    let matches = match cli::build(&registry).try_get_matches_from(argv) {
        Ok(matches) => matches,
        Err(err) if cli::is_informational(&err) => err.exit(),
        Err(err) => {
            let err = CommandError::Usage(err.to_string().trim().to_string());
            return print_response(&CommandResponse::from_error(&err));
        }
    };

    match cli::resolve(&registry, &matches) {
        Some(Invocation::Server(matches)) => {
            let args = ServerArgs::from_arg_matches(matches)?;
            let adapter = ToolAdapter::new(Arc::clone(&registry), context);
            commands::server::run(&args, &config.server, adapter).await
        }
        Some(Invocation::Command { command, matches }) => {
            let response = command.run(&context, matches).await;
            print_response(&response)
        }
        None => bail!("no command selected"),
    }
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .context("failed to parse log directive")?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AzopsConfig> {
    match path {
        Some(path) => AzopsConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => AzopsConfig::resolve_or_default().context("failed to load azops config"),
    }
}

/// Services shared by every command of this process.
fn build_context(config: &AzopsConfig, registry: &Arc<CommandRegistry>) -> CommandContext {
    let service: Arc<dyn ResourceService> = Arc::new(ArmClient::new(config.arm.endpoint.clone()));
    CommandContext::new()
        .with_service(service)
        .with_service(Arc::clone(registry))
        .with_tokens(Arc::new(TokenCache::fixed(config.access_token())))
        .with_loader_timeout(config.loader_timeout())
}

fn print_response(response: &CommandResponse) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(response).context("failed to serialize response")?;
    println!("{rendered}");
    Ok(())
}

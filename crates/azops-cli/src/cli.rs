//! The dynamic clap tree.
//!
//! Groups of the command registry become nested subcommands and each
//! registered command contributes its own clap definition, so
//! `azops storage account list --subscription-id <id>` parses with exactly
//! the arguments the operation declares.

use std::{path::PathBuf, sync::Arc};

use azops_core::{CommandGroup, CommandRegistry};
use clap::{ArgMatches, Args, Command, FromArgMatches, ValueEnum, error::ErrorKind};

use crate::commands::server::ServerArgs;

pub(crate) const SERVER_GROUP: &str = "server";
pub(crate) const SERVER_START: &str = "start";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Options accepted before the command path.
#[derive(Debug, Default, Args)]
pub(crate) struct GlobalOpts {
    /// Path to an azops.toml config file.
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Log output format. Logs always go to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub(crate) log_format: LogFormat,
}

/// What the parsed command line asks for.
pub(crate) enum Invocation<'a> {
    Server(&'a ArgMatches),
    Command {
        command: Arc<dyn azops_core::Command>,
        matches: &'a ArgMatches,
    },
}

/// Reads the global options ahead of the full parse.
///
/// Logging and config have to be set up before the registry, and with it the
/// full clap tree, can be built. Anything unparseable falls back to defaults
/// and is reported by the full parse.
pub(crate) fn bootstrap_options(argv: &[String]) -> GlobalOpts {
    GlobalOpts::augment_args(Command::new("azops"))
        .ignore_errors(true)
        .allow_external_subcommands(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .try_get_matches_from(argv)
        .ok()
        .and_then(|matches| GlobalOpts::from_arg_matches(&matches).ok())
        .unwrap_or_default()
}

/// Full clap tree: the registry groups plus `server start`.
pub(crate) fn build(registry: &CommandRegistry) -> Command {
    let server = Command::new(SERVER_GROUP)
        .about("Serve azops commands as MCP tools")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(ServerArgs::augment_args(
            Command::new(SERVER_START).about("Start the MCP server"),
        ));
    let root = group_command(registry.root())
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand(server);
    GlobalOpts::augment_args(root)
}

fn group_command(group: &CommandGroup) -> Command {
    let mut command = Command::new(group.name().to_string())
        .about(group.description().to_string())
        .subcommand_required(true)
        .arg_required_else_help(true);
    for subgroup in group.subgroups() {
        command = command.subcommand(group_command(subgroup));
    }
    for (segment, leaf) in group.commands() {
        command = command.subcommand(leaf.clap_command().name(segment.clone()));
    }
    command
}

/// Help and version requests are printed by clap itself rather than
/// reported as a failed response.
pub(crate) fn is_informational(err: &clap::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    )
}

/// Walks the subcommand chain down to the leaf the user selected.
pub(crate) fn resolve<'a>(
    registry: &CommandRegistry,
    matches: &'a ArgMatches,
) -> Option<Invocation<'a>> {
    let (first, mut current) = matches.subcommand()?;
    if first == SERVER_GROUP {
        return current.subcommand_matches(SERVER_START).map(Invocation::Server);
    }

    let mut segments = vec![first];
    while let Some((name, next)) = current.subcommand() {
        segments.push(name);
        current = next;
    }
    registry
        .find(&registry.flattened_name(segments))
        .map(|command| Invocation::Command {
            command,
            matches: current,
        })
}

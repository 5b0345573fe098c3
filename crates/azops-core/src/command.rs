use std::{panic::AssertUnwindSafe, time::Instant};

use async_trait::async_trait;
use clap::ArgMatches;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::{
    ArgumentChain, ArgumentDescriptor, CommandContext, CommandError, CommandResponse,
    resolve_chain,
};

/// A leaf of the command tree with a typed argument struct.
///
/// Implementors declare their inputs once through [`Operation::chain`]; the
/// blanket [`Command`] impl derives the clap definition, the binder and the
/// bind/resolve/execute pipeline from it.
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    type Args: Default + Clone + Send + Sync + 'static;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Hidden operations stay callable from the CLI but are not advertised
    /// as tools.
    fn hidden(&self) -> bool {
        false
    }

    fn chain(&self) -> &ArgumentChain<Self::Args>;

    /// Runs the operation. Only called once every required argument is set.
    async fn execute(&self, ctx: &CommandContext, args: Self::Args)
    -> Result<Value, CommandError>;
}

/// Type-erased operation as stored in groups and the registry.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn hidden(&self) -> bool;

    fn arguments(&self) -> Vec<ArgumentDescriptor>;

    /// clap definition for this command, named after [`Command::name`].
    fn clap_command(&self) -> clap::Command;

    /// Binds `matches`, resolves the chain and executes when ready.
    async fn run(&self, ctx: &CommandContext, matches: &ArgMatches) -> CommandResponse;

    /// Parses `--name value` tokens with this command's own clap definition
    /// and runs it. Parse failures become a 400 response.
    async fn run_tokens(&self, ctx: &CommandContext, tokens: Vec<String>) -> CommandResponse {
        let started = Instant::now();
        match self
            .clap_command()
            .no_binary_name(true)
            .try_get_matches_from(tokens)
        {
            Ok(matches) => self.run(ctx, &matches).await,
            Err(err) => {
                let err = CommandError::Usage(err.to_string().trim().to_string());
                debug!(command = self.name(), error = %err, "Rejected command input");
                let mut response = CommandResponse::from_error(&err);
                response.duration_ms = elapsed_ms(started);
                response
            }
        }
    }
}

#[async_trait]
impl<O: Operation> Command for O {
    fn name(&self) -> &str {
        Operation::name(self)
    }

    fn description(&self) -> &str {
        Operation::description(self)
    }

    fn hidden(&self) -> bool {
        Operation::hidden(self)
    }

    fn arguments(&self) -> Vec<ArgumentDescriptor> {
        self.chain().descriptors()
    }

    fn clap_command(&self) -> clap::Command {
        clap::Command::new(Operation::name(self).to_string())
            .about(Operation::description(self).to_string())
            .hide(Operation::hidden(self))
            .args(self.chain().clap_args())
    }

    #[instrument(skip_all, fields(command = Operation::name(self)))]
    async fn run(&self, ctx: &CommandContext, matches: &ArgMatches) -> CommandResponse {
        let started = Instant::now();
        let mut response = CommandResponse::default();
        let mut args = self.chain().bind(matches);

        if resolve_chain(self.chain(), ctx, &mut args, &mut response).await {
            response.arguments = None;
            match AssertUnwindSafe(self.execute(ctx, args)).catch_unwind().await {
                Ok(Ok(results)) => response.results = Some(results),
                Ok(Err(err)) => {
                    warn!(error = %err, status = err.status(), "Command failed");
                    response.apply_error(&err);
                }
                Err(_) => {
                    warn!("Command panicked");
                    response.apply_error(&CommandError::Other(anyhow::anyhow!(
                        "command execution panicked"
                    )));
                }
            }
        } else {
            debug!("Command is waiting for more input");
        }

        response.duration_ms = elapsed_ms(started);
        response
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

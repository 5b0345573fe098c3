//! Readiness decision for a partially bound argument set.
//!
//! [`resolve_chain`] runs once per invocation in two passes:
//!
//! 1. Every chain entry is normalized: an unset value falls back to the
//!    declared default (written back onto the argument struct) and an
//!    [`ArgumentInfo`] record is produced for it, satisfied or not.
//! 2. Every required entry still unset blocks execution. The loaders of all
//!    such entries run concurrently against the current partial arguments,
//!    each bounded by the context's loader timeout, and their suggestions are
//!    attached to the matching records.
//!
//! A failing, panicking or slow loader only empties its own suggestion list.

use std::{future::Future, panic::AssertUnwindSafe, time::Duration};

use futures::{FutureExt, future::join_all};
use tracing::{debug, instrument, warn};

use crate::{
    ArgumentChain, ArgumentDefinition, ArgumentInfo, ArgumentOption, CommandContext,
    CommandError, CommandResponse,
};

/// Decides whether `args` satisfies `chain`.
///
/// Records an observability entry for every argument into
/// `response.arguments` and returns `true` only when every required argument
/// has a non-empty value. When it returns `false` the response keeps its
/// success status and carries the suggestions gathered for each missing
/// argument.
#[instrument(level = "debug", skip_all, fields(arguments = chain.len()))]
pub async fn resolve_chain<A>(
    chain: &ArgumentChain<A>,
    ctx: &CommandContext,
    args: &mut A,
    response: &mut CommandResponse,
) -> bool
where
    A: Clone + Send + 'static,
{
    let mut records = Vec::with_capacity(chain.len());
    let mut missing = Vec::new();

    for argument in chain.iter() {
        let (record, satisfied) = normalize(argument, args);
        if !satisfied {
            missing.push((records.len(), argument));
        }
        records.push(record);
    }

    let ready = missing.is_empty();
    if !ready {
        let names: Vec<&str> = missing.iter().map(|(_, argument)| argument.name()).collect();
        debug!(missing = ?names, "Required arguments unresolved");
        response.message = format!("Missing required arguments: {}", names.join(", "));

        let snapshot = args.clone();
        let timeout = ctx.loader_timeout();
        let pending = missing.iter().map(|&(_, argument)| {
            let ctx = ctx.clone();
            let snapshot = snapshot.clone();
            let load = async move {
                match argument.load(ctx, snapshot) {
                    Some(load) => load.await.map(Some),
                    None => Ok(None),
                }
            };
            suggest(argument.name(), load, timeout)
        });
        let suggestions = join_all(pending).await;

        for ((index, _), values) in missing.iter().zip(suggestions) {
            if let Some(values) = values {
                records[*index].values = Some(values);
            }
        }
    }

    response.arguments = Some(records);
    ready
}

/// Applies the default when needed and builds the argument's record.
fn normalize<A>(argument: &ArgumentDefinition<A>, args: &mut A) -> (ArgumentInfo, bool) {
    let descriptor = argument.descriptor();
    let supplied = argument.value(args);
    let default = descriptor
        .default_value
        .clone()
        .filter(|value| !value.is_empty());

    let value = match (&supplied, &default) {
        (Some(value), _) => Some(value.clone()),
        (None, Some(default)) => {
            argument.assign(args, default.clone());
            Some(default.clone())
        }
        (None, None) => None,
    };

    let record = ArgumentInfo {
        name: descriptor.name.clone(),
        description: descriptor.description.clone(),
        value: value.clone().unwrap_or_default(),
        command: argument.command_example().to_string(),
        default: if supplied.is_none() { default } else { None },
        values: None,
        required: descriptor.required.then_some(true),
    };

    (record, !descriptor.required || value.is_some())
}

/// Runs one loader, starting it inside the unwind guard so a loader that
/// panics before returning its future is contained too. `None` means the
/// argument has no loader.
async fn suggest<F>(name: &str, load: F, timeout: Duration) -> Option<Vec<ArgumentOption>>
where
    F: Future<Output = Result<Option<Vec<ArgumentOption>>, CommandError>>,
{
    match tokio::time::timeout(timeout, AssertUnwindSafe(load).catch_unwind()).await {
        Ok(Ok(Ok(None))) => None,
        Ok(Ok(Ok(Some(values)))) => {
            debug!(argument = %name, count = values.len(), "Loaded suggestions");
            Some(values)
        }
        Ok(Ok(Err(err))) => {
            warn!(argument = %name, error = %err, "Value loader failed");
            Some(Vec::new())
        }
        Ok(Err(_)) => {
            warn!(argument = %name, "Value loader panicked");
            Some(Vec::new())
        }
        Err(_) => {
            warn!(
                argument = %name,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "Value loader timed out"
            );
            Some(Vec::new())
        }
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use azops_core::{ArgumentChain, ChainError, CommandContext, CommandError, Operation};
use serde_json::{Value, json};

use crate::{CatalogDefaults, GlobalArgs, ResourceService, global_arguments};

/// `azops subscription list`
pub struct SubscriptionList {
    chain: ArgumentChain<GlobalArgs>,
}

impl SubscriptionList {
    /// # Errors
    ///
    /// Returns [`ChainError`] if the argument chain is inconsistent.
    pub fn new(defaults: &CatalogDefaults) -> Result<Self, ChainError> {
        Ok(Self {
            chain: ArgumentChain::new(global_arguments(defaults))?,
        })
    }
}

#[async_trait]
impl Operation for SubscriptionList {
    type Args = GlobalArgs;

    fn name(&self) -> &str {
        "list"
    }

    fn description(&self) -> &str {
        "List all subscriptions available to the signed-in account. Returns each \
         subscription's ID, display name, state and tenant."
    }

    fn chain(&self) -> &ArgumentChain<GlobalArgs> {
        &self.chain
    }

    async fn execute(&self, ctx: &CommandContext, args: GlobalArgs) -> Result<Value, CommandError> {
        let service = ctx.service::<Arc<dyn ResourceService>>()?;
        let scope = args.scope(ctx).await?;
        let subscriptions = service.list_subscriptions(&scope).await?;
        Ok(json!({ "subscriptions": subscriptions }))
    }
}

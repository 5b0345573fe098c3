use std::sync::Arc;

use async_trait::async_trait;
use azops_core::{ArgumentChain, ChainError, CommandContext, CommandError, Operation};
use serde_json::{Value, json};

use crate::{CatalogDefaults, ResourceService, SubscriptionArgs, subscription_chain};

/// `azops group list`
pub struct GroupList {
    chain: ArgumentChain<SubscriptionArgs>,
}

impl GroupList {
    /// # Errors
    ///
    /// Returns [`ChainError`] if the argument chain is inconsistent.
    pub fn new(defaults: &CatalogDefaults) -> Result<Self, ChainError> {
        Ok(Self {
            chain: subscription_chain(defaults, Vec::new())?,
        })
    }
}

#[async_trait]
impl Operation for GroupList {
    type Args = SubscriptionArgs;

    fn name(&self) -> &str {
        "list"
    }

    fn description(&self) -> &str {
        "List all resource groups in a subscription. Returns each group's name, ID and location."
    }

    fn chain(&self) -> &ArgumentChain<SubscriptionArgs> {
        &self.chain
    }

    async fn execute(
        &self,
        ctx: &CommandContext,
        args: SubscriptionArgs,
    ) -> Result<Value, CommandError> {
        let subscription = args
            .subscription
            .as_deref()
            .ok_or_else(|| CommandError::MissingArgument("subscription-id".to_string()))?;
        let service = ctx.service::<Arc<dyn ResourceService>>()?;
        let scope = args.global.scope(ctx).await?;
        let groups = service.list_resource_groups(&scope, subscription).await?;
        Ok(json!({ "groups": groups }))
    }
}

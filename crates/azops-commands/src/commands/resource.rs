use std::sync::Arc;

use async_trait::async_trait;
use azops_core::{ArgumentChain, ChainError, CommandContext, CommandError, Operation};
use serde_json::{Map, Value};

use crate::{
    CatalogDefaults, ResourceListArgs, ResourceService, ResourceType, resource_group_argument,
    subscription_chain,
};

/// Lists every resource of one type in a subscription, optionally narrowed
/// to a resource group. Results are returned under `results_key`.
pub struct ResourceList {
    name: &'static str,
    description: &'static str,
    resource_type: ResourceType,
    results_key: &'static str,
    chain: ArgumentChain<ResourceListArgs>,
}

impl ResourceList {
    /// # Errors
    ///
    /// Returns [`ChainError`] if the argument chain is inconsistent.
    pub fn new(
        defaults: &CatalogDefaults,
        name: &'static str,
        description: &'static str,
        resource_type: ResourceType,
        results_key: &'static str,
    ) -> Result<Self, ChainError> {
        Ok(Self {
            name,
            description,
            resource_type,
            results_key,
            chain: subscription_chain(defaults, vec![resource_group_argument(false)])?,
        })
    }
}

#[async_trait]
impl Operation for ResourceList {
    type Args = ResourceListArgs;

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn chain(&self) -> &ArgumentChain<ResourceListArgs> {
        &self.chain
    }

    async fn execute(
        &self,
        ctx: &CommandContext,
        args: ResourceListArgs,
    ) -> Result<Value, CommandError> {
        let subscription = args
            .subscription
            .as_deref()
            .ok_or_else(|| CommandError::MissingArgument("subscription-id".to_string()))?;
        let service = ctx.service::<Arc<dyn ResourceService>>()?;
        let scope = args.global.scope(ctx).await?;
        let resources = service
            .list_resources(
                &scope,
                subscription,
                args.resource_group.as_deref().filter(|group| !group.is_empty()),
                self.resource_type,
            )
            .await?;

        let mut results = Map::new();
        results.insert(
            self.results_key.to_string(),
            serde_json::to_value(resources).map_err(|err| CommandError::Other(err.into()))?,
        );
        Ok(Value::Object(results))
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use azops_core::{
    ArgumentChain, ArgumentDefinition, ArgumentOption, ChainError, CommandContext, CommandError,
    Operation,
};
use serde_json::{Value, json};
use tracing::debug;

use super::resource::ResourceList;
use crate::{
    CatalogDefaults, GlobalArgs, GlobalOptions, ResourceGroupOptions, ResourceService,
    STORAGE_ACCOUNTS, SubscriptionOptions, resource_group_argument, subscription_chain,
};

/// `azops storage account list`
///
/// # Errors
///
/// Returns [`ChainError`] if the argument chain is inconsistent.
pub fn account_list(defaults: &CatalogDefaults) -> Result<ResourceList, ChainError> {
    ResourceList::new(
        defaults,
        "list",
        "List storage accounts in a subscription, optionally filtered by resource group. \
         Returns each account's name, location, kind and properties.",
        STORAGE_ACCOUNTS,
        "accounts",
    )
}

/// Arguments of `azops storage blob container list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerListArgs {
    pub global: GlobalArgs,
    pub subscription: Option<String>,
    pub resource_group: Option<String>,
    pub account: Option<String>,
}

impl GlobalOptions for ContainerListArgs {
    fn global(&self) -> &GlobalArgs {
        &self.global
    }

    fn global_mut(&mut self) -> &mut GlobalArgs {
        &mut self.global
    }
}

impl SubscriptionOptions for ContainerListArgs {
    fn subscription(&self) -> Option<&str> {
        self.subscription.as_deref()
    }

    fn set_subscription(&mut self, subscription: String) {
        self.subscription = Some(subscription);
    }
}

impl ResourceGroupOptions for ContainerListArgs {
    fn resource_group(&self) -> Option<&str> {
        self.resource_group.as_deref()
    }

    fn set_resource_group(&mut self, resource_group: String) {
        self.resource_group = Some(resource_group);
    }
}

/// Required `account`, suggesting the storage accounts of the bound
/// subscription and, when bound, resource group.
fn account_argument() -> ArgumentDefinition<ContainerListArgs> {
    ArgumentDefinition::new(
        "account",
        "The name of the Azure Storage account",
        |args: &ContainerListArgs| args.account.clone(),
        |args: &mut ContainerListArgs, value| args.account = Some(value),
    )
    .required()
    .with_loader(|ctx: CommandContext, args: ContainerListArgs| async move {
        let Some(subscription) = args.subscription.clone() else {
            debug!("No subscription bound, skipping storage account suggestions");
            return Ok(Vec::new());
        };
        let service = ctx.service::<Arc<dyn ResourceService>>()?;
        let scope = args.global.scope(&ctx).await?;
        let accounts = service
            .list_resources(
                &scope,
                &subscription,
                args.resource_group.as_deref(),
                STORAGE_ACCOUNTS,
            )
            .await?;
        Ok(accounts
            .iter()
            .map(|account| {
                let label = match account.resource_group() {
                    Some(group) => format!("{} ({group})", account.name),
                    None => account.name.clone(),
                };
                ArgumentOption::new(account.name.clone(), label)
            })
            .collect())
    })
}

/// `azops storage blob container list`
pub struct ContainerList {
    chain: ArgumentChain<ContainerListArgs>,
}

impl ContainerList {
    /// # Errors
    ///
    /// Returns [`ChainError`] if the argument chain is inconsistent.
    pub fn new(defaults: &CatalogDefaults) -> Result<Self, ChainError> {
        Ok(Self {
            chain: subscription_chain(
                defaults,
                vec![resource_group_argument(true), account_argument()],
            )?,
        })
    }
}

#[async_trait]
impl Operation for ContainerList {
    type Args = ContainerListArgs;

    fn name(&self) -> &str {
        "list"
    }

    fn description(&self) -> &str {
        "List blob containers in a storage account. Returns each container's name, ID and \
         properties."
    }

    fn chain(&self) -> &ArgumentChain<ContainerListArgs> {
        &self.chain
    }

    async fn execute(
        &self,
        ctx: &CommandContext,
        args: ContainerListArgs,
    ) -> Result<Value, CommandError> {
        let (Some(subscription), Some(resource_group), Some(account)) = (
            args.subscription.as_deref(),
            args.resource_group.as_deref(),
            args.account.as_deref(),
        ) else {
            return Err(CommandError::MissingArgument(
                "subscription-id, resource-group and account".to_string(),
            ));
        };
        let service = ctx.service::<Arc<dyn ResourceService>>()?;
        let scope = args.global.scope(ctx).await?;
        let containers = service
            .list_blob_containers(&scope, subscription, resource_group, account)
            .await?;
        Ok(json!({ "containers": containers }))
    }
}

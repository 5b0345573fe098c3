//! The azops operation catalog.

pub mod appconfig;
pub mod group;
pub mod monitor;
pub mod resource;
pub mod storage;
pub mod subscription;
pub mod tools;

use std::sync::Arc;

use azops_core::{ChainError, CommandRegistry, RegistryBuilder, RegistryError};

use crate::CatalogDefaults;

/// Name of the root group; prefixes every flattened command name.
pub const ROOT_NAME: &str = "azops";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Builds the full command registry.
///
/// # Errors
///
/// Returns [`CatalogError`] if an argument chain or the command tree is
/// inconsistent.
pub fn build_registry(defaults: &CatalogDefaults) -> Result<CommandRegistry, CatalogError> {
    let registry = RegistryBuilder::new(ROOT_NAME, "Azure resource operations for people and agents")
        .group("subscription", "Subscription operations")
        .group("group", "Resource group operations")
        .group("storage", "Storage operations")
        .group("storage account", "Storage account operations")
        .group("storage blob", "Blob storage operations")
        .group("storage blob container", "Blob container operations")
        .group("monitor", "Azure Monitor operations")
        .group("monitor workspace", "Log Analytics workspace operations")
        .group("appconfig", "App Configuration operations")
        .group("appconfig account", "App Configuration store operations")
        .group("tools", "Command catalog introspection")
        .command(
            "subscription list",
            Arc::new(subscription::SubscriptionList::new(defaults)?),
        )
        .command("group list", Arc::new(group::GroupList::new(defaults)?))
        .command("storage account list", Arc::new(storage::account_list(defaults)?))
        .command(
            "storage blob container list",
            Arc::new(storage::ContainerList::new(defaults)?),
        )
        .command(
            "monitor workspace list",
            Arc::new(monitor::workspace_list(defaults)?),
        )
        .command("appconfig account list", Arc::new(appconfig::account_list(defaults)?))
        .command("tools list", Arc::new(tools::ToolsList::new()))
        .build()?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use azops_core::{CommandContext, CommandResponse, TokenCache};
    use serde_json::json;

    use super::*;
    use crate::{InMemoryResourceService, LOG_ANALYTICS_WORKSPACES, ResourceService, STORAGE_ACCOUNTS};

    fn service() -> InMemoryResourceService {
        InMemoryResourceService::new()
            .with_subscription("sub-1", "Primary")
            .with_subscription("sub-2", "Secondary")
            .with_resource_group("sub-1", "rg-a", "eastus")
            .with_resource_group("sub-1", "rg-b", "westus")
            .with_resource("sub-1", "rg-a", STORAGE_ACCOUNTS, "acct1")
            .with_resource("sub-1", "rg-b", STORAGE_ACCOUNTS, "acct2")
            .with_resource("sub-1", "rg-a", LOG_ANALYTICS_WORKSPACES, "logs")
            .with_container("sub-1", "rg-a", "acct1", "images")
    }

    fn context(service: &InMemoryResourceService) -> CommandContext {
        let service: Arc<dyn ResourceService> = Arc::new(service.clone());
        CommandContext::new()
            .with_service(service)
            .with_tokens(Arc::new(TokenCache::fixed(Some("token".to_string()))))
    }

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    async fn run(
        registry: &CommandRegistry,
        ctx: &CommandContext,
        name: &str,
        raw: &[&str],
    ) -> CommandResponse {
        registry.get(name).unwrap().run_tokens(ctx, tokens(raw)).await
    }

    fn suggestions(response: &CommandResponse, name: &str) -> Option<Vec<String>> {
        response
            .arguments
            .as_ref()
            .unwrap()
            .iter()
            .find(|info| info.name == name)
            .unwrap()
            .values
            .as_ref()
            .map(|values| values.iter().map(|value| value.id.clone()).collect())
    }

    #[test]
    fn test_catalog_flattened_names() {
        let registry = build_registry(&CatalogDefaults::default()).unwrap();
        let names: Vec<&str> = registry.commands().keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "azops-appconfig-account-list",
                "azops-group-list",
                "azops-monitor-workspace-list",
                "azops-storage-account-list",
                "azops-storage-blob-container-list",
                "azops-subscription-list",
                "azops-tools-list",
            ]
        );
        assert!(registry.get("azops-tools-list").unwrap().hidden());
    }

    #[tokio::test]
    async fn test_resource_group_suggestions_follow_bound_subscription() {
        let service = service();
        let ctx = context(&service);
        let registry = build_registry(&CatalogDefaults::default()).unwrap();

        let response = run(
            &registry,
            &ctx,
            "azops-storage-blob-container-list",
            &["--subscription-id", "sub-1"],
        )
        .await;

        assert_eq!(response.status, 200);
        assert!(response.results.is_none());
        assert_eq!(
            suggestions(&response, "resource-group"),
            Some(vec!["rg-a".to_string(), "rg-b".to_string()])
        );
        assert_eq!(
            suggestions(&response, "account"),
            Some(vec!["acct1".to_string(), "acct2".to_string()])
        );
        assert!(service.calls().contains(&"list_resource_groups:sub-1".to_string()));

        let response = run(
            &registry,
            &ctx,
            "azops-storage-blob-container-list",
            &[
                "--subscription-id",
                "sub-1",
                "--resource-group",
                "rg-a",
                "--account",
                "acct1",
            ],
        )
        .await;
        assert_eq!(response.status, 200);
        assert!(response.arguments.is_none());
        assert_eq!(
            response.results.unwrap()["containers"][0]["name"],
            json!("images")
        );
    }

    #[tokio::test]
    async fn test_missing_subscription_is_suggested() {
        let service = service();
        let ctx = context(&service);
        let registry = build_registry(&CatalogDefaults::default()).unwrap();

        let response = run(&registry, &ctx, "azops-group-list", &[]).await;

        assert!(response.needs_input());
        assert_eq!(
            suggestions(&response, "subscription-id"),
            Some(vec!["sub-1".to_string(), "sub-2".to_string()])
        );
        assert_eq!(response.message, "Missing required arguments: subscription-id");
    }

    #[tokio::test]
    async fn test_configured_subscription_default_runs_immediately() {
        let service = service();
        let ctx = context(&service);
        let defaults = CatalogDefaults {
            subscription_id: Some("sub-1".to_string()),
            ..CatalogDefaults::default()
        };
        let registry = build_registry(&defaults).unwrap();

        let response = run(&registry, &ctx, "azops-monitor-workspace-list", &[]).await;

        assert_eq!(response.status, 200);
        assert_eq!(response.results.unwrap()["workspaces"][0]["name"], json!("logs"));
    }

    #[tokio::test]
    async fn test_service_status_passes_through() {
        let service = service();
        let ctx = context(&service);
        let registry = build_registry(&CatalogDefaults::default()).unwrap();

        let response = run(
            &registry,
            &ctx,
            "azops-group-list",
            &["--subscription-id", "sub-404"],
        )
        .await;

        assert_eq!(response.status, 404);
        assert!(response.message.starts_with("SubscriptionNotFound"));
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let service = service();
        let ctx = CommandContext::new().with_service::<Arc<dyn ResourceService>>(Arc::new(service));
        let registry = build_registry(&CatalogDefaults::default()).unwrap();

        let response = run(&registry, &ctx, "azops-subscription-list", &[]).await;
        assert_eq!(response.status, 401);
    }

    #[tokio::test]
    async fn test_tools_list_describes_catalog() {
        let registry = Arc::new(build_registry(&CatalogDefaults::default()).unwrap());
        let ctx = CommandContext::new().with_service(registry.clone());

        let response = run(&registry, &ctx, "azops-tools-list", &[]).await;

        let commands = response.results.unwrap()["commands"].clone();
        let commands = commands.as_array().unwrap();
        assert_eq!(commands.len(), registry.len());
        let group_list = commands
            .iter()
            .find(|command| command["name"] == "azops-group-list")
            .unwrap();
        let subscription = group_list["arguments"]
            .as_array()
            .unwrap()
            .iter()
            .find(|argument| argument["name"] == "subscription-id")
            .unwrap();
        assert_eq!(subscription["required"], json!(true));
        assert_eq!(subscription["type"], json!("string"));
    }
}

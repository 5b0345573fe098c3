use async_trait::async_trait;
use azops_core::CommandError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::RequestScope;

/// An ARM resource type listed through the generic provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceType {
    /// Provider namespace and type, e.g. `Microsoft.Storage/storageAccounts`.
    pub provider: &'static str,
    pub api_version: &'static str,
}

pub const STORAGE_ACCOUNTS: ResourceType = ResourceType {
    provider: "Microsoft.Storage/storageAccounts",
    api_version: "2023-05-01",
};

pub const LOG_ANALYTICS_WORKSPACES: ResourceType = ResourceType {
    provider: "Microsoft.OperationalInsights/workspaces",
    api_version: "2022-10-01",
};

pub const APP_CONFIGURATION_STORES: ResourceType = ResourceType {
    provider: "Microsoft.AppConfiguration/configurationStores",
    api_version: "2023-03-01",
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub subscription_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
}

/// A tracked resource as returned by a provider list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
}

impl Resource {
    /// Resource group segment of the resource ID.
    pub fn resource_group(&self) -> Option<&str> {
        let mut segments = self.id.split('/');
        segments
            .by_ref()
            .find(|segment| segment.eq_ignore_ascii_case("resourceGroups"))?;
        segments.next().filter(|segment| !segment.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobContainer {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
}

/// Management-plane collaborator used by operations and loaders.
///
/// Registered in the [`azops_core::CommandContext`] as
/// `Arc<dyn ResourceService>`.
#[async_trait]
pub trait ResourceService: Send + Sync {
    async fn list_subscriptions(
        &self,
        scope: &RequestScope,
    ) -> Result<Vec<Subscription>, CommandError>;

    async fn list_resource_groups(
        &self,
        scope: &RequestScope,
        subscription: &str,
    ) -> Result<Vec<ResourceGroup>, CommandError>;

    /// Lists resources of one type in a subscription, or in one of its
    /// resource groups.
    async fn list_resources(
        &self,
        scope: &RequestScope,
        subscription: &str,
        resource_group: Option<&str>,
        resource_type: ResourceType,
    ) -> Result<Vec<Resource>, CommandError>;

    async fn list_blob_containers(
        &self,
        scope: &RequestScope,
        subscription: &str,
        resource_group: &str,
        account: &str,
    ) -> Result<Vec<BlobContainer>, CommandError>;
}

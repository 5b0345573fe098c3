//! In-memory [`ResourceService`] for offline use and tests.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use azops_core::CommandError;
use serde_json::Value;

use crate::{
    BlobContainer, RequestScope, Resource, ResourceGroup, ResourceService, ResourceType,
    Subscription,
};

/// Fixed catalog of subscriptions, groups, resources and containers.
///
/// Every call is recorded so callers can check what a loader asked for.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceService {
    subscriptions: Vec<Subscription>,
    groups: BTreeMap<String, Vec<ResourceGroup>>,
    resources: Vec<(String, Resource)>,
    containers: BTreeMap<(String, String, String), Vec<BlobContainer>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl InMemoryResourceService {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_subscription(mut self, id: &str, display_name: &str) -> Self {
        self.subscriptions.push(Subscription {
            subscription_id: id.to_string(),
            display_name: display_name.to_string(),
            state: Some("Enabled".to_string()),
            tenant_id: None,
        });
        self.groups.entry(id.to_string()).or_default();
        self
    }

    #[must_use]
    pub fn with_resource_group(mut self, subscription: &str, name: &str, location: &str) -> Self {
        self.groups
            .entry(subscription.to_string())
            .or_default()
            .push(ResourceGroup {
                id: format!("/subscriptions/{subscription}/resourceGroups/{name}"),
                name: name.to_string(),
                location: location.to_string(),
            });
        self
    }

    #[must_use]
    pub fn with_resource(
        mut self,
        subscription: &str,
        resource_group: &str,
        resource_type: ResourceType,
        name: &str,
    ) -> Self {
        self.resources.push((
            subscription.to_string(),
            Resource {
                id: format!(
                    "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/{}/{name}",
                    resource_type.provider
                ),
                name: name.to_string(),
                resource_type: resource_type.provider.to_string(),
                location: None,
                kind: None,
                properties: Value::Null,
            },
        ));
        self
    }

    #[must_use]
    pub fn with_container(
        mut self,
        subscription: &str,
        resource_group: &str,
        account: &str,
        name: &str,
    ) -> Self {
        self.containers
            .entry((
                subscription.to_string(),
                resource_group.to_string(),
                account.to_string(),
            ))
            .or_default()
            .push(BlobContainer {
                id: format!(
                    "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.Storage/storageAccounts/{account}/blobServices/default/containers/{name}"
                ),
                name: name.to_string(),
                properties: Value::Null,
            });
        self
    }

    /// Calls received so far, as `method:arg,arg`.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn known_subscription(&self, subscription: &str) -> Result<(), CommandError> {
        if self.groups.contains_key(subscription) {
            Ok(())
        } else {
            Err(CommandError::service(
                404,
                format!("SubscriptionNotFound: subscription '{subscription}' could not be found"),
            ))
        }
    }
}

#[async_trait]
impl ResourceService for InMemoryResourceService {
    async fn list_subscriptions(
        &self,
        _scope: &RequestScope,
    ) -> Result<Vec<Subscription>, CommandError> {
        self.record("list_subscriptions".to_string());
        Ok(self.subscriptions.clone())
    }

    async fn list_resource_groups(
        &self,
        _scope: &RequestScope,
        subscription: &str,
    ) -> Result<Vec<ResourceGroup>, CommandError> {
        self.record(format!("list_resource_groups:{subscription}"));
        self.known_subscription(subscription)?;
        Ok(self.groups.get(subscription).cloned().unwrap_or_default())
    }

    async fn list_resources(
        &self,
        _scope: &RequestScope,
        subscription: &str,
        resource_group: Option<&str>,
        resource_type: ResourceType,
    ) -> Result<Vec<Resource>, CommandError> {
        self.record(format!(
            "list_resources:{subscription},{},{}",
            resource_group.unwrap_or("*"),
            resource_type.provider
        ));
        self.known_subscription(subscription)?;
        Ok(self
            .resources
            .iter()
            .filter(|(owner, resource)| {
                owner == subscription
                    && resource.resource_type == resource_type.provider
                    && resource_group.is_none_or(|group| resource.resource_group() == Some(group))
            })
            .map(|(_, resource)| resource.clone())
            .collect())
    }

    async fn list_blob_containers(
        &self,
        _scope: &RequestScope,
        subscription: &str,
        resource_group: &str,
        account: &str,
    ) -> Result<Vec<BlobContainer>, CommandError> {
        self.record(format!(
            "list_blob_containers:{subscription},{resource_group},{account}"
        ));
        self.known_subscription(subscription)?;
        self.containers
            .get(&(
                subscription.to_string(),
                resource_group.to_string(),
                account.to_string(),
            ))
            .cloned()
            .ok_or_else(|| {
                CommandError::service(
                    404,
                    format!("ResourceNotFound: storage account '{account}' was not found"),
                )
            })
    }
}

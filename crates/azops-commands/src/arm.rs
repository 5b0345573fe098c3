//! Azure Resource Manager REST client.
//!
//! List endpoints are paged through `nextLink`. Throttling, server errors
//! and transport failures are retried according to the request's
//! [`RetryPolicy`](crate::RetryPolicy); any other failure is returned as-is
//! and its HTTP status passes through to the command response.

use std::time::Duration;

use async_trait::async_trait;
use azops_core::{CommandError, DEFAULT_ARM_ENDPOINT};
use backon::{ConstantBuilder, ExponentialBuilder, Retryable};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    BlobContainer, RequestScope, Resource, ResourceGroup, ResourceService, ResourceType,
    RetryMode, Subscription,
};

const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";
const RESOURCE_GROUPS_API_VERSION: &str = "2021-04-01";
const BLOB_CONTAINERS_API_VERSION: &str = "2023-05-01";

/// Upper bound on followed `nextLink`s for one listing.
const MAX_PAGES: usize = 200;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ArmError {
    #[error("ARM request failed ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("ARM request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid ARM response: {0}")]
    Decode(String),

    #[error("invalid ARM endpoint: {0}")]
    Endpoint(String),
}

impl ArmError {
    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => {
                matches!(status, 408 | 429) || ((500..=599).contains(status) && *status != 501)
            }
            Self::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Decode(_) | Self::Endpoint(_) => false,
        }
    }
}

impl From<ArmError> for CommandError {
    fn from(err: ArmError) -> Self {
        match err {
            ArmError::Status { status, message } => CommandError::Service { status, message },
            ArmError::Http(err) if err.is_timeout() => CommandError::service(504, err.to_string()),
            other => CommandError::Other(other.into()),
        }
    }
}

#[derive(Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// [`ResourceService`] backed by the ARM REST API.
#[derive(Debug, Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: String,
}

impl Default for ArmClient {
    fn default() -> Self {
        Self::new(DEFAULT_ARM_ENDPOINT)
    }
}

impl ArmClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    /// Endpoint URL with `segments` appended, each one percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, ArmError> {
        let mut url = reqwest::Url::parse(&self.endpoint)
            .map_err(|err| ArmError::Endpoint(format!("{}: {err}", self.endpoint)))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| ArmError::Endpoint(format!("{} is not absolute", self.endpoint)))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Fetches every page of a list endpoint.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable failure, or the last failure once
    /// retries are exhausted.
    pub async fn list<T: DeserializeOwned>(
        &self,
        scope: &RequestScope,
        segments: &[&str],
        api_version: &str,
    ) -> Result<Vec<T>, ArmError> {
        let first = self.url(segments)?;
        let path = first.path().to_string();
        let mut page: Page<T> = self.fetch(scope, first.as_str(), Some(api_version)).await?;
        let mut items = std::mem::take(&mut page.value);
        let mut pages = 1;

        while let Some(next) = page.next_link.take().filter(|link| !link.is_empty()) {
            if pages == MAX_PAGES {
                warn!(path = %path, pages, "Stopped following nextLink");
                break;
            }
            debug!(next = %next, "Following nextLink");
            page = self.fetch(scope, &next, None).await?;
            items.append(&mut page.value);
            pages += 1;
        }

        Ok(items)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        scope: &RequestScope,
        url: &str,
        api_version: Option<&str>,
    ) -> Result<Page<T>, ArmError> {
        let policy = &scope.retry;
        let attempt = || self.fetch_once(scope, url, api_version, policy.network_timeout);
        let notify = |err: &ArmError, delay: Duration| {
            warn!(url, error = %err, delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "Retrying ARM request");
        };

        match policy.mode {
            RetryMode::Exponential => {
                attempt
                    .retry(
                        ExponentialBuilder::default()
                            .with_min_delay(policy.delay)
                            .with_max_delay(policy.max_delay)
                            .with_max_times(policy.max_retries),
                    )
                    .when(ArmError::is_transient)
                    .notify(notify)
                    .await
            }
            RetryMode::Fixed => {
                attempt
                    .retry(
                        ConstantBuilder::default()
                            .with_delay(policy.delay)
                            .with_max_times(policy.max_retries),
                    )
                    .when(ArmError::is_transient)
                    .notify(notify)
                    .await
            }
        }
    }

    async fn fetch_once<T: DeserializeOwned>(
        &self,
        scope: &RequestScope,
        url: &str,
        api_version: Option<&str>,
        timeout: Duration,
    ) -> Result<Page<T>, ArmError> {
        let mut request = self
            .http
            .get(url)
            .bearer_auth(&scope.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(timeout);
        if let Some(api_version) = api_version {
            request = request.query(&[("api-version", api_version)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArmError::Status {
                status: status.as_u16(),
                message: error_message(&body, status.canonical_reason()),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|err| ArmError::Decode(err.to_string()))
    }
}

fn error_message(body: &str, reason: Option<&str>) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) if !error.code.is_empty() => {
            format!("{}: {}", error.code, error.message)
        }
        Ok(ErrorEnvelope { error }) => error.message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => reason.unwrap_or("request failed").to_string(),
    }
}

#[async_trait]
impl ResourceService for ArmClient {
    async fn list_subscriptions(
        &self,
        scope: &RequestScope,
    ) -> Result<Vec<Subscription>, CommandError> {
        Ok(self
            .list(scope, &["subscriptions"], SUBSCRIPTIONS_API_VERSION)
            .await?)
    }

    async fn list_resource_groups(
        &self,
        scope: &RequestScope,
        subscription: &str,
    ) -> Result<Vec<ResourceGroup>, CommandError> {
        Ok(self
            .list(
                scope,
                &["subscriptions", subscription, "resourcegroups"],
                RESOURCE_GROUPS_API_VERSION,
            )
            .await?)
    }

    async fn list_resources(
        &self,
        scope: &RequestScope,
        subscription: &str,
        resource_group: Option<&str>,
        resource_type: ResourceType,
    ) -> Result<Vec<Resource>, CommandError> {
        let mut segments = vec!["subscriptions", subscription];
        if let Some(group) = resource_group {
            segments.extend(["resourceGroups", group]);
        }
        segments.push("providers");
        segments.extend(resource_type.provider.split('/'));
        Ok(self
            .list(scope, &segments, resource_type.api_version)
            .await?)
    }

    async fn list_blob_containers(
        &self,
        scope: &RequestScope,
        subscription: &str,
        resource_group: &str,
        account: &str,
    ) -> Result<Vec<BlobContainer>, CommandError> {
        let segments = [
            "subscriptions",
            subscription,
            "resourceGroups",
            resource_group,
            "providers",
            "Microsoft.Storage",
            "storageAccounts",
            account,
            "blobServices",
            "default",
            "containers",
        ];
        Ok(self
            .list(scope, &segments, BLOB_CONTAINERS_API_VERSION)
            .await?)
    }
}

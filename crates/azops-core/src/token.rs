//! Lifecycle-scoped access token cache.
//!
//! Token acquisition is delegated to a [`TokenProvider`]; the cache only
//! remembers what the provider handed out, keyed by tenant and auth method,
//! for as long as the owning [`crate::CommandContext`] lives.

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::CommandError;

/// Source of bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self, tenant: Option<&str>, auth_method: &str) -> Result<String, CommandError>;
}

/// Provider that hands out a single preconfigured token.
#[derive(Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|token| !token.is_empty()),
        }
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(
        &self,
        _tenant: Option<&str>,
        _auth_method: &str,
    ) -> Result<String, CommandError> {
        self.token.clone().ok_or_else(|| {
            CommandError::Unauthorized(
                "no access token configured; set AZURE_ACCESS_TOKEN or [auth] token".to_string(),
            )
        })
    }
}

/// Tokens handed out by a provider, keyed by `(auth method, tenant)`.
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    tokens: RwLock<HashMap<String, String>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Cache over a [`StaticTokenProvider`].
    pub fn fixed(token: Option<String>) -> Self {
        Self::new(Arc::new(StaticTokenProvider::new(token)))
    }

    /// Returns the cached token, asking the provider on first use.
    ///
    /// # Errors
    ///
    /// Propagates the provider's error; failures are not cached.
    pub async fn token(
        &self,
        tenant: Option<&str>,
        auth_method: &str,
    ) -> Result<String, CommandError> {
        let key = format!("{auth_method}:{}", tenant.unwrap_or_default());
        if let Some(token) = self.tokens.read().await.get(&key) {
            return Ok(token.clone());
        }

        debug!(auth_method, tenant = tenant.unwrap_or_default(), "Requesting access token");
        let token = self.provider.token(tenant, auth_method).await?;
        self.tokens.write().await.insert(key, token.clone());
        Ok(token)
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::fixed(None)
    }
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache").finish_non_exhaustive()
    }
}

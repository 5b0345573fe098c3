use std::{any::type_name, sync::Arc, time::Duration};

use http::Extensions;

use crate::{CommandError, TokenCache};

/// Default upper bound for a single value loader.
pub const DEFAULT_LOADER_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-call handle through which operations and loaders reach their
/// collaborators.
///
/// Cloning is cheap; the service map and the token cache are shared.
#[derive(Debug, Clone)]
pub struct CommandContext {
    services: Arc<Extensions>,
    tokens: Arc<TokenCache>,
    loader_timeout: Duration,
}

impl Default for CommandContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandContext {
    pub fn new() -> Self {
        Self {
            services: Arc::new(Extensions::new()),
            tokens: Arc::new(TokenCache::default()),
            loader_timeout: DEFAULT_LOADER_TIMEOUT,
        }
    }

    /// Registers a collaborator, replacing any previous one of the same type.
    ///
    /// Trait objects are registered behind their smart pointer, e.g.
    /// `Arc<dyn ResourceService>`.
    #[must_use]
    pub fn with_service<T: Clone + Send + Sync + 'static>(mut self, service: T) -> Self {
        Arc::make_mut(&mut self.services).insert(service);
        self
    }

    #[must_use]
    pub fn with_tokens(mut self, tokens: Arc<TokenCache>) -> Self {
        self.tokens = tokens;
        self
    }

    #[must_use]
    pub fn with_loader_timeout(mut self, timeout: Duration) -> Self {
        self.loader_timeout = timeout;
        self
    }

    /// Looks up a registered collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::ServiceUnavailable`] when nothing of type `T`
    /// was registered.
    pub fn service<T: Clone + Send + Sync + 'static>(&self) -> Result<T, CommandError> {
        self.services
            .get::<T>()
            .cloned()
            .ok_or(CommandError::ServiceUnavailable(type_name::<T>()))
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    pub fn loader_timeout(&self) -> Duration {
        self.loader_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_service_lookup_by_trait_object() {
        let greeter: Arc<dyn Greeter> = Arc::new(English);
        let ctx = CommandContext::new().with_service(greeter);
        assert_eq!(ctx.service::<Arc<dyn Greeter>>().unwrap().greet(), "hello");
    }

    #[test]
    fn test_missing_service_is_reported() {
        let ctx = CommandContext::new();
        let err = ctx.service::<Arc<dyn Greeter>>().err().unwrap();
        assert!(matches!(err, CommandError::ServiceUnavailable(_)));
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn test_clones_share_registered_services() {
        let base = CommandContext::new().with_loader_timeout(Duration::from_millis(5));
        let ctx = base.clone().with_service(7_u32);
        assert_eq!(ctx.service::<u32>().unwrap(), 7);
        assert!(base.service::<u32>().is_err());
        assert_eq!(ctx.loader_timeout(), Duration::from_millis(5));
    }
}

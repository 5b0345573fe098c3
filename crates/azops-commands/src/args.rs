//! Arguments shared across the catalog.
//!
//! Every chain starts with the global arguments (tenant, auth method and the
//! retry options), followed by `subscription-id` for subscription-scoped
//! operations, followed by the operation's own arguments.

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use azops_core::{
    ArgumentChain, ArgumentDefinition, ArgumentOption, AzopsConfig, ChainError, CommandContext,
    CommandError, RetryConfig, ValueType,
};
use serde::Serialize;
use tracing::debug;

use crate::ResourceService;

pub const DEFAULT_AUTH_METHOD: &str = "credential";

/// Values the catalog uses as argument defaults, usually taken from
/// `azops.toml`.
#[derive(Debug, Clone, Default)]
pub struct CatalogDefaults {
    pub tenant_id: Option<String>,
    pub subscription_id: Option<String>,
    pub auth_method: Option<String>,
    pub retry: RetryConfig,
}

impl CatalogDefaults {
    pub fn from_config(config: &AzopsConfig) -> Self {
        Self {
            tenant_id: config.defaults.tenant_id.clone(),
            subscription_id: config.defaults.subscription_id.clone(),
            auth_method: config.defaults.auth_method.clone(),
            retry: config.retry.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryMode {
    Fixed,
    #[default]
    Exponential,
}

impl FromStr for RetryMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "exponential" => Ok(Self::Exponential),
            other => Err(format!("unknown retry mode `{other}`, expected fixed or exponential")),
        }
    }
}

/// Retry settings forwarded to the service collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub delay: Duration,
    pub max_delay: Duration,
    pub mode: RetryMode,
    pub network_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_millis(800),
            max_delay: Duration::from_secs(60),
            mode: RetryMode::Exponential,
            network_timeout: Duration::from_secs(100),
        }
    }
}

/// Raw retry flags as bound from input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryArgs {
    pub max_retries: Option<String>,
    pub delay: Option<String>,
    pub max_delay: Option<String>,
    pub mode: Option<String>,
    pub network_timeout: Option<String>,
}

impl RetryArgs {
    /// Parses the bound flags over [`RetryPolicy::default`].
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidArgument`] naming the offending flag.
    pub fn policy(&self) -> Result<RetryPolicy, CommandError> {
        let mut policy = RetryPolicy::default();
        if let Some(raw) = present(self.max_retries.as_deref()) {
            policy.max_retries = raw
                .parse()
                .map_err(|_| invalid("retry-max-retries", "expected a non-negative integer"))?;
        }
        if let Some(raw) = present(self.delay.as_deref()) {
            policy.delay = seconds("retry-delay", raw)?;
        }
        if let Some(raw) = present(self.max_delay.as_deref()) {
            policy.max_delay = seconds("retry-max-delay", raw)?;
        }
        if let Some(raw) = present(self.mode.as_deref()) {
            policy.mode = raw.parse().map_err(|reason| invalid("retry-mode", reason))?;
        }
        if let Some(raw) = present(self.network_timeout.as_deref()) {
            policy.network_timeout = seconds("retry-network-timeout", raw)?;
        }
        Ok(policy)
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn seconds(name: &str, raw: &str) -> Result<Duration, CommandError> {
    raw.parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| invalid(name, "expected a non-negative number of seconds"))
}

fn invalid(name: &str, reason: impl Into<String>) -> CommandError {
    CommandError::InvalidArgument {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Arguments every operation accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    pub tenant_id: Option<String>,
    pub auth_method: Option<String>,
    pub retry: RetryArgs,
}

impl GlobalArgs {
    /// Resolves the token and retry policy for one request.
    ///
    /// # Errors
    ///
    /// Fails when the retry flags do not parse or no token is available.
    pub async fn scope(&self, ctx: &CommandContext) -> Result<RequestScope, CommandError> {
        let retry = self.retry.policy()?;
        let auth_method = self
            .auth_method
            .clone()
            .filter(|method| !method.is_empty())
            .unwrap_or_else(|| DEFAULT_AUTH_METHOD.to_string());
        let tenant_id = self.tenant_id.clone().filter(|tenant| !tenant.is_empty());
        let token = ctx.tokens().token(tenant_id.as_deref(), &auth_method).await?;
        Ok(RequestScope {
            token,
            tenant_id,
            auth_method,
            retry,
        })
    }
}

/// Per-request values handed to the service collaborator.
#[derive(Clone, PartialEq)]
pub struct RequestScope {
    pub token: String,
    pub tenant_id: Option<String>,
    pub auth_method: String,
    pub retry: RetryPolicy,
}

impl RequestScope {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            tenant_id: None,
            auth_method: DEFAULT_AUTH_METHOD.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestScope")
            .field("token", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("auth_method", &self.auth_method)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Argument structs carrying [`GlobalArgs`].
pub trait GlobalOptions {
    fn global(&self) -> &GlobalArgs;
    fn global_mut(&mut self) -> &mut GlobalArgs;
}

impl GlobalOptions for GlobalArgs {
    fn global(&self) -> &GlobalArgs {
        self
    }

    fn global_mut(&mut self) -> &mut GlobalArgs {
        self
    }
}

/// Argument structs scoped to a subscription.
pub trait SubscriptionOptions: GlobalOptions {
    fn subscription(&self) -> Option<&str>;
    fn set_subscription(&mut self, subscription: String);
}

/// Argument structs that also carry a resource group.
pub trait ResourceGroupOptions: SubscriptionOptions {
    fn resource_group(&self) -> Option<&str>;
    fn set_resource_group(&mut self, resource_group: String);
}

/// Arguments of subscription-scoped operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionArgs {
    pub global: GlobalArgs,
    pub subscription: Option<String>,
}

impl GlobalOptions for SubscriptionArgs {
    fn global(&self) -> &GlobalArgs {
        &self.global
    }

    fn global_mut(&mut self) -> &mut GlobalArgs {
        &mut self.global
    }
}

impl SubscriptionOptions for SubscriptionArgs {
    fn subscription(&self) -> Option<&str> {
        self.subscription.as_deref()
    }

    fn set_subscription(&mut self, subscription: String) {
        self.subscription = Some(subscription);
    }
}

/// Arguments of operations listing resources in a subscription, optionally
/// narrowed to one resource group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceListArgs {
    pub global: GlobalArgs,
    pub subscription: Option<String>,
    pub resource_group: Option<String>,
}

impl GlobalOptions for ResourceListArgs {
    fn global(&self) -> &GlobalArgs {
        &self.global
    }

    fn global_mut(&mut self) -> &mut GlobalArgs {
        &mut self.global
    }
}

impl SubscriptionOptions for ResourceListArgs {
    fn subscription(&self) -> Option<&str> {
        self.subscription.as_deref()
    }

    fn set_subscription(&mut self, subscription: String) {
        self.subscription = Some(subscription);
    }
}

impl ResourceGroupOptions for ResourceListArgs {
    fn resource_group(&self) -> Option<&str> {
        self.resource_group.as_deref()
    }

    fn set_resource_group(&mut self, resource_group: String) {
        self.resource_group = Some(resource_group);
    }
}

/// `tenant-id`, `auth-method` and the retry options.
pub fn global_arguments<A: GlobalOptions>(
    defaults: &CatalogDefaults,
) -> Vec<ArgumentDefinition<A>> {
    let retry = &defaults.retry;
    vec![
        ArgumentDefinition::new(
            "tenant-id",
            "The Microsoft Entra ID tenant ID or name",
            |args: &A| args.global().tenant_id.clone(),
            |args: &mut A, value| args.global_mut().tenant_id = Some(value),
        )
        .with_default_opt(defaults.tenant_id.clone()),
        ArgumentDefinition::new(
            "auth-method",
            "Authentication method: credential, key or connectionString",
            |args: &A| args.global().auth_method.clone(),
            |args: &mut A, value| args.global_mut().auth_method = Some(value),
        )
        .with_default(
            defaults
                .auth_method
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTH_METHOD.to_string()),
        ),
        ArgumentDefinition::new(
            "retry-max-retries",
            "Maximum number of retry attempts",
            |args: &A| args.global().retry.max_retries.clone(),
            |args: &mut A, value| args.global_mut().retry.max_retries = Some(value),
        )
        .with_value_type(ValueType::Integer)
        .with_default_opt(retry.max_retries.map(|value| value.to_string())),
        ArgumentDefinition::new(
            "retry-delay",
            "Initial delay in seconds between retry attempts",
            |args: &A| args.global().retry.delay.clone(),
            |args: &mut A, value| args.global_mut().retry.delay = Some(value),
        )
        .with_value_type(ValueType::Number)
        .with_default_opt(retry.delay_secs.map(|value| value.to_string())),
        ArgumentDefinition::new(
            "retry-max-delay",
            "Maximum delay in seconds between retries",
            |args: &A| args.global().retry.max_delay.clone(),
            |args: &mut A, value| args.global_mut().retry.max_delay = Some(value),
        )
        .with_value_type(ValueType::Number)
        .with_default_opt(retry.max_delay_secs.map(|value| value.to_string())),
        ArgumentDefinition::new(
            "retry-mode",
            "Retry strategy: fixed or exponential",
            |args: &A| args.global().retry.mode.clone(),
            |args: &mut A, value| args.global_mut().retry.mode = Some(value),
        )
        .with_default_opt(retry.mode.clone()),
        ArgumentDefinition::new(
            "retry-network-timeout",
            "Network operation timeout in seconds",
            |args: &A| args.global().retry.network_timeout.clone(),
            |args: &mut A, value| args.global_mut().retry.network_timeout = Some(value),
        )
        .with_value_type(ValueType::Number)
        .with_default_opt(retry.network_timeout_secs.map(|value| value.to_string())),
    ]
}

/// Required `subscription-id`, suggesting the caller's subscriptions.
pub fn subscription_argument<A>(defaults: &CatalogDefaults) -> ArgumentDefinition<A>
where
    A: SubscriptionOptions + Clone + Send + 'static,
{
    ArgumentDefinition::new(
        "subscription-id",
        "The subscription ID or name",
        |args: &A| args.subscription().map(ToString::to_string),
        |args: &mut A, value| args.set_subscription(value),
    )
    .required()
    .with_default_opt(defaults.subscription_id.clone())
    .with_loader(|ctx: CommandContext, args: A| async move {
        let service = ctx.service::<Arc<dyn ResourceService>>()?;
        let scope = args.global().scope(&ctx).await?;
        let subscriptions = service.list_subscriptions(&scope).await?;
        Ok(subscriptions
            .into_iter()
            .map(|subscription| {
                ArgumentOption::new(subscription.subscription_id, subscription.display_name)
            })
            .collect())
    })
}

/// `resource-group`, suggesting the groups of the bound subscription.
pub fn resource_group_argument<A>(required: bool) -> ArgumentDefinition<A>
where
    A: ResourceGroupOptions + Clone + Send + 'static,
{
    ArgumentDefinition::new(
        "resource-group",
        "The name of the resource group",
        |args: &A| args.resource_group().map(ToString::to_string),
        |args: &mut A, value| args.set_resource_group(value),
    )
    .with_required(required)
    .with_loader(|ctx: CommandContext, args: A| async move {
        let Some(subscription) = args.subscription().map(ToString::to_string) else {
            debug!("No subscription bound, skipping resource group suggestions");
            return Ok(Vec::new());
        };
        let service = ctx.service::<Arc<dyn ResourceService>>()?;
        let scope = args.global().scope(&ctx).await?;
        let groups = service.list_resource_groups(&scope, &subscription).await?;
        Ok(groups
            .into_iter()
            .map(|group| ArgumentOption::new(group.name.clone(), group.name))
            .collect())
    })
}

/// Global arguments, then `subscription-id`, then `own`.
///
/// # Errors
///
/// Returns [`ChainError`] when `own` repeats a common argument name.
pub fn subscription_chain<A>(
    defaults: &CatalogDefaults,
    own: Vec<ArgumentDefinition<A>>,
) -> Result<ArgumentChain<A>, ChainError>
where
    A: SubscriptionOptions + Clone + Send + 'static,
{
    let mut arguments = global_arguments(defaults);
    arguments.push(subscription_argument(defaults));
    arguments.extend(own);
    ArgumentChain::new(arguments)
}

#[cfg(test)]
mod tests {
    use azops_core::{CommandResponse, TokenCache, resolve_chain};

    use super::*;

    fn defaults() -> CatalogDefaults {
        CatalogDefaults {
            subscription_id: Some("sub-config".to_string()),
            retry: RetryConfig {
                max_retries: Some(5),
                mode: Some("fixed".to_string()),
                ..RetryConfig::default()
            },
            ..CatalogDefaults::default()
        }
    }

    #[test]
    fn test_retry_policy_parses_bound_flags() {
        let retry = RetryArgs {
            max_retries: Some("2".to_string()),
            delay: Some("0.5".to_string()),
            mode: Some("Fixed".to_string()),
            ..RetryArgs::default()
        };
        let policy = retry.policy().unwrap();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.delay, Duration::from_millis(500));
        assert_eq!(policy.mode, RetryMode::Fixed);
        assert_eq!(policy.max_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_retry_policy_rejects_bad_values() {
        let retry = RetryArgs {
            mode: Some("linear".to_string()),
            ..RetryArgs::default()
        };
        assert!(matches!(
            retry.policy(),
            Err(CommandError::InvalidArgument { name, .. }) if name == "retry-mode"
        ));

        let retry = RetryArgs {
            delay: Some("-1".to_string()),
            ..RetryArgs::default()
        };
        assert_eq!(retry.policy().unwrap_err().status(), 400);
    }

    #[test]
    fn test_chain_order_is_global_then_subscription_then_own() {
        let chain = subscription_chain::<ResourceListArgs>(
            &defaults(),
            vec![resource_group_argument(false)],
        )
        .unwrap();
        let names: Vec<&str> = chain.iter().map(ArgumentDefinition::name).collect();
        assert_eq!(
            names,
            vec![
                "tenant-id",
                "auth-method",
                "retry-max-retries",
                "retry-delay",
                "retry-max-delay",
                "retry-mode",
                "retry-network-timeout",
                "subscription-id",
                "resource-group",
            ]
        );
    }

    #[test]
    fn test_own_argument_cannot_shadow_common_one() {
        let err = subscription_chain::<SubscriptionArgs>(
            &defaults(),
            vec![subscription_argument(&defaults())],
        )
        .err()
        .unwrap();
        assert_eq!(err, ChainError::DuplicateArgument("subscription-id".to_string()));
    }

    #[tokio::test]
    async fn test_config_defaults_flow_into_bound_arguments() {
        let chain = subscription_chain::<SubscriptionArgs>(&defaults(), Vec::new()).unwrap();
        let mut args = SubscriptionArgs::default();
        let mut response = CommandResponse::default();

        assert!(resolve_chain(&chain, &CommandContext::new(), &mut args, &mut response).await);
        assert_eq!(args.subscription.as_deref(), Some("sub-config"));
        assert_eq!(args.global.auth_method.as_deref(), Some(DEFAULT_AUTH_METHOD));
        assert_eq!(args.global.retry.max_retries.as_deref(), Some("5"));
        assert_eq!(args.global.retry.policy().unwrap().mode, RetryMode::Fixed);
    }

    #[tokio::test]
    async fn test_scope_uses_context_token_cache() {
        let ctx = CommandContext::new()
            .with_tokens(Arc::new(TokenCache::fixed(Some("token-1".to_string()))));
        let scope = GlobalArgs::default().scope(&ctx).await.unwrap();
        assert_eq!(scope.token, "token-1");
        assert_eq!(scope.auth_method, DEFAULT_AUTH_METHOD);
        assert!(!format!("{scope:?}").contains("token-1"));
    }
}

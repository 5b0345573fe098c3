//! Cloud resource operations exposed by azops.
//!
//! Each operation declares its argument chain from the shared building
//! blocks in [`args`] and reaches Azure Resource Manager through the
//! [`ResourceService`] registered in its [`azops_core::CommandContext`].
//! [`build_registry`] assembles the whole catalog.

pub mod args;
mod arm;
pub mod commands;
mod memory;
mod service;

pub use args::{
    CatalogDefaults, DEFAULT_AUTH_METHOD, GlobalArgs, GlobalOptions, RequestScope,
    ResourceGroupOptions, ResourceListArgs, RetryArgs, RetryMode, RetryPolicy, SubscriptionArgs,
    SubscriptionOptions, global_arguments, resource_group_argument, subscription_argument,
    subscription_chain,
};
pub use arm::{ArmClient, ArmError};
pub use commands::{CatalogError, ROOT_NAME, build_registry};
pub use memory::InMemoryResourceService;
pub use service::{
    APP_CONFIGURATION_STORES, BlobContainer, LOG_ANALYTICS_WORKSPACES, Resource, ResourceGroup,
    ResourceService, ResourceType, STORAGE_ACCOUNTS, Subscription,
};

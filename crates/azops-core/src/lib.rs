//! Command registry and progressive argument resolution for azops.
//!
//! Operations are organized in a tree of [`CommandGroup`]s built once by a
//! [`RegistryBuilder`] and addressed by flattened names such as
//! `azops-storage-account-list`. Each operation declares its inputs as an
//! [`ArgumentChain`]; before executing, [`resolve_chain`] applies defaults
//! and, when required inputs are still missing, asks the arguments' loaders
//! for suggestions instead of running the operation.
//!
//! The CLI and the tool adapter share one path per call:
//!
//! ```text
//! raw input -> clap parse -> bind -> resolve_chain -> execute -> CommandResponse
//! ```
//!
//! # Example
//!
//! ```ignore
//! use azops_core::{CommandContext, RegistryBuilder};
//!
//! let registry = RegistryBuilder::new("azops", "Cloud operations")
//!     .group("subscription", "Subscription operations")
//!     .command("subscription list", Arc::new(SubscriptionList::new(&defaults)))
//!     .build()?;
//!
//! let command = registry.get("azops-subscription-list")?;
//! let response = command.run_tokens(&CommandContext::new(), vec![]).await;
//! ```

pub mod argument;
mod command;
mod config;
mod context;
mod error;
mod group;
mod registry;
mod resolve;
mod response;
mod token;

pub use argument::{
    ArgumentChain, ArgumentDefinition, ArgumentDescriptor, ArgumentInfo, ArgumentOption,
    ChainError, ValueType,
};
pub use command::{Command, Operation};
pub use config::{
    ArmConfig, AuthConfig, AzopsConfig, CONFIG_ENV, CONFIG_FILE_NAME, ConfigError,
    DEFAULT_ARM_ENDPOINT, DefaultsConfig, ResolutionConfig, RetryConfig, ServerConfig, TOKEN_ENV,
};
pub use context::{CommandContext, DEFAULT_LOADER_TIMEOUT};
pub use error::CommandError;
pub use group::{CommandGroup, GroupError};
pub use registry::{BuildIssue, CommandRegistry, RegistryBuilder, RegistryError, SEPARATOR};
pub use resolve::resolve_chain;
pub use response::CommandResponse;
pub use token::{StaticTokenProvider, TokenCache, TokenProvider};

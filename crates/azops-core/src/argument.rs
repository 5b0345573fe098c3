//! Argument declarations and the chains operations build from them.
//!
//! An operation declares its inputs as an ordered [`ArgumentChain`]. Each
//! entry is an [`ArgumentDefinition`]: an immutable [`ArgumentDescriptor`]
//! bound to the operation's typed argument struct through an accessor and a
//! setter, optionally paired with an asynchronous value loader that suggests
//! legal values when the argument is missing.
//!
//! The same chain drives three things:
//!
//! - the clap definition used to bind raw input (CLI flags and tool calls
//!   share it),
//! - the JSON schema advertised to tool-calling clients,
//! - the readiness check performed by [`crate::resolve_chain`].

use std::{collections::HashSet, fmt, future::Future, sync::Arc};

use clap::{Arg, ArgMatches};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::{CommandContext, CommandError};

/// Primitive type of an argument value.
///
/// Values always travel as strings; the type drives CLI validation and the
/// `type` tag of the generated tool schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
}

impl ValueType {
    /// JSON schema type name for this value type.
    #[must_use]
    pub fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Checks that `raw` can be read as this type.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message when the value does not parse.
    pub fn validate(self, raw: &str) -> Result<(), String> {
        let ok = match self {
            Self::String => true,
            Self::Integer => raw.trim().parse::<i64>().is_ok(),
            Self::Number => raw.trim().parse::<f64>().is_ok_and(f64::is_finite),
            Self::Boolean => matches!(raw.trim(), "true" | "false"),
        };
        if ok {
            Ok(())
        } else {
            Err(format!("expected a {} value, got `{raw}`", self.json_type()))
        }
    }
}

/// Immutable declaration of one operation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDescriptor {
    /// Stable identifier, used as the `--name` flag and the tool-call key.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Whether the operation can run without this argument.
    pub required: bool,
    /// Value applied when the caller supplies none.
    pub default_value: Option<String>,
    /// Primitive type of the value.
    pub value_type: ValueType,
}

/// A legal value for an argument together with its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentOption {
    pub id: String,
    pub name: String,
}

impl ArgumentOption {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Observability record for one argument of a single invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentInfo {
    pub name: String,
    pub description: String,
    pub value: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<ArgumentOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// Future returned by a value loader.
pub type LoaderFuture = BoxFuture<'static, Result<Vec<ArgumentOption>, CommandError>>;

/// Asynchronous suggestion source for one argument.
///
/// Receives the per-call context and a snapshot of the partially bound
/// arguments, so a loader may read values bound earlier (for example a
/// container loader reading the already chosen account).
pub type ValueLoader<A> = Arc<dyn Fn(CommandContext, A) -> LoaderFuture + Send + Sync>;

/// An [`ArgumentDescriptor`] bound to the typed argument struct `A`.
pub struct ArgumentDefinition<A> {
    descriptor: ArgumentDescriptor,
    command_example: String,
    accessor: fn(&A) -> Option<String>,
    setter: fn(&mut A, String),
    loader: Option<ValueLoader<A>>,
}

impl<A> ArgumentDefinition<A> {
    /// Declares an optional string argument.
    ///
    /// `accessor` reads the current value off the argument struct and
    /// `setter` writes a bound value (or an applied default) back onto it.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        accessor: fn(&A) -> Option<String>,
        setter: fn(&mut A, String),
    ) -> Self {
        let name = name.into();
        let command_example = format!("--{name} <{name}>");
        Self {
            descriptor: ArgumentDescriptor {
                name,
                description: description.into(),
                required: false,
                default_value: None,
                value_type: ValueType::String,
            },
            command_example,
            accessor,
            setter,
            loader: None,
        }
    }

    #[must_use]
    pub fn required(self) -> Self {
        self.with_required(true)
    }

    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.descriptor.required = required;
        self
    }

    #[must_use]
    pub fn with_default(self, value: impl Into<String>) -> Self {
        self.with_default_opt(Some(value.into()))
    }

    /// Sets the default value, or clears it with `None`.
    #[must_use]
    pub fn with_default_opt(mut self, value: Option<String>) -> Self {
        self.descriptor.default_value = value;
        self
    }

    #[must_use]
    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.descriptor.value_type = value_type;
        self
    }

    #[must_use]
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.command_example = example.into();
        self
    }

    /// Attaches a value loader that suggests legal values when the argument
    /// is required and missing.
    #[must_use]
    pub fn with_loader<F, Fut>(mut self, loader: F) -> Self
    where
        A: 'static,
        F: Fn(CommandContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<ArgumentOption>, CommandError>> + Send + 'static,
    {
        self.loader = Some(Arc::new(move |ctx, args| -> LoaderFuture {
            Box::pin(loader(ctx, args))
        }));
        self
    }

    pub fn descriptor(&self) -> &ArgumentDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn command_example(&self) -> &str {
        &self.command_example
    }

    /// Current value on `args`; empty strings count as unset.
    pub fn value(&self, args: &A) -> Option<String> {
        (self.accessor)(args).filter(|value| !value.is_empty())
    }

    /// Writes `value` onto `args`.
    pub fn assign(&self, args: &mut A, value: String) {
        (self.setter)(args, value);
    }

    /// Starts the loader, if any, against a snapshot of `args`.
    pub fn load(&self, ctx: CommandContext, args: A) -> Option<LoaderFuture> {
        self.loader.as_ref().map(|loader| loader(ctx, args))
    }

    /// clap definition of this argument.
    ///
    /// Arguments are never marked required at the clap level: a missing
    /// required argument is reported by the resolution engine together with
    /// suggestions instead of failing the parse.
    pub fn clap_arg(&self) -> Arg {
        let value_type = self.descriptor.value_type;
        let mut help = self.descriptor.description.clone();
        if self.descriptor.required {
            help.push_str(" (required)");
        }
        if let Some(default) = &self.descriptor.default_value {
            help.push_str(&format!(" [default: {default}]"));
        }
        Arg::new(self.descriptor.name.clone())
            .long(self.descriptor.name.clone())
            .value_name(self.descriptor.name.to_uppercase().replace('-', "_"))
            .help(help)
            .num_args(1)
            .allow_hyphen_values(true)
            .value_parser(move |raw: &str| value_type.validate(raw).map(|()| raw.to_string()))
    }
}

impl<A> Clone for ArgumentDefinition<A> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            command_example: self.command_example.clone(),
            accessor: self.accessor,
            setter: self.setter,
            loader: self.loader.clone(),
        }
    }
}

impl<A> fmt::Debug for ArgumentDefinition<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentDefinition")
            .field("descriptor", &self.descriptor)
            .field("command_example", &self.command_example)
            .field("has_loader", &self.loader.is_some())
            .finish_non_exhaustive()
    }
}

/// Errors raised while assembling an argument chain.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChainError {
    #[error("duplicate argument name: {0}")]
    DuplicateArgument(String),

    #[error("argument name must not be empty")]
    EmptyName,
}

/// Ordered argument declarations of one operation.
///
/// Order only matters for display; resolution treats every entry
/// independently.
pub struct ArgumentChain<A> {
    arguments: Vec<ArgumentDefinition<A>>,
}

impl<A> ArgumentChain<A> {
    /// Builds a chain, rejecting empty or repeated names.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when a name is empty or appears twice.
    pub fn new(arguments: Vec<ArgumentDefinition<A>>) -> Result<Self, ChainError> {
        let mut seen = HashSet::new();
        for argument in &arguments {
            if argument.name().is_empty() {
                return Err(ChainError::EmptyName);
            }
            if !seen.insert(argument.name().to_string()) {
                return Err(ChainError::DuplicateArgument(argument.name().to_string()));
            }
        }
        Ok(Self { arguments })
    }

    /// A chain with no arguments.
    pub fn empty() -> Self {
        Self {
            arguments: Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArgumentDefinition<A>> {
        self.arguments.iter()
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn descriptors(&self) -> Vec<ArgumentDescriptor> {
        self.arguments
            .iter()
            .map(|argument| argument.descriptor().clone())
            .collect()
    }

    /// clap arguments for every entry, in chain order.
    pub fn clap_args(&self) -> Vec<Arg> {
        self.arguments.iter().map(ArgumentDefinition::clap_arg).collect()
    }
}

impl<A: Default> ArgumentChain<A> {
    /// Binds parsed input onto a fresh argument struct.
    ///
    /// This is the single binder shared by the CLI and the tool adapter.
    pub fn bind(&self, matches: &ArgMatches) -> A {
        let mut args = A::default();
        for argument in &self.arguments {
            if let Ok(Some(value)) = matches.try_get_one::<String>(argument.name()) {
                argument.assign(&mut args, value.clone());
            }
        }
        args
    }
}

impl<A> fmt::Debug for ArgumentChain<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.arguments.iter()).finish()
    }
}

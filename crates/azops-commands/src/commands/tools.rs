use std::sync::Arc;

use async_trait::async_trait;
use azops_core::{ArgumentChain, CommandContext, CommandError, CommandRegistry, Operation};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct CommandSummary<'a> {
    name: &'a str,
    description: &'a str,
    hidden: bool,
    arguments: Vec<ArgumentSummary>,
}

#[derive(Serialize)]
struct ArgumentSummary {
    name: String,
    description: String,
    required: bool,
    #[serde(rename = "type")]
    value_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<String>,
}

/// `azops tools list`: every registered command and its argument shape.
///
/// Reads the `Arc<CommandRegistry>` registered in the context. Hidden, so
/// it is not advertised as a tool.
pub struct ToolsList {
    chain: ArgumentChain<()>,
}

impl ToolsList {
    pub fn new() -> Self {
        Self {
            chain: ArgumentChain::empty(),
        }
    }
}

impl Default for ToolsList {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operation for ToolsList {
    type Args = ();

    fn name(&self) -> &str {
        "list"
    }

    fn description(&self) -> &str {
        "List every available command with its description and arguments."
    }

    fn hidden(&self) -> bool {
        true
    }

    fn chain(&self) -> &ArgumentChain<()> {
        &self.chain
    }

    async fn execute(&self, ctx: &CommandContext, _args: ()) -> Result<Value, CommandError> {
        let registry = ctx.service::<Arc<CommandRegistry>>()?;
        let commands: Vec<CommandSummary<'_>> = registry
            .commands()
            .iter()
            .map(|(name, command)| CommandSummary {
                name,
                description: command.description(),
                hidden: command.hidden(),
                arguments: command
                    .arguments()
                    .into_iter()
                    .map(|descriptor| ArgumentSummary {
                        value_type: descriptor.value_type.json_type(),
                        name: descriptor.name,
                        description: descriptor.description,
                        required: descriptor.required,
                        default: descriptor.default_value,
                    })
                    .collect(),
            })
            .collect();
        Ok(serde_json::json!({ "commands": commands }))
    }
}

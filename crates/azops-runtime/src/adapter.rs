use std::sync::Arc;

use azops_core::{ArgumentDescriptor, CommandContext, CommandRegistry, CommandResponse};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

/// Tool metadata derived from one registered command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    /// Flattened command name, for example `azops-group-list`.
    pub name: String,
    pub description: String,
    pub input_schema: Map<String, Value>,
}

/// Result of dispatching a tool call.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// No command is registered under the requested name.
    NotFound { name: String },
    /// The command ran; the response may still be a negotiation or a failure.
    Completed(CommandResponse),
}

impl ToolOutcome {
    /// Whether the call should be reported to the agent as an error.
    pub fn is_error(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Completed(response) => !response.is_success(),
        }
    }

    /// JSON body handed back to the agent.
    ///
    /// A completed call yields its `results`. When there are none (the call
    /// is waiting for input or failed) the body carries the message and the
    /// per-argument records, so the agent sees the suggestions.
    pub fn body(&self) -> Value {
        match self {
            Self::NotFound { name } => json!({
                "status": 404,
                "message": format!("tool not found: {name}"),
            }),
            Self::Completed(response) => match &response.results {
                Some(results) => results.clone(),
                None => json!({
                    "message": response.message,
                    "arguments": response.arguments.clone().unwrap_or_default(),
                }),
            },
        }
    }
}

/// Exposes a [`CommandRegistry`] as a set of callable tools.
#[derive(Debug, Clone)]
pub struct ToolAdapter {
    registry: Arc<CommandRegistry>,
    context: CommandContext,
}

impl ToolAdapter {
    pub fn new(registry: Arc<CommandRegistry>, context: CommandContext) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    /// Every non-hidden command, in flattened-name order.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry
            .commands()
            .iter()
            .filter(|(_, command)| !command.hidden())
            .map(|(name, command)| ToolDescriptor {
                name: name.clone(),
                description: command.description().to_string(),
                input_schema: input_schema(&command.arguments()),
            })
            .collect()
    }

    /// Runs the command registered as `name` with the given tool arguments.
    ///
    /// Each entry becomes a `--key value` pair parsed by the command's own
    /// clap definition, so the tool path binds exactly like the CLI.
    #[instrument(skip(self, arguments))]
    pub async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> ToolOutcome {
        let Some(command) = self.registry.find(name) else {
            info!("Unknown tool requested");
            return ToolOutcome::NotFound {
                name: name.to_string(),
            };
        };

        let tokens = to_tokens(arguments);
        debug!(count = tokens.len() / 2, "Dispatching tool call");
        let response = command.run_tokens(&self.context, tokens).await;
        info!(
            status = response.status,
            duration_ms = response.duration_ms,
            "Tool call finished"
        );
        ToolOutcome::Completed(response)
    }
}

/// JSON schema for a command's arguments.
///
/// An empty chain yields `{"type":"object"}`.
pub fn input_schema(arguments: &[ArgumentDescriptor]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    if arguments.is_empty() {
        return schema;
    }

    let mut properties = Map::new();
    let mut required = Vec::new();
    for argument in arguments {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(argument.value_type.json_type()));
        property.insert("description".to_string(), json!(argument.description));
        if let Some(default) = &argument.default_value {
            property.insert("default".to_string(), json!(default));
        }
        properties.insert(argument.name.clone(), Value::Object(property));
        if argument.required {
            required.push(json!(argument.name));
        }
    }
    schema.insert("properties".to_string(), Value::Object(properties));
    schema.insert("required".to_string(), Value::Array(required));
    schema
}

fn to_tokens(arguments: Map<String, Value>) -> Vec<String> {
    let mut tokens = Vec::with_capacity(arguments.len() * 2);
    for (key, value) in arguments {
        let value = match value {
            Value::Null => continue,
            Value::String(text) => text,
            other => other.to_string(),
        };
        tokens.push(format!("--{key}"));
        tokens.push(value);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use azops_core::{
        ArgumentChain, ArgumentDefinition, ArgumentOption, CommandError, Operation,
        RegistryBuilder, ValueType,
    };

    use super::*;

    #[derive(Debug, Default, Clone)]
    struct QueryArgs {
        workspace: Option<String>,
        query: Option<String>,
        hours: Option<String>,
    }

    struct Query {
        chain: ArgumentChain<QueryArgs>,
    }

    impl Query {
        fn new() -> Self {
            let chain = ArgumentChain::new(vec![
                ArgumentDefinition::new(
                    "workspace",
                    "Log Analytics workspace",
                    |args: &QueryArgs| args.workspace.clone(),
                    |args: &mut QueryArgs, value| args.workspace = Some(value),
                )
                .required()
                .with_loader(|_ctx, _args: QueryArgs| async {
                    Ok(vec![
                        ArgumentOption::new("logs-a", "logs-a"),
                        ArgumentOption::new("logs-b", "logs-b"),
                    ])
                }),
                ArgumentDefinition::new(
                    "query",
                    "KQL query text",
                    |args: &QueryArgs| args.query.clone(),
                    |args: &mut QueryArgs, value| args.query = Some(value),
                )
                .required(),
                ArgumentDefinition::new(
                    "hours",
                    "Look-back window in hours",
                    |args: &QueryArgs| args.hours.clone(),
                    |args: &mut QueryArgs, value| args.hours = Some(value),
                )
                .with_default("24")
                .with_value_type(ValueType::Integer),
            ])
            .unwrap();
            Self { chain }
        }
    }

    #[async_trait]
    impl Operation for Query {
        type Args = QueryArgs;

        fn name(&self) -> &str {
            "query"
        }

        fn description(&self) -> &str {
            "Run a query against a workspace."
        }

        fn chain(&self) -> &ArgumentChain<QueryArgs> {
            &self.chain
        }

        async fn execute(
            &self,
            _ctx: &CommandContext,
            args: QueryArgs,
        ) -> Result<Value, CommandError> {
            Ok(json!({
                "workspace": args.workspace,
                "query": args.query,
                "hours": args.hours,
            }))
        }
    }

    struct Secret {
        chain: ArgumentChain<()>,
    }

    #[async_trait]
    impl Operation for Secret {
        type Args = ();

        fn name(&self) -> &str {
            "secret"
        }

        fn description(&self) -> &str {
            "Hidden diagnostics."
        }

        fn hidden(&self) -> bool {
            true
        }

        fn chain(&self) -> &ArgumentChain<()> {
            &self.chain
        }

        async fn execute(&self, _ctx: &CommandContext, _args: ()) -> Result<Value, CommandError> {
            Ok(json!({ "ok": true }))
        }
    }

    struct Ping {
        chain: ArgumentChain<()>,
    }

    #[async_trait]
    impl Operation for Ping {
        type Args = ();

        fn name(&self) -> &str {
            "ping"
        }

        fn description(&self) -> &str {
            "Check connectivity."
        }

        fn chain(&self) -> &ArgumentChain<()> {
            &self.chain
        }

        async fn execute(&self, _ctx: &CommandContext, _args: ()) -> Result<Value, CommandError> {
            Ok(json!({ "pong": true }))
        }
    }

    fn adapter() -> ToolAdapter {
        let registry = RegistryBuilder::new("azops", "test")
            .group("monitor", "Monitor")
            .group("tools", "Tools")
            .command("monitor query", Arc::new(Query::new()))
            .command("monitor ping", Arc::new(Ping { chain: ArgumentChain::empty() }))
            .command("tools secret", Arc::new(Secret { chain: ArgumentChain::empty() }))
            .build()
            .unwrap();
        ToolAdapter::new(Arc::new(registry), CommandContext::new())
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_list_tools_skips_hidden_commands() {
        let tools = adapter().list_tools();
        let names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
        assert_eq!(names, vec!["azops-monitor-ping", "azops-monitor-query"]);
    }

    #[test]
    fn test_input_schema_shape() {
        let tools = adapter().list_tools();
        let query = tools.iter().find(|tool| tool.name == "azops-monitor-query").unwrap();
        assert_eq!(
            Value::Object(query.input_schema.clone()),
            json!({
                "type": "object",
                "properties": {
                    "workspace": { "type": "string", "description": "Log Analytics workspace" },
                    "query": { "type": "string", "description": "KQL query text" },
                    "hours": {
                        "type": "integer",
                        "description": "Look-back window in hours",
                        "default": "24"
                    }
                },
                "required": ["workspace", "query"]
            })
        );

        let ping = tools.iter().find(|tool| tool.name == "azops-monitor-ping").unwrap();
        assert_eq!(Value::Object(ping.input_schema.clone()), json!({ "type": "object" }));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let outcome = adapter().invoke("azops-nope", Map::new()).await;
        assert!(matches!(&outcome, ToolOutcome::NotFound { name } if name == "azops-nope"));
        assert!(outcome.is_error());
        assert_eq!(outcome.body()["status"], json!(404));
    }

    #[tokio::test]
    async fn test_tool_call_binds_like_cli() {
        let adapter = adapter();
        let command = adapter.registry().get("azops-monitor-query").unwrap();

        let cli = command
            .run_tokens(
                adapter.context(),
                ["--workspace", "logs-a", "--query", "Heartbeat | take 1", "--hours", "6"]
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            )
            .await;
        let tool = adapter
            .invoke(
                "azops-monitor-query",
                object(json!({
                    "workspace": "logs-a",
                    "query": "Heartbeat | take 1",
                    "hours": 6,
                })),
            )
            .await;

        let ToolOutcome::Completed(tool) = tool else {
            panic!("tool should resolve");
        };
        assert_eq!(cli.status, 200);
        assert_eq!(tool.status, 200);
        assert_eq!(cli.results, tool.results);
        assert_eq!(
            tool.results.unwrap(),
            json!({ "workspace": "logs-a", "query": "Heartbeat | take 1", "hours": "6" })
        );
    }

    #[tokio::test]
    async fn test_negotiation_body_carries_suggestions() {
        let outcome = adapter()
            .invoke("azops-monitor-query", object(json!({ "query": "Usage" })))
            .await;

        assert!(!outcome.is_error());
        let body = outcome.body();
        assert_eq!(body["message"], json!("Missing required arguments: workspace"));
        let workspace = body["arguments"]
            .as_array()
            .unwrap()
            .iter()
            .find(|info| info["name"] == "workspace")
            .unwrap();
        assert_eq!(workspace["values"][1]["id"], json!("logs-b"));
    }

    #[tokio::test]
    async fn test_type_mismatch_is_bad_request() {
        let outcome = adapter()
            .invoke(
                "azops-monitor-query",
                object(json!({ "workspace": "logs-a", "query": "Usage", "hours": "soon" })),
            )
            .await;

        let ToolOutcome::Completed(response) = &outcome else {
            panic!("command should exist");
        };
        assert_eq!(response.status, 400);
        assert!(outcome.is_error());
    }

    #[tokio::test]
    async fn test_unknown_argument_is_bad_request() {
        let outcome = adapter()
            .invoke("azops-monitor-ping", object(json!({ "verbose": true })))
            .await;
        let ToolOutcome::Completed(response) = outcome else {
            panic!("command should exist");
        };
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_to_tokens_skips_null_and_stringifies_scalars() {
        let tokens = to_tokens(object(json!({ "a": null, "b": false, "c": "-x" })));
        assert_eq!(tokens, vec!["--b", "false", "--c", "-x"]);
    }
}

//! Model Context Protocol (MCP) transport implementation.
//!
//! [`McpService`] implements `rmcp::ServerHandler` on top of a
//! [`ToolAdapter`]:
//!
//! - `tools/list` returns every non-hidden command with its input schema
//! - `tools/call` runs the command and returns one text content item holding
//!   the JSON body of the outcome
//!
//! Unknown tools and failed commands are reported as error results rather
//! than protocol errors, so the agent can read the message and retry.

use std::{borrow::Cow, sync::Arc};

use rmcp::{
    ErrorData, RoleServer,
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, ListToolsResult, PaginatedRequestParam,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    transport::streamable_http_server::{
        StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
    },
};
use tracing::debug;

use crate::{ToolAdapter, ToolDescriptor, ToolOutcome};

const INSTRUCTIONS: &str = "Each tool is an azops command. When a call returns `arguments` \
                            instead of results, pick values from their suggestions and call \
                            the tool again with them.";

/// MCP server exposing the azops command registry.
///
/// # Example
///
/// ```ignore
/// use azops_runtime::{McpService, ToolAdapter};
///
/// let service = McpService::new(ToolAdapter::new(registry, context));
/// let router = axum::Router::new().nest_service("/mcp", service.streamable_http_service());
/// ```
#[derive(Clone)]
pub struct McpService {
    adapter: ToolAdapter,
    info: ServerInfo,
}

impl McpService {
    /// Create a new MCP service with default server info.
    #[must_use]
    pub fn new(adapter: ToolAdapter) -> Self {
        Self::with_info(adapter, default_server_info())
    }

    #[must_use]
    pub fn with_info(adapter: ToolAdapter, info: ServerInfo) -> Self {
        Self { adapter, info }
    }

    #[must_use]
    pub fn adapter(&self) -> &ToolAdapter {
        &self.adapter
    }

    #[must_use]
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Creates a streamable HTTP service with default configuration.
    #[must_use]
    pub fn streamable_http_service(&self) -> StreamableHttpService<Self, LocalSessionManager> {
        self.streamable_http_service_with_config(StreamableHttpServerConfig::default())
    }

    /// Creates a streamable HTTP service with custom configuration.
    ///
    /// The result is an Axum-compatible service to mount in a router.
    #[must_use]
    pub fn streamable_http_service_with_config(
        &self,
        config: StreamableHttpServerConfig,
    ) -> StreamableHttpService<Self, LocalSessionManager> {
        let service = self.clone();
        StreamableHttpService::new(move || Ok(service.clone()), Arc::default(), config)
    }
}

impl ServerHandler for McpService {
    fn get_info(&self) -> ServerInfo {
        self.info.clone()
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        let tools = self
            .adapter
            .list_tools()
            .into_iter()
            .map(descriptor_to_mcp)
            .collect();
        async move { Ok(ListToolsResult::with_all_items(tools)) }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        let adapter = self.adapter.clone();
        async move {
            debug!(request_id = %context.id, tool = %request.name, "MCP tool call");
            let outcome = adapter
                .invoke(&request.name, request.arguments.unwrap_or_default())
                .await;
            Ok(outcome_to_result(&outcome))
        }
    }
}

fn default_server_info() -> ServerInfo {
    ServerInfo {
        capabilities: ServerCapabilities::builder().enable_tools().build(),
        instructions: Some(INSTRUCTIONS.to_string()),
        ..Default::default()
    }
}

fn descriptor_to_mcp(descriptor: ToolDescriptor) -> Tool {
    Tool {
        name: Cow::Owned(descriptor.name),
        title: None,
        description: non_empty_cow(&descriptor.description),
        input_schema: Arc::new(descriptor.input_schema),
        output_schema: None,
        annotations: None,
        icons: None,
    }
}

fn outcome_to_result(outcome: &ToolOutcome) -> CallToolResult {
    let content = vec![Content::text(outcome.body().to_string())];
    if outcome.is_error() {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

fn non_empty_cow(value: &str) -> Option<Cow<'static, str>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(Cow::Owned(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use azops_commands::{
        CatalogDefaults, InMemoryResourceService, ResourceService, STORAGE_ACCOUNTS,
        build_registry,
    };
    use azops_core::{CommandContext, CommandResponse, TokenCache};
    use rmcp::{
        model::JsonObject, service::ServiceExt, transport::StreamableHttpClientTransport,
    };
    use serde_json::{Value, json};
    use tokio::sync::oneshot;

    use super::*;

    fn json_object(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => JsonObject::default(),
        }
    }

    fn text_body(result: &CallToolResult) -> Value {
        let text = result
            .content
            .first()
            .and_then(|content| content.as_text())
            .map(|text| text.text.clone())
            .expect("call should return text content");
        serde_json::from_str(&text).expect("content should be JSON")
    }

    fn service() -> McpService {
        let resources: Arc<dyn ResourceService> = Arc::new(
            InMemoryResourceService::new()
                .with_subscription("sub-1", "Primary")
                .with_resource_group("sub-1", "rg-a", "eastus")
                .with_resource("sub-1", "rg-a", STORAGE_ACCOUNTS, "acct1"),
        );
        let registry = Arc::new(build_registry(&CatalogDefaults::default()).unwrap());
        let context = CommandContext::new()
            .with_service(resources)
            .with_service(registry.clone())
            .with_tokens(Arc::new(TokenCache::fixed(Some("token".to_string()))));
        McpService::new(ToolAdapter::new(registry, context))
    }

    #[test]
    fn test_outcome_to_result_marks_not_found_as_error() {
        let result = outcome_to_result(&ToolOutcome::NotFound {
            name: "azops-missing".to_string(),
        });
        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            text_body(&result)["message"],
            json!("tool not found: azops-missing")
        );
    }

    #[test]
    fn test_outcome_to_result_serializes_results() {
        let response = CommandResponse {
            results: Some(json!({ "groups": [] })),
            ..CommandResponse::default()
        };
        let result = outcome_to_result(&ToolOutcome::Completed(response));
        assert_ne!(result.is_error, Some(true));
        assert_eq!(text_body(&result), json!({ "groups": [] }));
    }

    #[test]
    fn test_default_server_info_enables_tools() {
        let info = service().info().clone();
        assert!(info.capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn test_mcp_end_to_end() -> Result<()> {
        let router =
            axum::Router::new().nest_service("/mcp", service().streamable_http_service());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        let uri = format!("http://{addr}/mcp");
        let client = ().serve(StreamableHttpClientTransport::from_uri(uri)).await?;

        let tools = client.list_all_tools().await?;
        let names: Vec<_> = tools.iter().map(|tool| tool.name.as_ref()).collect();
        assert!(names.contains(&"azops-group-list"));
        assert!(!names.contains(&"azops-tools-list"));

        let negotiation = client
            .call_tool(CallToolRequestParam {
                name: "azops-storage-account-list".into(),
                arguments: None,
            })
            .await?;
        assert_ne!(negotiation.is_error, Some(true));
        let body = text_body(&negotiation);
        assert_eq!(
            body["message"],
            json!("Missing required arguments: subscription-id")
        );

        let listed = client
            .call_tool(CallToolRequestParam {
                name: "azops-storage-account-list".into(),
                arguments: Some(json_object(json!({ "subscription-id": "sub-1" }))),
            })
            .await?;
        assert_eq!(
            text_body(&listed)["accounts"][0]["name"],
            json!("acct1")
        );

        let missing = client
            .call_tool(CallToolRequestParam {
                name: "azops-does-not-exist".into(),
                arguments: None,
            })
            .await?;
        assert_eq!(missing.is_error, Some(true));

        client.cancel().await?;
        let _ = shutdown_tx.send(());
        let _ = server.await;

        Ok(())
    }
}

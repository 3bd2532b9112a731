use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
};
use serde_json::{Value, json};

use crate::api::{self, AppState};
use crate::registry;

/// The MCP side of the bridge. One instance per connection; all of them share
/// the same [`AppState`] and therefore the same upstream client.
#[derive(Clone)]
pub struct GitLabService {
    state: AppState,
}

impl GitLabService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

/// Run one tool invocation end to end.
///
/// Failures never escape as protocol errors: an unknown tool name, a
/// validation failure or an upstream error all come back as `{"error": ...}`
/// text with the `is_error` flag set.
pub async fn call(state: &AppState, name: &str, arguments: JsonObject) -> CallToolResult {
    let Some(spec) = registry::find(name) else {
        let payload = pretty(&json!({"error": format!("unknown tool: {name}")}));
        return CallToolResult::error(vec![Content::text(payload)]);
    };

    let request = registry::request_for(spec, arguments);
    let response = api::dispatch(state, spec.resource, request).await;
    let payload = pretty(&response.body);
    if response.status.is_success() {
        CallToolResult::success(vec![Content::text(payload)])
    } else {
        CallToolResult::error(vec![Content::text(payload)])
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

impl ServerHandler for GitLabService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "gitlab-mcp".to_string(),
                title: Some("GitLab MCP".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        tracing::info!("got tools/list request {:?}", request);
        Ok(ListToolsResult {
            tools: registry::tools().to_vec(),
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("got tools/call request {:?}", request);
        let arguments = request.arguments.unwrap_or_default();
        Ok(call(&self.state, &request.name, arguments).await)
    }
}

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use tokio::net::TcpListener;

use crate::error::ToolError;
use crate::tools::{RAG_TO_CONTEXT, RepoContextTools, ToolDefinition, dispatch, tool_definitions};

/// MCP front end over a [`RepoContextTools`] implementation.
pub struct RepoContextServer<T> {
    tools: Arc<T>,
}

impl<T> Clone for RepoContextServer<T> {
    fn clone(&self) -> Self {
        Self {
            tools: Arc::clone(&self.tools),
        }
    }
}

impl<T: RepoContextTools> RepoContextServer<T> {
    #[must_use]
    pub fn new(tools: Arc<T>) -> Self {
        Self { tools }
    }

    fn to_mcp_tool(def: ToolDefinition) -> Tool {
        Tool {
            name: Cow::Borrowed(def.name),
            title: None,
            description: Some(Cow::Borrowed(def.description)),
            input_schema: Arc::new(def.input_schema),
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(def.name == RAG_TO_CONTEXT)),
            execution: None,
            icons: None,
            meta: None,
        }
    }

    fn descriptors() -> Vec<Tool> {
        tool_definitions().into_iter().map(Self::to_mcp_tool).collect()
    }
}

impl<T: RepoContextTools> ServerHandler for RepoContextServer<T> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "gitctx".to_string(),
                title: Some("gitctx".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some("Retrieval context over GitHub repositories".to_string()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Call repo_to_rag with a GitHub repository URL to ingest it, then call \
                 rag_to_context with a question to retrieve the relevant code."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(Self::descriptors())))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        Self::descriptors().into_iter().find(|t| t.name == name)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = request.arguments.unwrap_or_default();
        match dispatch(self.tools.as_ref(), &request.name, arguments).await {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(ToolError::UnknownTool(name)) => Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {name}"),
                None,
            )),
            Err(e) => {
                tracing::warn!(tool = %request.name, error = %e, "tool call failed");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}

/// Serve `tools` over stdin/stdout until the client disconnects.
///
/// # Errors
///
/// Returns an error if the MCP handshake fails or the server task panics.
pub async fn serve_stdio<T: RepoContextTools>(tools: Arc<T>) -> anyhow::Result<()> {
    tracing::info!("serving MCP over stdio");
    let running = RepoContextServer::new(tools)
        .serve(rmcp::transport::stdio())
        .await?;
    let reason = running.waiting().await?;
    tracing::info!(?reason, "MCP session ended");
    Ok(())
}

/// Route of the streamable HTTP endpoint.
pub const MCP_PATH: &str = "/mcp";

/// Router serving the tools as streamable HTTP under [`MCP_PATH`].
///
/// Every session gets its own [`RepoContextServer`] over the shared tools.
pub fn http_router<T: RepoContextTools>(tools: Arc<T>) -> axum::Router {
    let server = RepoContextServer::new(tools);
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    axum::Router::new().nest_service(MCP_PATH, service)
}

/// Serve `tools` over streamable HTTP on `listener` until `shutdown`
/// resolves.
///
/// # Errors
///
/// Returns an error if the listener fails.
pub async fn serve_http<T, F>(tools: Arc<T>, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    T: RepoContextTools,
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("serving MCP on http://{addr}{MCP_PATH}");
    axum::serve(listener, http_router(tools))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("MCP HTTP server stopped");
    Ok(())
}

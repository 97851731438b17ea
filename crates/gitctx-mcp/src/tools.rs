//! Tool definitions and dispatch, independent of the MCP transport.

use std::future::Future;

use gitctx_core::{RepoContextService, ServiceError, format_repository_report};
use gitctx_llm::LlmProvider;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::ToolError;

pub const REPO_TO_RAG: &str = "repo_to_rag";
pub const RAG_TO_CONTEXT: &str = "rag_to_context";

/// Arguments of `repo_to_rag`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RepoToRagArgs {
    /// GitHub repository URL, e.g. `https://github.com/owner/name`.
    pub repo_url: String,
}

/// Arguments of `rag_to_context`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RagToContextArgs {
    /// Natural-language question about the ingested code.
    pub query: String,
}

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: serde_json::Map<String, serde_json::Value>,
}

/// The operations behind the MCP tools.
pub trait RepoContextTools: Send + Sync + 'static {
    /// Ingest a repository and describe what was stored.
    fn repo_to_rag(&self, repo_url: &str)
    -> impl Future<Output = Result<String, ServiceError>> + Send;

    /// Retrieve context for a query as markdown.
    fn rag_to_context(&self, query: &str)
    -> impl Future<Output = Result<String, ServiceError>> + Send;
}

impl<P: LlmProvider + 'static> RepoContextTools for RepoContextService<P> {
    async fn repo_to_rag(&self, repo_url: &str) -> Result<String, ServiceError> {
        let report = self.ingest(repo_url).await?;
        Ok(format_repository_report(&report))
    }

    async fn rag_to_context(&self, query: &str) -> Result<String, ServiceError> {
        self.query_context(query).await
    }
}

fn schema_of<T: JsonSchema>() -> serde_json::Map<String, serde_json::Value> {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}

#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: REPO_TO_RAG,
            description: "Fetch a GitHub repository, split it into chunks, generate hypothetical \
                          questions for each chunk, and store both for retrieval. Returns a \
                          markdown summary of the repository.",
            input_schema: schema_of::<RepoToRagArgs>(),
        },
        ToolDefinition {
            name: RAG_TO_CONTEXT,
            description: "Search ingested repositories for code relevant to a question. Falls \
                          back to matching hypothetical questions when no code matches directly.",
            input_schema: schema_of::<RagToContextArgs>(),
        },
    ]
}

fn parse<T: serde::de::DeserializeOwned>(
    tool: &'static str,
    arguments: serde_json::Map<String, serde_json::Value>,
) -> Result<T, ToolError> {
    serde_json::from_value(serde_json::Value::Object(arguments))
        .map_err(|source| ToolError::InvalidArguments { tool, source })
}

/// Run tool `name` with JSON `arguments`.
///
/// # Errors
///
/// Returns [`ToolError::UnknownTool`], [`ToolError::InvalidArguments`], or
/// the wrapped service failure.
pub async fn dispatch<T: RepoContextTools>(
    tools: &T,
    name: &str,
    arguments: serde_json::Map<String, serde_json::Value>,
) -> Result<String, ToolError> {
    match name {
        REPO_TO_RAG => {
            let args: RepoToRagArgs = parse(REPO_TO_RAG, arguments)?;
            tracing::info!(tool = REPO_TO_RAG, repo = %args.repo_url, "tool call");
            tools
                .repo_to_rag(&args.repo_url)
                .await
                .map_err(|source| ToolError::Failed {
                    tool: REPO_TO_RAG,
                    source,
                })
        }
        RAG_TO_CONTEXT => {
            let args: RagToContextArgs = parse(RAG_TO_CONTEXT, arguments)?;
            tracing::info!(tool = RAG_TO_CONTEXT, "tool call");
            tools
                .rag_to_context(&args.query)
                .await
                .map_err(|source| ToolError::Failed {
                    tool: RAG_TO_CONTEXT,
                    source,
                })
        }
        other => Err(ToolError::UnknownTool(other.to_owned())),
    }
}

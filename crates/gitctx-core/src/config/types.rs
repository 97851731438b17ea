use gitctx_github::SourceKind;
use serde::{Deserialize, Serialize};

use crate::vault::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

fn default_github_api_url() -> String {
    gitctx_github::client::DEFAULT_API_URL.into()
}

fn default_request_interval_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_clone_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GitHubConfig {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    /// Minimum gap between two GitHub API requests.
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on one `git clone` when `source = "clone"`.
    #[serde(default = "default_clone_timeout_secs")]
    pub clone_timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            request_interval_ms: default_request_interval_ms(),
            source: SourceKind::default(),
            timeout_secs: default_timeout_secs(),
            clone_timeout_secs: default_clone_timeout_secs(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_embedding_dimensions() -> u64 {
    1536
}

fn default_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Chat model used for question generation.
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Vector size of both collections; must match the embedding model.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Qdrant,
    /// Process-local index, lost on exit.
    Memory,
}

impl StoreBackend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qdrant => "qdrant",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

fn default_code_collection() -> String {
    "code_documents".into()
}

fn default_question_collection() -> String {
    "hypothetical_questions".into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
    #[serde(default = "default_code_collection")]
    pub code_collection: String,
    #[serde(default = "default_question_collection")]
    pub question_collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            qdrant_url: default_qdrant_url(),
            code_collection: default_code_collection(),
            question_collection: default_question_collection(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_score_threshold() -> f32 {
    0.5
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    /// Threshold of the path-restricted code search; unset reuses
    /// `score_threshold`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescope_threshold: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            score_threshold: default_score_threshold(),
            rescope_threshold: None,
        }
    }
}

fn default_max_concurrent_fetches() -> usize {
    3
}

fn default_question_concurrency() -> usize {
    gitctx_index::questions::DEFAULT_CONCURRENCY
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Repository fetches allowed to run at once across the process.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_question_concurrency")]
    pub question_concurrency: usize,
    #[serde(default = "default_true")]
    pub generate_questions: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            question_concurrency: default_question_concurrency(),
            generate_questions: true,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub openai_api_key: Option<Secret>,
    pub github_token: Option<Secret>,
}


#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum McpTransport {
    /// JSON-RPC frames on stdin/stdout.
    #[default]
    Stdio,
    /// Streamable HTTP on `host:port` under `/mcp`.
    Http,
}

impl McpTransport {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

impl std::fmt::Display for McpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_mcp_host() -> String {
    "127.0.0.1".into()
}

fn default_mcp_port() -> u16 {
    8000
}

#[derive(Debug, Deserialize, Serialize)]
pub struct McpConfig {
    #[serde(default)]
    pub transport: McpTransport,
    #[serde(default = "default_mcp_host")]
    pub host: String,
    #[serde(default = "default_mcp_port")]
    pub port: u16,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            transport: McpTransport::default(),
            host: default_mcp_host(),
            port: default_mcp_port(),
        }
    }
}

impl McpConfig {
    /// `host:port` for the HTTP transport.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

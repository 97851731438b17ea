use super::{Config, McpTransport, StoreBackend};
use gitctx_github::SourceKind;

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let v = std::env::var(key).ok()?;
    if let Ok(parsed) = v.trim().parse::<T>() {
        Some(parsed)
    } else {
        tracing::warn!("ignoring invalid {key} value: {v}");
        None
    }
}

fn keyword<T: serde::de::DeserializeOwned>(key: &str) -> Option<T> {
    let v = std::env::var(key).ok()?;
    if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.trim().to_lowercase())) {
        Some(kind)
    } else {
        tracing::warn!("ignoring invalid {key} value: {v}");
        None
    }
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_sources();
        self.apply_env_overrides_search();
    }

    fn apply_env_overrides_sources(&mut self) {
        if let Ok(v) = std::env::var("GITCTX_GITHUB_API_URL") {
            self.github.api_url = v;
        }
        if let Some(ms) = parsed::<u64>("GITCTX_GITHUB_REQUEST_INTERVAL_MS") {
            self.github.request_interval_ms = ms;
        }
        if let Some(source) = keyword::<SourceKind>("GITCTX_GITHUB_SOURCE") {
            self.github.source = source;
        }
        if let Some(secs) = parsed::<u64>("GITCTX_GITHUB_TIMEOUT_SECS") {
            self.github.timeout_secs = secs;
        }
        if let Some(secs) = parsed::<u64>("GITCTX_GITHUB_CLONE_TIMEOUT_SECS") {
            self.github.clone_timeout_secs = secs;
        }
        if let Ok(v) = std::env::var("GITCTX_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("GITCTX_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("GITCTX_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Some(dims) = parsed::<u64>("GITCTX_LLM_EMBEDDING_DIMENSIONS") {
            self.llm.embedding_dimensions = dims;
        }
        if let Some(secs) = parsed::<u64>("GITCTX_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = secs;
        }
        if let Ok(v) = std::env::var("GITCTX_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Some(transport) = keyword::<McpTransport>("GITCTX_MCP_TRANSPORT") {
            self.mcp.transport = transport;
        }
        if let Ok(v) = std::env::var("GITCTX_MCP_HOST") {
            self.mcp.host = v;
        }
        if let Some(port) = parsed::<u16>("GITCTX_MCP_PORT") {
            self.mcp.port = port;
        }
    }

    fn apply_env_overrides_search(&mut self) {
        if let Some(backend) = keyword::<StoreBackend>("GITCTX_STORE_BACKEND") {
            self.store.backend = backend;
        }
        if let Ok(v) = std::env::var("GITCTX_QDRANT_URL") {
            self.store.qdrant_url = v;
        }
        if let Some(k) = parsed::<usize>("GITCTX_RETRIEVAL_TOP_K") {
            self.retrieval.top_k = k;
        }
        if let Some(t) = parsed::<f32>("GITCTX_RETRIEVAL_SCORE_THRESHOLD") {
            self.retrieval.score_threshold = t.clamp(0.0, 1.0);
        }
        if let Some(n) = parsed::<usize>("GITCTX_INGEST_MAX_CONCURRENT_FETCHES") {
            self.ingest.max_concurrent_fetches = n;
        }
        if let Some(n) = parsed::<usize>("GITCTX_INGEST_QUESTION_CONCURRENCY") {
            self.ingest.question_concurrency = n;
        }
        if let Some(enabled) = parsed::<bool>("GITCTX_INGEST_GENERATE_QUESTIONS") {
            self.ingest.generate_questions = enabled;
        }
    }
}

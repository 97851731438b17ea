use gitctx_core::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for '{tool}': {source}")]
    InvalidArguments {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{tool} failed: {source}")]
    Failed {
        tool: &'static str,
        #[source]
        source: ServiceError,
    },
}

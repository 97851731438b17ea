//! Error types for gitctx-index.

use std::fmt;

use gitctx_llm::LlmError;
use gitctx_memory::MemoryError;
use gitctx_memory::document::DocumentError;

/// Which search of the fallback retrieval failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStage {
    Code,
    HypotheticalQuestion,
    Rescoped,
}

impl fmt::Display for SearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Code => "code search",
            Self::HypotheticalQuestion => "question search",
            Self::Rescoped => "rescoped code search",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("storage error: {0}")]
    Memory(#[from] MemoryError),

    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// One chunk's question request failed; the whole batch is abandoned.
    #[error("question generation failed for {path}: {source}")]
    Generation {
        path: String,
        #[source]
        source: LlmError,
    },

    #[error("retrieval failed during {stage}: {source}")]
    Retrieval {
        stage: SearchStage,
        #[source]
        source: MemoryError,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;

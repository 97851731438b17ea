//! Chunking, question generation, and fallback retrieval over the dual index.

pub mod chunker;
pub mod error;
pub mod format;
pub mod languages;
pub mod questions;
pub mod retriever;

pub use chunker::{Chunker, split_files};
pub use error::{IndexError, Result, SearchStage};
pub use format::format_results;
pub use languages::Lang;
pub use questions::{HypotheticalQuestion, QuestionGenerator};
pub use retriever::{RetrievalConfig, RetrievalStage, Retrieved, Retriever};

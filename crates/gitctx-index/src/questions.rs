//! Hypothetical developer questions generated per chunk.
//!
//! Indexing the questions a developer might ask about a chunk lets queries
//! phrased as questions find code they share few words with.

use std::sync::Arc;

use futures::{StreamExt as _, TryStreamExt as _};
use gitctx_llm::LlmProvider;
use gitctx_llm::provider::{FunctionDefinition, Message, call_function_typed};
use gitctx_memory::document::{Document, DocumentMetadata};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::{IndexError, Result};

pub const DEFAULT_CONCURRENCY: usize = 10;
const FUNCTION_NAME: &str = "hypothetical_questions";
const FUNCTION_DESCRIPTION: &str = "Generate hypothetical questions for a given code snippet.";

/// Arguments of the `hypothetical_questions` function call.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QuestionSet {
    /// Hypothetical questions about the code.
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HypotheticalQuestion {
    pub text: String,
    /// Copied from the chunk the question was generated for.
    pub metadata: DocumentMetadata,
}

impl HypotheticalQuestion {
    #[must_use]
    pub fn into_document(self) -> Document {
        Document::new(self.text, self.metadata)
    }
}

pub struct QuestionGenerator<P: LlmProvider> {
    provider: Arc<P>,
    concurrency: usize,
}

impl<P: LlmProvider> std::fmt::Debug for QuestionGenerator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionGenerator")
            .field("provider", &self.provider.name())
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl<P: LlmProvider> QuestionGenerator<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Maximum number of requests in flight; clamped to at least one.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Generate questions for every chunk that has a path.
    ///
    /// Output follows input order: all questions for the first eligible chunk,
    /// then the second, and so on.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Generation`] naming the first chunk whose request
    /// failed; questions already generated for other chunks are discarded.
    pub async fn generate(&self, chunks: &[Document]) -> Result<Vec<HypotheticalQuestion>> {
        let function = FunctionDefinition::for_type::<QuestionSet>(FUNCTION_NAME, FUNCTION_DESCRIPTION)?;

        let eligible: Vec<&Document> = chunks
            .iter()
            .enumerate()
            .filter_map(|(i, chunk)| {
                if chunk.has_path() {
                    Some(chunk)
                } else {
                    tracing::warn!(index = i, "chunk has no path metadata, skipping");
                    None
                }
            })
            .collect();
        if eligible.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(
            chunks = eligible.len(),
            concurrency = self.concurrency,
            "generating hypothetical questions"
        );
        let futs: Vec<_> = eligible
            .iter()
            .map(|chunk| self.questions_for(chunk, &function))
            .collect();
        let per_chunk: Vec<Vec<HypotheticalQuestion>> = futures::stream::iter(futs)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let questions: Vec<_> = per_chunk.into_iter().flatten().collect();
        tracing::info!(questions = questions.len(), "generated hypothetical questions");
        Ok(questions)
    }

    async fn questions_for(
        &self,
        chunk: &Document,
        function: &FunctionDefinition,
    ) -> Result<Vec<HypotheticalQuestion>> {
        let messages = [Message::user(question_prompt(chunk))];
        let set: QuestionSet = call_function_typed(self.provider.as_ref(), &messages, function)
            .await
            .map_err(|source| IndexError::Generation {
                path: chunk.metadata.path.clone(),
                source,
            })?;
        tracing::debug!(path = %chunk.metadata.path, count = set.questions.len(), "questions generated");

        Ok(set
            .questions
            .into_iter()
            .map(|q| q.trim().to_owned())
            .filter(|q| !q.is_empty())
            .map(|text| HypotheticalQuestion {
                text,
                metadata: chunk.metadata.clone(),
            })
            .collect())
    }
}

fn question_prompt(chunk: &Document) -> String {
    format!(
        "Analyze the following code and write 3 questions other developers would likely ask \
         about it. Focus on the implementation approach, design patterns, optimization \
         opportunities, and possible errors.\n\nCode:\n```{}\n{}\n```",
        chunk.metadata.language, chunk.content
    )
}

//! The ingestion steps: fetch, chunk, generate questions, store.

use std::collections::BTreeSet;
use std::sync::Arc;

use gitctx_github::{AnySource, FetchedRepository};
use gitctx_index::{Chunker, HypotheticalQuestion, QuestionGenerator};
use gitctx_llm::LlmProvider;
use gitctx_memory::document::Document;
use gitctx_memory::{Collection, DualIndexStore};
use tokio::sync::Semaphore;

use super::PipelineError;
use super::step::Step;

#[derive(Debug)]
pub struct ChunkedRepository {
    pub repository: FetchedRepository,
    pub chunks: Vec<Document>,
}

#[derive(Debug)]
pub struct AnnotatedRepository {
    pub repository: FetchedRepository,
    pub chunks: Vec<Document>,
    pub questions: Vec<HypotheticalQuestion>,
}

#[derive(Debug)]
pub struct StoredRepository {
    pub repository: FetchedRepository,
    pub document_chunks: usize,
    pub hypothetical_questions: usize,
    /// Languages detected while chunking, sorted.
    pub chunk_languages: Vec<String>,
}

/// Fetches a repository while holding a permit of the shared admission
/// limiter.
pub struct FetchStep {
    source: Arc<AnySource>,
    admission: Arc<Semaphore>,
}

impl FetchStep {
    #[must_use]
    pub fn new(source: Arc<AnySource>, admission: Arc<Semaphore>) -> Self {
        Self { source, admission }
    }
}

impl Step for FetchStep {
    type Input = String;
    type Output = FetchedRepository;

    fn name(&self) -> &'static str {
        "fetch"
    }

    async fn run(&self, url: Self::Input) -> Result<Self::Output, PipelineError> {
        if self.admission.available_permits() == 0 {
            tracing::info!(repo = %url, "waiting for a fetch slot");
        }
        let _permit = self
            .admission
            .acquire()
            .await
            .map_err(|_| PipelineError::Custom("fetch admission limiter closed".into()))?;
        let repository = self.source.fetch(&url).await?;
        tracing::info!(
            repo = %repository.reference.url,
            source = ?self.source.kind(),
            files = repository.files.len(),
            "repository fetched"
        );
        Ok(repository)
    }
}

pub struct ChunkStep {
    chunker: Chunker,
}

impl ChunkStep {
    #[must_use]
    pub fn new(chunker: Chunker) -> Self {
        Self { chunker }
    }
}

impl Step for ChunkStep {
    type Input = FetchedRepository;
    type Output = ChunkedRepository;

    fn name(&self) -> &'static str {
        "chunk"
    }

    async fn run(&self, repository: Self::Input) -> Result<Self::Output, PipelineError> {
        let chunks = self.chunker.split_files(&repository.files);
        Ok(ChunkedRepository { repository, chunks })
    }
}

/// Generates hypothetical questions; a disabled step passes chunks through
/// with no questions.
pub struct QuestionStep<P: LlmProvider> {
    generator: QuestionGenerator<P>,
    enabled: bool,
}

impl<P: LlmProvider> QuestionStep<P> {
    #[must_use]
    pub fn new(generator: QuestionGenerator<P>, enabled: bool) -> Self {
        Self { generator, enabled }
    }
}

impl<P: LlmProvider> Step for QuestionStep<P> {
    type Input = ChunkedRepository;
    type Output = AnnotatedRepository;

    fn name(&self) -> &'static str {
        "questions"
    }

    async fn run(&self, input: Self::Input) -> Result<Self::Output, PipelineError> {
        let questions = if self.enabled {
            self.generator.generate(&input.chunks).await?
        } else {
            tracing::debug!("question generation disabled");
            Vec::new()
        };
        Ok(AnnotatedRepository {
            repository: input.repository,
            chunks: input.chunks,
            questions,
        })
    }
}

/// Embeds chunks into the code collection and questions into the question
/// collection.
pub struct StoreStep<P: LlmProvider> {
    store: Arc<DualIndexStore<P>>,
}

impl<P: LlmProvider> StoreStep<P> {
    #[must_use]
    pub fn new(store: Arc<DualIndexStore<P>>) -> Self {
        Self { store }
    }
}

impl<P: LlmProvider> Step for StoreStep<P> {
    type Input = AnnotatedRepository;
    type Output = StoredRepository;

    fn name(&self) -> &'static str {
        "store"
    }

    async fn run(&self, input: Self::Input) -> Result<Self::Output, PipelineError> {
        let AnnotatedRepository {
            repository,
            chunks,
            questions,
        } = input;
        let chunk_languages: Vec<String> = chunks
            .iter()
            .map(|c| c.metadata.language.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        self.store.ensure_collections().await?;
        let document_chunks = self.store.add_documents(Collection::Code, chunks).await?;
        let question_docs = questions
            .into_iter()
            .map(HypotheticalQuestion::into_document)
            .collect();
        let hypothetical_questions = self
            .store
            .add_documents(Collection::HypotheticalQuestion, question_docs)
            .await?;

        Ok(StoredRepository {
            repository,
            document_chunks,
            hypothetical_questions,
            chunk_languages,
        })
    }
}

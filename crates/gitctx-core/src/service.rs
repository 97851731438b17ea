//! Ingestion and query entry points shared by the CLI and the MCP server.

use std::sync::Arc;
use std::time::Instant;

use gitctx_github::{AnySource, RepositoryStructure, find_readme};
use gitctx_index::{
    Chunker, IndexError, QuestionGenerator, RetrievalConfig, Retrieved, Retriever, format_results,
};
use gitctx_llm::LlmProvider;
use gitctx_memory::{Collection, DualIndexStore, IndexStats, MemoryError};
use tokio::sync::Semaphore;

use crate::pipeline::builtin::{ChunkStep, FetchStep, QuestionStep, StoreStep};
use crate::pipeline::{Pipeline, PipelineError};
use crate::report::{IngestReport, main_directories};

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("no repository source configured")]
    NoSource,

    #[error("ingestion failed: {0}")]
    Ingest(#[from] PipelineError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Repository ingestion and two-stage retrieval over one dual index.
pub struct RepoContextService<P: LlmProvider> {
    source: Option<Arc<AnySource>>,
    store: Arc<DualIndexStore<P>>,
    retriever: Retriever<P>,
    chunker: Chunker,
    question_concurrency: usize,
    generate_questions: bool,
    admission: Arc<Semaphore>,
}

impl<P: LlmProvider> std::fmt::Debug for RepoContextService<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoContextService")
            .field("source", &self.source.as_ref().map(|s| s.kind()))
            .field("store", &self.store)
            .field("retriever", &self.retriever)
            .field("generate_questions", &self.generate_questions)
            .finish_non_exhaustive()
    }
}

impl<P: LlmProvider> RepoContextService<P> {
    #[must_use]
    pub fn new(store: Arc<DualIndexStore<P>>) -> Self {
        Self {
            source: None,
            retriever: Retriever::new(Arc::clone(&store), RetrievalConfig::default()),
            store,
            chunker: Chunker::new(),
            question_concurrency: gitctx_index::questions::DEFAULT_CONCURRENCY,
            generate_questions: true,
            admission: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_FETCHES)),
        }
    }

    /// Required for [`Self::ingest`]; query-only services can skip it.
    #[must_use]
    pub fn with_source(mut self, source: AnySource) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    #[must_use]
    pub fn with_retrieval(mut self, config: RetrievalConfig) -> Self {
        self.retriever = Retriever::new(Arc::clone(&self.store), config);
        self
    }

    /// Size of the process-wide fetch limiter; clamped to at least one.
    #[must_use]
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.admission = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    #[must_use]
    pub fn with_question_concurrency(mut self, concurrency: usize) -> Self {
        self.question_concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_question_generation(mut self, enabled: bool) -> Self {
        self.generate_questions = enabled;
        self
    }

    #[must_use]
    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<DualIndexStore<P>> {
        &self.store
    }

    /// Fetch slots not currently held by an ingestion.
    #[must_use]
    pub fn available_fetch_slots(&self) -> usize {
        self.admission.available_permits()
    }

    /// Fetch, chunk, annotate, and store one repository.
    ///
    /// Concurrent calls share the fetch limiter and wait for a slot.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NoSource`] without a configured source, or the
    /// first pipeline step failure.
    pub async fn ingest(&self, repo_url: &str) -> Result<IngestReport, ServiceError> {
        let source = self.source.as_ref().ok_or(ServiceError::NoSource)?;
        let started = Instant::now();
        tracing::info!(repo = repo_url, "ingesting repository");

        let pipeline = Pipeline::start(FetchStep::new(Arc::clone(source), Arc::clone(&self.admission)))
            .step(ChunkStep::new(self.chunker.clone()))
            .step(QuestionStep::new(
                QuestionGenerator::new(Arc::clone(self.store.provider()))
                    .with_concurrency(self.question_concurrency),
                self.generate_questions,
            ))
            .step(StoreStep::new(Arc::clone(&self.store)));
        let stored = pipeline.run(repo_url.to_owned()).await?;

        let files = &stored.repository.files;
        let structure = RepositoryStructure::from_files(files);
        let report = IngestReport {
            main_directories: main_directories(&structure),
            readme: find_readme(files),
            structure,
            total_files: files.len(),
            document_chunks: stored.document_chunks,
            hypothetical_questions: stored.hypothetical_questions,
            languages: stored.chunk_languages,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            reference: stored.repository.reference,
        };
        tracing::info!(
            repo = %report.reference.url,
            files = report.total_files,
            chunks = report.document_chunks,
            questions = report.hypothetical_questions,
            duration_ms = report.duration_ms,
            "repository ingested"
        );
        Ok(report)
    }

    /// Both collections are created first if missing, so a fresh index
    /// answers with no results instead of an error.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Retrieval`] naming the failed search, or a store
    /// error if the collections cannot be created.
    pub async fn query(&self, query: &str, k: Option<usize>) -> Result<Retrieved, ServiceError> {
        self.store.ensure_collections().await?;
        let retrieved = match k {
            Some(k) => self.retriever.retrieve_k(query, k).await?,
            None => self.retriever.retrieve(query).await?,
        };
        tracing::info!(
            stage = ?retrieved.stage,
            results = retrieved.documents.len(),
            "query answered"
        );
        Ok(retrieved)
    }

    /// Retrieval rendered as markdown context.
    ///
    /// # Errors
    ///
    /// See [`Self::query`].
    pub async fn query_context(&self, query: &str) -> Result<String, ServiceError> {
        let retrieved = self.query(query, None).await?;
        Ok(format_results(&retrieved.documents))
    }

    /// # Errors
    ///
    /// Returns an error if either collection cannot be counted.
    pub async fn stats(&self) -> Result<IndexStats, ServiceError> {
        self.store.ensure_collections().await?;
        Ok(self.store.stats().await?)
    }

    /// Drop both collections and recreate them empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects a delete or create.
    pub async fn reset(&self) -> Result<(), ServiceError> {
        for collection in Collection::ALL {
            self.store.delete_collection(collection).await?;
        }
        self.store.ensure_collections().await?;
        tracing::info!("index reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gitctx_github::{ApiFetcher, GitHubClient};
    use gitctx_index::RetrievalStage;
    use gitctx_llm::mock::MockProvider;
    use gitctx_memory::document::{Document, DocumentMetadata};
    use gitctx_memory::{CollectionNames, InMemoryVectorStore};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider() -> Arc<MockProvider> {
        Arc::new(
            MockProvider::with_responder(|_| json!({"questions": ["How?", "Why?", "When?"]}))
                .with_embeddings([("add numbers", vec![1.0, 0.0, 0.0])])
                .with_default_embedding(vec![0.0, 1.0, 0.0]),
        )
    }

    fn store(provider: Arc<MockProvider>) -> Arc<DualIndexStore<MockProvider>> {
        Arc::new(DualIndexStore::new(
            Arc::new(InMemoryVectorStore::new()),
            provider,
            CollectionNames::default(),
            3,
        ))
    }

    fn doc(content: &str, path: &str) -> Document {
        Document::new(
            content,
            DocumentMetadata {
                path: path.into(),
                language: "python".into(),
                ..DocumentMetadata::default()
            },
        )
    }

    async fn mount_small_repo(server: &MockServer, delay: Duration) {
        let code = "def add(a, b):\n    total = a + b\n    return total\n\n\ndef sub(a, b):\n    return a - b\n";
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"default_branch": "main"}))
                    .set_delay(delay),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "calc.py", "path": "calc.py", "type": "file", "size": code.len()}
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/calc.py"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "path": "calc.py",
                "size": code.len(),
                "download_url": format!("{}/raw/calc.py", server.uri())
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/raw/calc.py"))
            .respond_with(ResponseTemplate::new(200).set_body_string(code))
            .mount(server)
            .await;
    }

    fn api_source(server: &MockServer) -> AnySource {
        AnySource::from(ApiFetcher::new(
            GitHubClient::new("test-token")
                .unwrap()
                .with_api_url(server.uri())
                .with_request_interval(Duration::ZERO),
        ))
    }

    #[tokio::test]
    async fn ingest_without_source_fails() {
        let service = RepoContextService::new(store(provider()));
        let err = service.ingest("https://github.com/octo/demo").await.unwrap_err();
        assert!(matches!(err, ServiceError::NoSource));
    }

    #[tokio::test]
    async fn ingest_reports_counts() {
        let server = MockServer::start().await;
        mount_small_repo(&server, Duration::ZERO).await;
        let service = RepoContextService::new(store(provider())).with_source(api_source(&server));

        let report = service.ingest("https://github.com/octo/demo/").await.unwrap();
        assert_eq!(report.reference.url, "https://github.com/octo/demo");
        assert_eq!(report.total_files, 1);
        assert_eq!(report.document_chunks, 1);
        assert_eq!(report.hypothetical_questions, 3);
        assert_eq!(report.languages, vec!["python"]);
        assert_eq!(report.readme, gitctx_github::analysis::README_NOT_FOUND);

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.code, 1);
        assert_eq!(stats.questions, 3);
    }

    #[tokio::test]
    async fn ingest_without_questions() {
        let server = MockServer::start().await;
        mount_small_repo(&server, Duration::ZERO).await;
        let provider = provider();
        let service = RepoContextService::new(store(Arc::clone(&provider)))
            .with_source(api_source(&server))
            .with_question_generation(false);

        let report = service.ingest("https://github.com/octo/demo").await.unwrap();
        assert_eq!(report.hypothetical_questions, 0);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn ingest_holds_fetch_slot() {
        let server = MockServer::start().await;
        mount_small_repo(&server, Duration::from_millis(300)).await;
        let service = RepoContextService::new(store(provider()))
            .with_source(api_source(&server))
            .with_max_concurrent_fetches(1);
        assert_eq!(service.available_fetch_slots(), 1);

        let (report, slots_during) = tokio::join!(
            service.ingest("https://github.com/octo/demo"),
            async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                service.available_fetch_slots()
            }
        );
        report.unwrap();
        assert_eq!(slots_during, 0);
        assert_eq!(service.available_fetch_slots(), 1);
    }

    #[tokio::test]
    async fn fetch_limit_clamped() {
        let service = RepoContextService::new(store(provider())).with_max_concurrent_fetches(0);
        assert_eq!(service.available_fetch_slots(), 1);
    }

    #[tokio::test]
    async fn missing_repository_is_ingest_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let service = RepoContextService::new(store(provider())).with_source(api_source(&server));
        let err = service.ingest("https://github.com/octo/gone").await.unwrap_err();
        assert!(err.to_string().contains("octo/gone"));
        assert_eq!(service.stats().await.unwrap(), IndexStats::default());
    }

    #[tokio::test]
    async fn query_and_context() {
        let store = store(provider());
        store.ensure_collections().await.unwrap();
        store
            .add_documents(Collection::Code, vec![doc("add numbers", "/src/calc.py")])
            .await
            .unwrap();
        let service = RepoContextService::new(store);

        let retrieved = service.query("add numbers", None).await.unwrap();
        assert_eq!(retrieved.stage, RetrievalStage::Direct);
        assert_eq!(retrieved.documents.len(), 1);

        let context = service.query_context("add numbers").await.unwrap();
        assert!(context.starts_with("## Search Results"));
        assert!(context.contains("Source: /src/calc.py"));

        let none = service.query_context("something else").await.unwrap();
        assert_eq!(none, "No relevant information found.");
    }

    #[tokio::test]
    async fn query_before_first_ingest_is_empty() {
        let service = RepoContextService::new(store(provider()));

        let retrieved = service.query("how is error handling done?", None).await.unwrap();
        assert_eq!(retrieved.stage, RetrievalStage::Empty);
        assert!(retrieved.documents.is_empty());

        let context = service.query_context("how is error handling done?").await.unwrap();
        assert_eq!(context, "No relevant information found.");
        assert_eq!(service.stats().await.unwrap(), IndexStats::default());
    }

    #[tokio::test]
    async fn query_k_override() {
        let store = store(provider());
        store.ensure_collections().await.unwrap();
        let docs = (0..4).map(|i| doc("add numbers", &format!("/f{i}.py"))).collect();
        store.add_documents(Collection::Code, docs).await.unwrap();
        let service = RepoContextService::new(store).with_retrieval(RetrievalConfig {
            top_k: 3,
            ..RetrievalConfig::default()
        });

        assert_eq!(service.query("add numbers", None).await.unwrap().documents.len(), 3);
        assert_eq!(service.query("add numbers", Some(1)).await.unwrap().documents.len(), 1);
    }

    #[tokio::test]
    async fn reset_empties_both_collections() {
        let store = store(provider());
        store.ensure_collections().await.unwrap();
        store
            .add_documents(Collection::Code, vec![doc("add numbers", "/a.py")])
            .await
            .unwrap();
        store
            .add_documents(Collection::HypotheticalQuestion, vec![doc("Why?", "/a.py")])
            .await
            .unwrap();
        let service = RepoContextService::new(store);

        service.reset().await.unwrap();
        assert_eq!(service.stats().await.unwrap(), IndexStats::default());
        assert!(service.query("add numbers", None).await.unwrap().documents.is_empty());
    }
}

//! Two-stage fallback retrieval over the code and question collections.

use std::collections::BTreeSet;
use std::sync::Arc;

use gitctx_llm::LlmProvider;
use gitctx_memory::{Collection, DualIndexStore, MetadataFilter, ScoredDocument, SearchParams};

use crate::error::{IndexError, Result, SearchStage};

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Minimum cosine similarity accepted at every stage.
    pub score_threshold: f32,
    /// Threshold for the path-restricted code search; `None` reuses
    /// `score_threshold`.
    pub rescope_threshold: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            score_threshold: 0.5,
            rescope_threshold: None,
        }
    }
}

/// How a retrieval was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStage {
    /// Code search matched directly.
    Direct,
    /// Neither code nor questions matched.
    Empty,
    /// Question matches re-scoped a second code search to their paths.
    Rescoped,
}

#[derive(Debug, Clone)]
pub struct Retrieved {
    pub documents: Vec<ScoredDocument>,
    pub stage: RetrievalStage,
}

pub struct Retriever<P: LlmProvider> {
    store: Arc<DualIndexStore<P>>,
    config: RetrievalConfig,
}

impl<P: LlmProvider> std::fmt::Debug for Retriever<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<P: LlmProvider> Retriever<P> {
    #[must_use]
    pub fn new(store: Arc<DualIndexStore<P>>, config: RetrievalConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// # Errors
    ///
    /// See [`Retriever::retrieve_k`].
    pub async fn retrieve(&self, query: &str) -> Result<Retrieved> {
        self.retrieve_k(query, self.config.top_k).await
    }

    /// Search code first; if nothing clears the threshold, search the
    /// question collection and re-run the code search restricted to the
    /// paths the matching questions point at.
    ///
    /// A re-scoped result lists code hits first, then the question hits, and
    /// keeps the questions even when the restricted code search is empty.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Retrieval`] naming the search that failed.
    pub async fn retrieve_k(&self, query: &str, k: usize) -> Result<Retrieved> {
        let params = SearchParams::new(k).with_threshold(self.config.score_threshold);

        let code = self
            .store
            .search(Collection::Code, query, &params)
            .await
            .map_err(|source| IndexError::Retrieval {
                stage: SearchStage::Code,
                source,
            })?;
        tracing::debug!(hits = code.len(), "code search finished");
        if !code.is_empty() {
            return Ok(Retrieved {
                documents: code,
                stage: RetrievalStage::Direct,
            });
        }

        let questions = self
            .store
            .search(Collection::HypotheticalQuestion, query, &params)
            .await
            .map_err(|source| IndexError::Retrieval {
                stage: SearchStage::HypotheticalQuestion,
                source,
            })?;
        tracing::debug!(hits = questions.len(), "question search finished");
        if questions.is_empty() {
            return Ok(Retrieved {
                documents: Vec::new(),
                stage: RetrievalStage::Empty,
            });
        }

        let paths: BTreeSet<&str> = questions
            .iter()
            .map(|q| q.document.metadata.path.as_str())
            .collect();
        let rescoped = SearchParams::new(k)
            .with_threshold(
                self.config
                    .rescope_threshold
                    .unwrap_or(self.config.score_threshold),
            )
            .with_filter(MetadataFilter::path_in(paths));

        let mut documents = self
            .store
            .search(Collection::Code, query, &rescoped)
            .await
            .map_err(|source| IndexError::Retrieval {
                stage: SearchStage::Rescoped,
                source,
            })?;
        tracing::debug!(
            code_hits = documents.len(),
            question_hits = questions.len(),
            "rescoped code search finished"
        );
        documents.extend(questions);

        Ok(Retrieved {
            documents,
            stage: RetrievalStage::Rescoped,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;

    use gitctx_llm::mock::MockProvider;
    use gitctx_memory::document::{Document, DocumentMetadata};
    use gitctx_memory::{
        CollectionNames, InMemoryVectorStore, ScoredVectorPoint, VectorFilter, VectorPoint,
        VectorStore, VectorStoreError,
    };

    use super::*;

    const QUERY: &str = "how are two numbers summed?";

    fn doc(content: &str, path: &str) -> Document {
        Document::new(
            content,
            DocumentMetadata {
                repo_url: "https://github.com/octo/demo".into(),
                path: path.into(),
                filename: path.rsplit('/').next().unwrap_or_default().into(),
                extension: "py".into(),
                language: "python".into(),
                ..DocumentMetadata::default()
            },
        )
    }

    fn provider() -> MockProvider {
        MockProvider::default()
            .with_embeddings([
                (QUERY, vec![0.0, 1.0, 0.0]),
                ("def add(a, b): return a + b", vec![0.8, 0.6, 0.0]),
                ("def render(page): ...", vec![0.7, 0.0, 0.71]),
                ("class Summer: ...", vec![0.0, 0.45, 0.89]),
                ("How does add sum two numbers?", vec![0.1, 0.99, 0.0]),
                ("What does render draw?", vec![0.0, 0.2, 0.98]),
                ("Where are sums computed?", vec![0.0, 0.9, 0.1]),
            ])
            .with_default_embedding(vec![0.0, 0.0, 1.0])
    }

    async fn store() -> Arc<DualIndexStore<MockProvider>> {
        let store = DualIndexStore::new(
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(provider()),
            CollectionNames::default(),
            3,
        );
        store.ensure_collections().await.unwrap();
        Arc::new(store)
    }

    async fn seed_code(store: &DualIndexStore<MockProvider>, docs: Vec<Document>) {
        store.add_documents(Collection::Code, docs).await.unwrap();
    }

    async fn seed_questions(store: &DualIndexStore<MockProvider>, docs: Vec<Document>) {
        store
            .add_documents(Collection::HypotheticalQuestion, docs)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn direct_hit_skips_question_search() {
        let store = store().await;
        seed_code(&store, vec![doc("def add(a, b): return a + b", "/src/example.py")]).await;
        seed_questions(&store, vec![doc("How does add sum two numbers?", "/src/example.py")]).await;

        let retrieved = Retriever::new(store, RetrievalConfig::default())
            .retrieve(QUERY)
            .await
            .unwrap();
        assert_eq!(retrieved.stage, RetrievalStage::Direct);
        assert_eq!(retrieved.documents.len(), 1);
        assert!(
            retrieved
                .documents
                .iter()
                .all(|d| d.collection == Collection::Code)
        );
    }

    #[tokio::test]
    async fn nothing_matches_is_empty() {
        let store = store().await;
        seed_code(&store, vec![doc("def render(page): ...", "/src/view.py")]).await;
        seed_questions(&store, vec![doc("What does render draw?", "/src/view.py")]).await;

        let retrieved = Retriever::new(store, RetrievalConfig::default())
            .retrieve(QUERY)
            .await
            .unwrap();
        assert_eq!(retrieved.stage, RetrievalStage::Empty);
        assert!(retrieved.documents.is_empty());
    }

    #[tokio::test]
    async fn empty_store_is_empty() {
        let retrieved = Retriever::new(store().await, RetrievalConfig::default())
            .retrieve(QUERY)
            .await
            .unwrap();
        assert_eq!(retrieved.stage, RetrievalStage::Empty);
    }

    #[tokio::test]
    async fn question_match_rescopes_code_search() {
        let store = store().await;
        seed_code(
            &store,
            vec![
                doc("class Summer: ...", "/src/example.py"),
                doc("def render(page): ...", "/src/view.py"),
            ],
        )
        .await;
        seed_questions(
            &store,
            vec![
                doc("How does add sum two numbers?", "/src/example.py"),
                doc("What does render draw?", "/src/view.py"),
            ],
        )
        .await;

        let config = RetrievalConfig {
            rescope_threshold: Some(0.3),
            ..RetrievalConfig::default()
        };
        let retrieved = Retriever::new(store, config).retrieve(QUERY).await.unwrap();
        assert_eq!(retrieved.stage, RetrievalStage::Rescoped);

        let collections: Vec<_> = retrieved.documents.iter().map(|d| d.collection).collect();
        assert_eq!(
            collections,
            vec![Collection::Code, Collection::HypotheticalQuestion]
        );
        assert!(
            retrieved
                .documents
                .iter()
                .all(|d| d.document.metadata.path == "/src/example.py")
        );
        assert_eq!(retrieved.documents[0].document.content, "class Summer: ...");
    }

    #[tokio::test]
    async fn rescoped_keeps_questions_when_code_part_is_empty() {
        let store = store().await;
        seed_code(&store, vec![doc("class Summer: ...", "/src/example.py")]).await;
        seed_questions(
            &store,
            vec![
                doc("How does add sum two numbers?", "/src/example.py"),
                doc("Where are sums computed?", "/src/math.py"),
            ],
        )
        .await;

        let retrieved = Retriever::new(store, RetrievalConfig::default())
            .retrieve(QUERY)
            .await
            .unwrap();
        assert_eq!(retrieved.stage, RetrievalStage::Rescoped);
        assert_eq!(retrieved.documents.len(), 2);
        assert!(
            retrieved
                .documents
                .iter()
                .all(|d| d.collection == Collection::HypotheticalQuestion)
        );
    }

    #[tokio::test]
    async fn retrieve_k_limits_each_search() {
        let store = store().await;
        let docs = (0..8)
            .map(|i| doc("def add(a, b): return a + b", &format!("/src/add{i}.py")))
            .collect();
        seed_code(&store, docs).await;

        let retriever = Retriever::new(store, RetrievalConfig::default());
        assert_eq!(retriever.retrieve(QUERY).await.unwrap().documents.len(), 5);
        assert_eq!(retriever.retrieve_k(QUERY, 2).await.unwrap().documents.len(), 2);
    }

    /// Fails searches against one physical collection name.
    struct FailingStore {
        inner: InMemoryVectorStore,
        fail_on: &'static str,
    }

    type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

    impl VectorStore for FailingStore {
        fn ensure_collection(
            &self,
            collection: &str,
            vector_size: u64,
        ) -> BoxFut<'_, std::result::Result<(), VectorStoreError>> {
            self.inner.ensure_collection(collection, vector_size)
        }

        fn collection_exists(
            &self,
            collection: &str,
        ) -> BoxFut<'_, std::result::Result<bool, VectorStoreError>> {
            self.inner.collection_exists(collection)
        }

        fn delete_collection(
            &self,
            collection: &str,
        ) -> BoxFut<'_, std::result::Result<(), VectorStoreError>> {
            self.inner.delete_collection(collection)
        }

        fn upsert(
            &self,
            collection: &str,
            points: Vec<VectorPoint>,
        ) -> BoxFut<'_, std::result::Result<(), VectorStoreError>> {
            self.inner.upsert(collection, points)
        }

        fn search(
            &self,
            collection: &str,
            vector: Vec<f32>,
            limit: u64,
            filter: Option<VectorFilter>,
        ) -> BoxFut<'_, std::result::Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
            if collection == self.fail_on {
                return Box::pin(async { Err(VectorStoreError::Search("offline".into())) });
            }
            self.inner.search(collection, vector, limit, filter)
        }

        fn count(&self, collection: &str) -> BoxFut<'_, std::result::Result<u64, VectorStoreError>> {
            self.inner.count(collection)
        }
    }

    #[tokio::test]
    async fn store_failure_names_the_stage() {
        let store = DualIndexStore::new(
            Arc::new(FailingStore {
                inner: InMemoryVectorStore::new(),
                fail_on: "hypothetical_questions",
            }),
            Arc::new(provider()),
            CollectionNames::default(),
            3,
        );
        store.ensure_collections().await.unwrap();

        let err = Retriever::new(Arc::new(store), RetrievalConfig::default())
            .retrieve(QUERY)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::Retrieval {
                stage: SearchStage::HypotheticalQuestion,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn code_store_failure_is_fatal() {
        let store = DualIndexStore::new(
            Arc::new(FailingStore {
                inner: InMemoryVectorStore::new(),
                fail_on: "code_documents",
            }),
            Arc::new(provider()),
            CollectionNames::default(),
            3,
        );
        store.ensure_collections().await.unwrap();

        let err = Retriever::new(Arc::new(store), RetrievalConfig::default())
            .retrieve(QUERY)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::Retrieval {
                stage: SearchStage::Code,
                ..
            }
        ));
    }
}

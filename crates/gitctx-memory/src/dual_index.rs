//! Two independent embedding collections: source code chunks and the
//! hypothetical questions generated from them.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use gitctx_llm::LlmProvider;

use crate::document::{Document, DocumentMetadata};
use crate::error::MemoryError;
use crate::vector_store::{
    FieldCondition, FieldValue, ScoredVectorPoint, VectorFilter, VectorPoint, VectorStore,
};

const DEFAULT_EMBED_BATCH_SIZE: usize = 64;
const CONTENT_KEY: &str = "content";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Code,
    HypotheticalQuestion,
}

impl Collection {
    pub const ALL: [Self; 2] = [Self::Code, Self::HypotheticalQuestion];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::HypotheticalQuestion => "hypothetical-question",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical collection names in the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNames {
    pub code: String,
    pub questions: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            code: "code_documents".into(),
            questions: "hypothetical_questions".into(),
        }
    }
}

impl CollectionNames {
    #[must_use]
    pub fn name(&self, collection: Collection) -> &str {
        match collection {
            Collection::Code => &self.code,
            Collection::HypotheticalQuestion => &self.questions,
        }
    }
}

/// Restricts a search to documents whose `path` is in a given set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    paths: BTreeSet<String>,
}

impl MetadataFilter {
    #[must_use]
    pub fn path_in<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn paths(&self) -> &BTreeSet<String> {
        &self.paths
    }

    fn to_vector_filter(&self) -> VectorFilter {
        VectorFilter {
            must: vec![FieldCondition {
                field: "path".into(),
                value: FieldValue::AnyText(self.paths.iter().cloned().collect()),
            }],
            must_not: vec![],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub k: usize,
    pub score_threshold: Option<f32>,
    pub filter: Option<MetadataFilter>,
}

impl SearchParams {
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            score_threshold: None,
            filter: None,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    pub collection: Collection,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub code: u64,
    pub questions: u64,
}

/// Embedding store over two logical collections sharing one provider.
///
/// Documents get fresh UUIDs on every insert; re-ingesting a repository
/// stores duplicates.
pub struct DualIndexStore<P: LlmProvider> {
    store: Arc<dyn VectorStore>,
    provider: Arc<P>,
    names: CollectionNames,
    vector_size: u64,
    embed_batch_size: usize,
}

impl<P: LlmProvider> fmt::Debug for DualIndexStore<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DualIndexStore")
            .field("provider", &self.provider.name())
            .field("names", &self.names)
            .field("vector_size", &self.vector_size)
            .finish_non_exhaustive()
    }
}

impl<P: LlmProvider> DualIndexStore<P> {
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<P>,
        names: CollectionNames,
        vector_size: u64,
    ) -> Self {
        Self {
            store,
            provider,
            names,
            vector_size,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_embed_batch_size(mut self, size: usize) -> Self {
        self.embed_batch_size = size.max(1);
        self
    }

    #[must_use]
    pub fn names(&self) -> &CollectionNames {
        &self.names
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Create both collections if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the request.
    pub async fn ensure_collections(&self) -> Result<(), MemoryError> {
        for collection in Collection::ALL {
            self.store
                .ensure_collection(self.names.name(collection), self.vector_size)
                .await?;
        }
        Ok(())
    }

    /// Embed and store `documents`, returning how many were written.
    ///
    /// The whole batch is rejected up front if any document lacks a path.
    /// Every document is embedded before the first upsert, so an embedding
    /// failure writes nothing. A store failure partway through leaves the
    /// batches before it in place.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::MissingPath`], [`MemoryError::DimensionMismatch`]
    /// when the provider returns vectors of the wrong size, or any embedding
    /// or store error.
    pub async fn add_documents(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> Result<usize, MemoryError> {
        if documents.is_empty() {
            return Ok(0);
        }
        if documents.iter().any(|d| !d.has_path()) {
            return Err(MemoryError::MissingPath);
        }

        let name = self.names.name(collection);
        let mut batches = Vec::new();
        for batch in documents.chunks(self.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
            let vectors = self.provider.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(MemoryError::Other(format!(
                    "provider returned {} embeddings for {} documents",
                    vectors.len(),
                    batch.len()
                )));
            }

            let mut points = Vec::with_capacity(batch.len());
            for (doc, vector) in batch.iter().zip(vectors) {
                if vector.len() as u64 != self.vector_size {
                    return Err(MemoryError::DimensionMismatch {
                        expected: self.vector_size,
                        actual: vector.len(),
                    });
                }
                points.push(VectorPoint {
                    id: uuid::Uuid::new_v4().to_string(),
                    vector,
                    payload: document_payload(doc)?,
                });
            }
            batches.push(points);
        }

        let mut stored = 0;
        for points in batches {
            let len = points.len();
            self.store.upsert(name, points).await?;
            stored += len;
            tracing::debug!(%collection, batch = len, "upserted embedding batch");
        }

        tracing::info!(%collection, count = stored, "stored documents");
        Ok(stored)
    }

    /// Nearest documents to `query`, best first, dropping hits below the
    /// threshold when one is set.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding the query or searching the store fails.
    pub async fn search(
        &self,
        collection: Collection,
        query: &str,
        params: &SearchParams,
    ) -> Result<Vec<ScoredDocument>, MemoryError> {
        if params.k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.provider.embed(query).await?;
        let filter = params.filter.as_ref().map(MetadataFilter::to_vector_filter);
        let hits = self
            .store
            .search(self.names.name(collection), vector, params.k as u64, filter)
            .await?;

        let threshold = params.score_threshold;
        let results = hits
            .into_iter()
            .filter(|hit| threshold.is_none_or(|t| hit.score >= t))
            .map(|hit| scored_document(hit, collection))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(%collection, hits = results.len(), "search finished");
        Ok(results)
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot count the collection.
    pub async fn count(&self, collection: Collection) -> Result<u64, MemoryError> {
        Ok(self.store.count(self.names.name(collection)).await?)
    }

    /// # Errors
    ///
    /// Returns an error if either collection cannot be counted.
    pub async fn stats(&self) -> Result<IndexStats, MemoryError> {
        Ok(IndexStats {
            code: self.count(Collection::Code).await?,
            questions: self.count(Collection::HypotheticalQuestion).await?,
        })
    }

    /// Drop a collection and everything in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the delete.
    pub async fn delete_collection(&self, collection: Collection) -> Result<(), MemoryError> {
        self.store
            .delete_collection(self.names.name(collection))
            .await?;
        tracing::info!(%collection, "deleted collection");
        Ok(())
    }
}

fn document_payload(doc: &Document) -> Result<HashMap<String, serde_json::Value>, MemoryError> {
    let serde_json::Value::Object(fields) = serde_json::to_value(&doc.metadata)? else {
        return Err(MemoryError::Other("metadata did not serialize to an object".into()));
    };
    let mut payload: HashMap<String, serde_json::Value> = fields.into_iter().collect();
    payload.insert(CONTENT_KEY.into(), serde_json::Value::String(doc.content.clone()));
    Ok(payload)
}

fn scored_document(
    hit: ScoredVectorPoint,
    collection: Collection,
) -> Result<ScoredDocument, MemoryError> {
    let mut payload = hit.payload;
    let content = match payload.remove(CONTENT_KEY) {
        Some(serde_json::Value::String(s)) => s,
        _ => {
            return Err(MemoryError::Other(format!(
                "point {} in {collection} has no content",
                hit.id
            )));
        }
    };
    let metadata: DocumentMetadata =
        serde_json::from_value(serde_json::Value::Object(payload.into_iter().collect()))?;
    Ok(ScoredDocument {
        document: Document { content, metadata },
        collection,
        score: hit.score,
    })
}

#[cfg(test)]
mod tests {
    use gitctx_llm::mock::MockProvider;

    use super::*;
    use crate::in_memory_store::InMemoryVectorStore;

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

    fn store_with(provider: MockProvider) -> DualIndexStore<MockProvider> {
        DualIndexStore::new(
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(provider),
            CollectionNames::default(),
            3,
        )
    }

    fn provider() -> MockProvider {
        MockProvider::default()
            .with_embeddings([
                ("def parse(): pass", vec![1.0, 0.0, 0.0]),
                ("class Cache: pass", vec![0.0, 1.0, 0.0]),
                ("how is parsing done?", vec![0.9, 0.1, 0.0]),
                ("unrelated", vec![0.0, 0.0, 1.0]),
            ])
            .with_default_embedding(vec![0.0, 0.0, 1.0])
    }

    #[test]
    fn collection_labels() {
        assert_eq!(Collection::Code.as_str(), "code");
        assert_eq!(
            Collection::HypotheticalQuestion.to_string(),
            "hypothetical-question"
        );
    }

    #[test]
    fn default_names_are_distinct() {
        let names = CollectionNames::default();
        assert_eq!(names.name(Collection::Code), "code_documents");
        assert_eq!(
            names.name(Collection::HypotheticalQuestion),
            "hypothetical_questions"
        );
    }

    #[test]
    fn path_in_deduplicates() {
        let filter = MetadataFilter::path_in(["/a.py", "/b.py", "/a.py"]);
        assert_eq!(filter.paths().len(), 2);
    }

    #[tokio::test]
    async fn add_and_search_roundtrip_metadata() {
        let store = store_with(provider());
        store.ensure_collections().await.unwrap();
        let added = store
            .add_documents(
                Collection::Code,
                vec![
                    doc("def parse(): pass", "/src/parse.py"),
                    doc("class Cache: pass", "/src/cache.py"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(added, 2);

        let hits = store
            .search(
                Collection::Code,
                "how is parsing done?",
                &SearchParams::new(5).with_threshold(0.5),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.content, "def parse(): pass");
        assert_eq!(hits[0].document.metadata.path, "/src/parse.py");
        assert_eq!(hits[0].document.metadata.filename, "parse.py");
        assert_eq!(hits[0].collection, Collection::Code);
    }

    #[tokio::test]
    async fn threshold_is_inclusive() {
        let provider = MockProvider::default()
            .with_embeddings([
                ("stored", vec![1.0, 0.0, 0.0]),
                ("query", vec![1.0, 1.0, 0.0]),
            ]);
        let store = store_with(provider);
        store.ensure_collections().await.unwrap();
        store
            .add_documents(Collection::Code, vec![doc("stored", "/s.py")])
            .await
            .unwrap();

        let exact = std::f32::consts::FRAC_1_SQRT_2;
        let hits = store
            .search(Collection::Code, "query", &SearchParams::new(5).with_threshold(exact - 1e-6))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        let hits = store
            .search(Collection::Code, "query", &SearchParams::new(5).with_threshold(0.9))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let store = store_with(provider());
        store.ensure_collections().await.unwrap();
        store
            .add_documents(
                Collection::HypotheticalQuestion,
                vec![doc("how is parsing done?", "/src/parse.py")],
            )
            .await
            .unwrap();

        let code_hits = store
            .search(Collection::Code, "how is parsing done?", &SearchParams::new(5))
            .await
            .unwrap();
        assert!(code_hits.is_empty());
        assert_eq!(
            store.stats().await.unwrap(),
            IndexStats {
                code: 0,
                questions: 1
            }
        );
    }

    #[tokio::test]
    async fn path_filter_restricts_results() {
        let store = store_with(provider());
        store.ensure_collections().await.unwrap();
        store
            .add_documents(
                Collection::Code,
                vec![
                    doc("def parse(): pass", "/src/parse.py"),
                    doc("class Cache: pass", "/src/cache.py"),
                ],
            )
            .await
            .unwrap();

        let params = SearchParams::new(5).with_filter(MetadataFilter::path_in(["/src/cache.py"]));
        let hits = store
            .search(Collection::Code, "def parse(): pass", &params)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.metadata.path, "/src/cache.py");
    }

    #[tokio::test]
    async fn rejects_document_without_path() {
        let store = store_with(provider());
        store.ensure_collections().await.unwrap();
        let err = store
            .add_documents(
                Collection::Code,
                vec![doc("def parse(): pass", "/a.py"), doc("x", "")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::MissingPath));
        assert_eq!(store.count(Collection::Code).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejects_wrong_dimension() {
        let provider = MockProvider::default().with_default_embedding(vec![1.0, 0.0]);
        let store = store_with(provider);
        store.ensure_collections().await.unwrap();
        let err = store
            .add_documents(Collection::Code, vec![doc("x", "/x.py")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MemoryError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let store = store_with(MockProvider::default().with_failing_embeddings());
        store.ensure_collections().await.unwrap();
        let err = store
            .add_documents(Collection::Code, vec![doc("x", "/x.py")])
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Llm(_)));
    }

    #[tokio::test]
    async fn late_embedding_failure_writes_nothing() {
        let provider = provider().with_embed_failure_after(2);
        let store = store_with(provider).with_embed_batch_size(2);
        store.ensure_collections().await.unwrap();
        let docs = (0..5).map(|i| doc("unrelated", &format!("/f{i}.py"))).collect();
        let err = store.add_documents(Collection::Code, docs).await.unwrap_err();
        assert!(matches!(err, MemoryError::Llm(_)));
        assert_eq!(store.count(Collection::Code).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn small_batches_store_everything() {
        let store = store_with(provider()).with_embed_batch_size(2);
        store.ensure_collections().await.unwrap();
        let docs = (0..5).map(|i| doc("unrelated", &format!("/f{i}.py"))).collect();
        assert_eq!(store.add_documents(Collection::Code, docs).await.unwrap(), 5);
        assert_eq!(store.count(Collection::Code).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn reinserting_duplicates() {
        let store = store_with(provider());
        store.ensure_collections().await.unwrap();
        for _ in 0..2 {
            store
                .add_documents(Collection::Code, vec![doc("def parse(): pass", "/p.py")])
                .await
                .unwrap();
        }
        assert_eq!(store.count(Collection::Code).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delete_collection_clears_only_that_collection() {
        let store = store_with(provider());
        store.ensure_collections().await.unwrap();
        store
            .add_documents(Collection::Code, vec![doc("a", "/a.py")])
            .await
            .unwrap();
        store
            .add_documents(Collection::HypotheticalQuestion, vec![doc("q", "/a.py")])
            .await
            .unwrap();
        store.delete_collection(Collection::Code).await.unwrap();
        assert_eq!(
            store.stats().await.unwrap(),
            IndexStats {
                code: 0,
                questions: 1
            }
        );
    }

    #[tokio::test]
    async fn zero_k_returns_nothing() {
        let store = store_with(provider());
        store.ensure_collections().await.unwrap();
        let hits = store
            .search(Collection::Code, "anything", &SearchParams::new(0))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn payload_carries_content_and_metadata() {
        let payload = document_payload(&doc("body", "/m.py")).unwrap();
        assert_eq!(payload["content"], "body");
        assert_eq!(payload["path"], "/m.py");
        assert_eq!(payload["chunk_index"], 0);
    }

    #[test]
    fn point_without_content_is_an_error() {
        let hit = ScoredVectorPoint {
            id: "x".into(),
            score: 1.0,
            payload: HashMap::new(),
        };
        assert!(scored_document(hit, Collection::Code).is_err());
    }
}

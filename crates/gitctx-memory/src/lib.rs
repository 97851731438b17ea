//! Vector storage for gitctx: the [`VectorStore`] seam with Qdrant and
//! in-process backends, document types with a recursive splitter, and the
//! [`DualIndexStore`] that keeps code chunks and hypothetical questions in
//! separate collections.

pub mod document;
pub mod dual_index;
pub mod error;
pub mod in_memory_store;
pub mod qdrant_ops;
pub mod vector_store;

pub use dual_index::{
    Collection, CollectionNames, DualIndexStore, IndexStats, MetadataFilter, ScoredDocument,
    SearchParams,
};
pub use error::MemoryError;
pub use in_memory_store::InMemoryVectorStore;
pub use qdrant_ops::QdrantOps;
pub use vector_store::{
    FieldCondition, FieldValue, ScoredVectorPoint, VectorFilter, VectorPoint, VectorStore,
    VectorStoreError,
};

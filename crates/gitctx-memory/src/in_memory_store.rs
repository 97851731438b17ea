use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::vector_store::{
    BoxFuture, FieldCondition, FieldValue, ScoredVectorPoint, VectorFilter, VectorPoint, VectorStore,
    VectorStoreError,
};

struct StoredPoint {
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
}

struct InMemoryCollection {
    vector_size: u64,
    points: HashMap<String, StoredPoint>,
}

/// Process-local [`VectorStore`] with exact cosine search.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore")
            .finish_non_exhaustive()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn matches_filter(payload: &HashMap<String, serde_json::Value>, filter: &VectorFilter) -> bool {
    let holds = |cond: &FieldCondition| {
        payload
            .get(&cond.field)
            .is_some_and(|value| field_matches(value, &cond.value))
    };
    filter.must.iter().all(holds) && !filter.must_not.iter().any(holds)
}

fn field_matches(value: &serde_json::Value, expected: &FieldValue) -> bool {
    match expected {
        FieldValue::Integer(i) => value.as_i64() == Some(*i),
        FieldValue::Text(s) => value.as_str() == Some(s.as_str()),
        FieldValue::AnyText(options) => value
            .as_str()
            .is_some_and(|v| options.iter().any(|o| o == v)),
    }
}

type Collections = HashMap<String, InMemoryCollection>;

impl InMemoryVectorStore {
    fn read_with(
        &self,
        err: fn(String) -> VectorStoreError,
    ) -> Result<RwLockReadGuard<'_, Collections>, VectorStoreError> {
        self.collections.read().map_err(|e| err(e.to_string()))
    }

    fn write_with(
        &self,
        err: fn(String) -> VectorStoreError,
    ) -> Result<RwLockWriteGuard<'_, Collections>, VectorStoreError> {
        self.collections.write().map_err(|e| err(e.to_string()))
    }
}

impl VectorStore for InMemoryVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let name = collection.to_owned();
        Box::pin(async move {
            self.write_with(VectorStoreError::Collection)?
                .entry(name)
                .or_insert_with(|| InMemoryCollection {
                    vector_size,
                    points: HashMap::new(),
                });
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let name = collection.to_owned();
        Box::pin(async move { Ok(self.read_with(VectorStoreError::Collection)?.contains_key(&name)) })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let name = collection.to_owned();
        Box::pin(async move {
            self.write_with(VectorStoreError::Collection)?.remove(&name);
            Ok(())
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let name = collection.to_owned();
        Box::pin(async move {
            let mut guard = self.write_with(VectorStoreError::Upsert)?;
            let target = guard
                .get_mut(&name)
                .ok_or_else(|| VectorStoreError::Upsert(format!("collection {name} not found")))?;
            let expected = target.vector_size;
            if let Some(bad) = points.iter().find(|p| p.vector.len() as u64 != expected) {
                return Err(VectorStoreError::Upsert(format!(
                    "point {} has dimension {}, collection {name} expects {expected}",
                    bad.id,
                    bad.vector.len(),
                )));
            }
            target.points.extend(points.into_iter().map(|p| {
                (
                    p.id,
                    StoredPoint {
                        vector: p.vector,
                        payload: p.payload,
                    },
                )
            }));
            Ok(())
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<VectorFilter>,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let name = collection.to_owned();
        Box::pin(async move {
            let guard = self.read_with(VectorStoreError::Search)?;
            let source = guard
                .get(&name)
                .ok_or_else(|| VectorStoreError::Search(format!("collection {name} not found")))?;
            let filter = filter.unwrap_or_default();

            let mut hits: Vec<ScoredVectorPoint> = source
                .points
                .iter()
                .filter(|(_, stored)| matches_filter(&stored.payload, &filter))
                .map(|(id, stored)| ScoredVectorPoint {
                    id: id.clone(),
                    score: cosine_similarity(&vector, &stored.vector),
                    payload: stored.payload.clone(),
                })
                .collect();

            // Score descending, id ascending on ties, so results are stable.
            hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
            hits.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(hits)
        })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let name = collection.to_owned();
        Box::pin(async move {
            Ok(self
                .read_with(VectorStoreError::Count)?
                .get(&name)
                .map_or(0, |c| c.points.len() as u64))
        })
    }
}

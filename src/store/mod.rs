//! Vector store consumed after a pipeline run.
//!
//! The pipeline only needs `upsert` and `search_similar`; persistence is
//! behind the trait. The in-memory implementation is enough for single-run
//! CLI use and for tests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Vector store backend error: {0}")]
    Backend(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// One stored item: enough metadata to surface a search hit without going
/// back to the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
    pub embedding: Vec<f32>,
}

/// A similarity hit
#[derive(Debug, Clone)]
pub struct SimilarItem {
    pub record: ItemRecord,
    pub score: f32,
}

#[async_trait::async_trait]
pub trait VectorStore: Send + Sync + std::fmt::Debug {
    /// Insert or replace records by id
    async fn upsert(&self, records: Vec<ItemRecord>) -> Result<(), StoreError>;

    /// Return up to `limit` records ranked by cosine similarity
    async fn search_similar(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarItem>, StoreError>;
}

/// Keyed by item id; embeddings must share one dimension.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    records: RwLock<HashMap<String, ItemRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: Vec<ItemRecord>) -> Result<(), StoreError> {
        let mut guard = self.records.write().await;

        if let Some(existing) = guard.values().next() {
            let expected = existing.embedding.len();
            for record in &records {
                if record.embedding.len() != expected {
                    return Err(StoreError::DimensionMismatch {
                        expected,
                        actual: record.embedding.len(),
                    });
                }
            }
        }

        for record in records {
            guard.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn search_similar(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarItem>, StoreError> {
        let guard = self.records.read().await;

        let mut hits: Vec<SimilarItem> = guard
            .values()
            .filter_map(|record| {
                cosine_similarity(embedding, &record.embedding).map(|score| SimilarItem {
                    record: record.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }
}

/// None when dimensions differ or either vector is all-zero
fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Vec<f32>) -> ItemRecord {
        ItemRecord {
            id: id.to_string(),
            title: format!("Title {}", id),
            summary: None,
            embedding,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_search() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(vec![
                record("a", vec![1.0, 0.0]),
                record("b", vec![0.0, 1.0]),
                record("c", vec![0.9, 0.1]),
            ])
            .await
            .unwrap();

        let hits = store.search_similar(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.id, "a");
        assert_eq!(hits[1].record.id, "c");
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = InMemoryVectorStore::new();
        store.upsert(vec![record("a", vec![1.0, 0.0])]).await.unwrap();
        store.upsert(vec![record("a", vec![0.0, 1.0])]).await.unwrap();

        assert_eq!(store.len().await, 1);
        let hits = store.search_similar(&[0.0, 1.0], 1).await.unwrap();
        assert!(hits[0].score > 0.99);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = InMemoryVectorStore::new();
        store.upsert(vec![record("a", vec![1.0, 0.0])]).await.unwrap();

        let err = store
            .upsert(vec![record("b", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_cosine_similarity_edge_cases() {
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_none());
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).is_none());
        let sim = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }
}

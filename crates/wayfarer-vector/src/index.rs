//! In-memory vector index with brute-force cosine similarity search.
//!
//! Entries are keyed by chunk id (`{documentId}-chunk-{i}`) and carry the
//! chunk's metadata so a query can be answered without a second lookup.
//! Search is O(n), which is fine for a curated travel-guide corpus.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wayfarer_core::error::{Result, WayfarerError};
use wayfarer_core::ContextChunk;

/// Metadata stored alongside every chunk vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub document_id: String,
    pub filename: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub text: String,
    pub category: String,
    pub upload_date: DateTime<Utc>,
}

/// A vector plus metadata, ready to be upserted.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

impl VectorRecord {
    /// Canonical id for chunk `index` of `document_id`.
    pub fn chunk_id(document_id: &str, index: usize) -> String {
        format!("{}-chunk-{}", document_id, index)
    }
}

/// A single hit returned from a vector query.
#[derive(Debug, Clone)]
pub struct IndexMatch {
    pub id: String,
    /// Cosine similarity score.
    pub score: f64,
    pub metadata: ChunkMetadata,
}

impl IndexMatch {
    /// Convert into the retrieval type handed to the chat layer.
    pub fn into_context_chunk(self) -> ContextChunk {
        ContextChunk {
            text: self.metadata.text,
            document_id: self.metadata.document_id,
            filename: self.metadata.filename,
            score: self.score.clamp(0.0, 1.0),
            chunk_index: self.metadata.chunk_index,
            category: self.metadata.category,
        }
    }
}

/// Exact-match metadata filters applied before ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    pub category: Option<String>,
    pub document_id: Option<String>,
}

impl QueryFilter {
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Default::default()
        }
    }

    fn matches(&self, metadata: &ChunkMetadata) -> bool {
        if let Some(ref category) = self.category {
            if &metadata.category != category {
                return false;
            }
        }
        if let Some(ref document_id) = self.document_id {
            if &metadata.document_id != document_id {
                return false;
            }
        }
        true
    }
}

/// Nearest-neighbour store over embedded chunks.
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite records by id.
    fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Return up to `top_k` matches passing `filter`, by descending score.
    fn query(&self, vector: &[f32], top_k: usize, filter: &QueryFilter) -> Result<Vec<IndexMatch>>;

    /// Remove every chunk of a document. Returns the number removed.
    fn delete_document(&self, document_id: &str) -> Result<usize>;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct VectorEntry {
    embedding: Vec<f32>,
    metadata: ChunkMetadata,
}

/// In-memory [`VectorStore`] using brute-force cosine similarity.
///
/// Thread-safe via interior RwLock; clones share the same storage.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Arc<RwLock<HashMap<String, VectorEntry>>>,
}

impl VectorIndex {
    /// Create a new empty vector index.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStore for VectorIndex {
    fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| WayfarerError::Index(format!("Lock poisoned: {}", e)))?;
        for record in records {
            entries.insert(
                record.id,
                VectorEntry {
                    embedding: record.embedding,
                    metadata: record.metadata,
                },
            );
        }
        Ok(())
    }

    fn query(&self, vector: &[f32], top_k: usize, filter: &QueryFilter) -> Result<Vec<IndexMatch>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| WayfarerError::Index(format!("Lock poisoned: {}", e)))?;

        let mut scored: Vec<IndexMatch> = entries
            .iter()
            .filter(|(_, entry)| filter.matches(&entry.metadata))
            .map(|(id, entry)| IndexMatch {
                id: id.clone(),
                score: cosine_similarity(vector, &entry.embedding),
                metadata: entry.metadata.clone(),
            })
            .collect();

        // Descending score; ties broken by id so results are stable.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(top_k);

        Ok(scored)
    }

    fn delete_document(&self, document_id: &str) -> Result<usize> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| WayfarerError::Index(format!("Lock poisoned: {}", e)))?;
        let before = entries.len();
        entries.retain(|_, entry| entry.metadata.document_id != document_id);
        Ok(before - entries.len())
    }

    fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if the lengths differ or either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(document_id: &str, index: usize, category: &str, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: VectorRecord::chunk_id(document_id, index),
            embedding,
            metadata: ChunkMetadata {
                document_id: document_id.to_string(),
                filename: format!("{}.pdf", document_id),
                chunk_index: index,
                total_chunks: 2,
                text: format!("chunk {} of {}", index, document_id),
                category: category.to_string(),
                upload_date: Utc::now(),
            },
        }
    }

    #[test]
    fn test_upsert_and_query() {
        let index = VectorIndex::new();
        index
            .upsert(vec![
                record("doc-a", 0, "guides", vec![1.0, 0.0, 0.0]),
                record("doc-a", 1, "guides", vec![0.7, 0.7, 0.0]),
                record("doc-b", 0, "hotels", vec![0.0, 1.0, 0.0]),
            ])
            .unwrap();
        assert_eq!(index.len(), 3);

        let hits = index.query(&[1.0, 0.0, 0.0], 2, &QueryFilter::default()).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "doc-a-chunk-0");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].id, "doc-a-chunk-1");
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_upsert_overwrites_same_id() {
        let index = VectorIndex::new();
        index.upsert(vec![record("doc-a", 0, "guides", vec![1.0, 0.0])]).unwrap();
        index.upsert(vec![record("doc-a", 0, "hotels", vec![0.0, 1.0])]).unwrap();
        assert_eq!(index.len(), 1);
        let hits = index.query(&[0.0, 1.0], 5, &QueryFilter::default()).unwrap();
        assert_eq!(hits[0].metadata.category, "hotels");
    }

    #[test]
    fn test_category_filter() {
        let index = VectorIndex::new();
        index
            .upsert(vec![
                record("doc-a", 0, "guides", vec![1.0, 0.0]),
                record("doc-b", 0, "hotels", vec![1.0, 0.0]),
            ])
            .unwrap();
        let hits = index.query(&[1.0, 0.0], 5, &QueryFilter::category("hotels")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.document_id, "doc-b");
    }

    #[test]
    fn test_delete_document_removes_all_chunks() {
        let index = VectorIndex::new();
        index
            .upsert(vec![
                record("doc-a", 0, "guides", vec![1.0, 0.0]),
                record("doc-a", 1, "guides", vec![0.0, 1.0]),
                record("doc-b", 0, "guides", vec![1.0, 1.0]),
            ])
            .unwrap();
        assert_eq!(index.delete_document("doc-a").unwrap(), 2);
        assert_eq!(index.len(), 1);
        assert_eq!(index.delete_document("doc-a").unwrap(), 0);
    }

    #[test]
    fn test_query_empty_index() {
        let index = VectorIndex::new();
        assert!(index.is_empty());
        let hits = index.query(&[1.0; 8], 10, &QueryFilter::default()).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_clones_share_storage() {
        let index = VectorIndex::new();
        let clone = index.clone();
        index.upsert(vec![record("doc-a", 0, "guides", vec![1.0])]).unwrap();
        assert_eq!(clone.len(), 1);
    }

    #[test]
    fn test_into_context_chunk_clamps_score() {
        let hit = IndexMatch {
            id: "doc-a-chunk-0".to_string(),
            score: -0.2,
            metadata: record("doc-a", 0, "guides", vec![]).metadata,
        };
        let chunk = hit.into_context_chunk();
        assert_eq!(chunk.score, 0.0);
        assert_eq!(chunk.filename, "doc-a.pdf");
        assert_eq!(chunk.category, "guides");
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}

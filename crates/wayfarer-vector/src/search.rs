//! Search engine combining query embedding with vector search.
//!
//! SearchEngine orchestrates the embedding service (to embed queries) and the
//! vector store (to find nearest neighbours), applying the category filter
//! and the minimum relevance score.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use wayfarer_core::error::Result;
use wayfarer_core::ContextChunk;

use crate::embedding::DynEmbeddingService;
use crate::index::{QueryFilter, VectorStore};

/// Parameters for a single retrieval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Neighbours fetched from the index before score filtering.
    pub top_k: usize,
    /// Matches scoring below this are dropped.
    pub min_score: f64,
    /// Restrict to chunks of this category.
    pub category: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.7,
            category: None,
        }
    }
}

/// Retrieval over the document index.
///
/// Holds trait objects so production code can supply the HTTP embedding
/// client while tests use `MockEmbedding`.
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn DynEmbeddingService>,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn DynEmbeddingService>) -> Self {
        Self { store, embedder }
    }

    /// Embed `query` and return matching chunks by descending score.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<ContextChunk>> {
        let vector = self.embedder.embed_boxed(query).await?;
        let filter = QueryFilter {
            category: options.category.clone(),
            ..Default::default()
        };
        let hits = self.store.query(&vector, options.top_k, &filter)?;
        let fetched = hits.len();

        let chunks: Vec<ContextChunk> = hits
            .into_iter()
            .filter(|hit| hit.score >= options.min_score)
            .map(|hit| hit.into_context_chunk())
            .collect();

        debug!(
            fetched,
            retained = chunks.len(),
            min_score = options.min_score,
            "Vector search complete"
        );
        Ok(chunks)
    }

    /// Number of vectors in the underlying store.
    pub fn indexed_chunks(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::embedding::{EmbeddingService, MockEmbedding};
    use crate::index::{ChunkMetadata, VectorIndex, VectorRecord};

    async fn seeded_engine(texts: &[(&str, &str)]) -> SearchEngine {
        let index = VectorIndex::new();
        let embedder = MockEmbedding::new();
        let mut records = Vec::new();
        for (i, (text, category)) in texts.iter().enumerate() {
            records.push(VectorRecord {
                id: VectorRecord::chunk_id("doc", i),
                embedding: embedder.embed(text).await.unwrap(),
                metadata: ChunkMetadata {
                    document_id: "doc".to_string(),
                    filename: "guide.pdf".to_string(),
                    chunk_index: i,
                    total_chunks: texts.len(),
                    text: text.to_string(),
                    category: category.to_string(),
                    upload_date: Utc::now(),
                },
            });
        }
        index.upsert(records).unwrap();
        SearchEngine::new(Arc::new(index), Arc::new(embedder))
    }

    #[tokio::test]
    async fn test_search_empty_index() {
        let engine = seeded_engine(&[]).await;
        let results = engine.search("anything", &SearchOptions::default()).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(engine.indexed_chunks(), 0);
    }

    #[tokio::test]
    async fn test_search_finds_exact_match() {
        let engine = seeded_engine(&[
            ("Best ramen in Shinjuku", "food"),
            ("Temples of Kyoto", "guides"),
        ])
        .await;

        let results = engine
            .search("Temples of Kyoto", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "Temples of Kyoto");
        assert_eq!(results[0].chunk_index, 1);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_min_score_filters_weak_matches() {
        let engine = seeded_engine(&[("Temples of Kyoto", "guides")]).await;
        let results = engine
            .search("Street food in Bangkok", &SearchOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());

        let permissive = SearchOptions {
            min_score: -1.0,
            ..Default::default()
        };
        let results = engine.search("Street food in Bangkok", &permissive).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_category_filter() {
        let engine = seeded_engine(&[
            ("Temples of Kyoto", "guides"),
            ("Temples of Kyoto", "hotels"),
        ])
        .await;
        let options = SearchOptions {
            category: Some("hotels".to_string()),
            ..Default::default()
        };
        let results = engine.search("Temples of Kyoto", &options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category, "hotels");
    }

    #[tokio::test]
    async fn test_search_respects_top_k() {
        let texts: Vec<(String, &str)> = (0..10)
            .map(|i| (format!("same passage {}", i % 2), "guides"))
            .collect();
        let refs: Vec<(&str, &str)> = texts.iter().map(|(t, c)| (t.as_str(), *c)).collect();
        let engine = seeded_engine(&refs).await;

        let options = SearchOptions {
            top_k: 3,
            ..Default::default()
        };
        let results = engine.search("same passage 0", &options).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_search_empty_query_is_error() {
        let engine = seeded_engine(&[("Temples of Kyoto", "guides")]).await;
        assert!(engine.search("", &SearchOptions::default()).await.is_err());
    }
}

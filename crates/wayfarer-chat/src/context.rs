//! Retrieval context for a chat turn.
//!
//! Embeds the user's message, pulls the nearest document chunks and formats
//! the ones above the relevance threshold into a labelled block for the
//! prompt. Retrieval is best effort: any failure yields an empty context and
//! the turn carries on without it.

use tracing::{debug, warn};

use wayfarer_core::config::RetrievalConfig;
use wayfarer_core::ContextChunk;
use wayfarer_vector::search::{SearchEngine, SearchOptions};

/// Separator placed between formatted sources.
pub const SOURCE_SEPARATOR: &str = "\n\n---\n\n";

/// Retrieved context for one turn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssembledContext {
    pub has_context: bool,
    pub context_text: String,
    pub chunks: Vec<ContextChunk>,
}

impl AssembledContext {
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_chunks(chunks: Vec<ContextChunk>) -> Self {
        if chunks.is_empty() {
            return Self::empty();
        }
        Self {
            has_context: true,
            context_text: format_chunks(&chunks),
            chunks,
        }
    }
}

/// Format chunks as numbered, labelled sources in their given order.
pub fn format_chunks(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[Source {}: {} (Relevance: {:.1}%)]\n{}",
                i + 1,
                chunk.filename,
                chunk.score * 100.0,
                chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join(SOURCE_SEPARATOR)
}

/// Builds prompt context from the document index.
#[derive(Clone)]
pub struct ContextAssembler {
    search: SearchEngine,
    options: SearchOptions,
}

impl ContextAssembler {
    pub fn new(search: SearchEngine, config: &RetrievalConfig) -> Self {
        Self {
            search,
            options: SearchOptions {
                top_k: config.top_k,
                min_score: config.relevance_threshold,
                category: None,
            },
        }
    }

    /// Retrieve and format context for `query`. Never fails.
    pub async fn assemble(&self, query: &str) -> AssembledContext {
        match self.search.search(query, &self.options).await {
            Ok(chunks) => {
                debug!(retained = chunks.len(), "Context assembled");
                AssembledContext::from_chunks(chunks)
            }
            Err(e) => {
                warn!(error = %e, "Retrieval unavailable, continuing without context");
                AssembledContext::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use wayfarer_core::error::{Result, WayfarerError};
    use wayfarer_vector::embedding::{EmbeddingService, MockEmbedding};
    use wayfarer_vector::index::{ChunkMetadata, VectorIndex, VectorRecord, VectorStore};

    struct FailingEmbedding;

    impl EmbeddingService for FailingEmbedding {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(WayfarerError::Auth("missing key".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(WayfarerError::Auth("missing key".to_string()))
        }

        fn dimensions(&self) -> usize {
            384
        }
    }

    fn chunk(text: &str, filename: &str, score: f64) -> ContextChunk {
        ContextChunk {
            text: text.to_string(),
            document_id: "doc".to_string(),
            filename: filename.to_string(),
            score,
            chunk_index: 0,
            category: "general".to_string(),
        }
    }

    async fn assembler_with(texts: &[&str]) -> ContextAssembler {
        let index = VectorIndex::new();
        let embedder = MockEmbedding::new();
        for (i, text) in texts.iter().enumerate() {
            index
                .upsert(vec![VectorRecord {
                    id: VectorRecord::chunk_id("doc", i),
                    embedding: embedder.embed(text).await.unwrap(),
                    metadata: ChunkMetadata {
                        document_id: "doc".to_string(),
                        filename: "japan-guide.pdf".to_string(),
                        chunk_index: i,
                        total_chunks: texts.len(),
                        text: text.to_string(),
                        category: "general".to_string(),
                        upload_date: Utc::now(),
                    },
                }])
                .unwrap();
        }
        let engine = SearchEngine::new(Arc::new(index), Arc::new(embedder));
        ContextAssembler::new(engine, &RetrievalConfig::default())
    }

    #[test]
    fn test_format_chunks() {
        let text = format_chunks(&[
            chunk("Cherry blossoms peak in April.", "japan.pdf", 0.8234),
            chunk("Rail passes save money.", "rail.pdf", 0.75),
        ]);
        assert_eq!(
            text,
            "[Source 1: japan.pdf (Relevance: 82.3%)]\nCherry blossoms peak in April.\
             \n\n---\n\n\
             [Source 2: rail.pdf (Relevance: 75.0%)]\nRail passes save money."
        );
    }

    #[tokio::test]
    async fn test_matching_chunk_is_included() {
        let assembler = assembler_with(&["When is cherry blossom season in Kyoto?"]).await;
        let ctx = assembler
            .assemble("When is cherry blossom season in Kyoto?")
            .await;
        assert!(ctx.has_context);
        assert_eq!(ctx.chunks.len(), 1);
        assert!(ctx.context_text.starts_with("[Source 1: japan-guide.pdf (Relevance: 100.0%)]"));
    }

    #[tokio::test]
    async fn test_no_match_above_threshold() {
        let assembler = assembler_with(&["Temples of Kyoto", "Ramen in Sapporo"]).await;
        let ctx = assembler.assemble("I'm starting from Boston").await;
        assert!(!ctx.has_context);
        assert_eq!(ctx.context_text, "");
        assert!(ctx.chunks.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades() {
        let engine = SearchEngine::new(Arc::new(VectorIndex::new()), Arc::new(FailingEmbedding));
        let assembler = ContextAssembler::new(engine, &RetrievalConfig::default());
        let ctx = assembler.assemble("anything").await;
        assert_eq!(ctx, AssembledContext::empty());
    }

    #[tokio::test]
    async fn test_empty_index() {
        let assembler = assembler_with(&[]).await;
        let ctx = assembler.assemble("Lisbon").await;
        assert!(!ctx.has_context);
    }
}

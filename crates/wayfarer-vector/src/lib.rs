//! Wayfarer Vector crate - embedding service, in-memory vector index, text
//! chunking, document ingestion, and retrieval.
//!
//! Provides an HTTP embedding client for OpenAI-compatible providers with a
//! deterministic mock for testing, a brute-force cosine similarity index keyed
//! by chunk id, and the search engine that turns queries into scored
//! [`ContextChunk`](wayfarer_core::ContextChunk)s.

pub mod chunker;
pub mod embedding;
pub mod index;
pub mod pipeline;
pub mod search;

pub use chunker::{clean_text, prepare_chunks, split_text, TextChunk};
pub use embedding::{DynEmbeddingService, EmbeddingService, HttpEmbeddingService, MockEmbedding};
pub use index::{ChunkMetadata, IndexMatch, QueryFilter, VectorIndex, VectorRecord, VectorStore};
pub use pipeline::{DocumentInfo, DocumentPipeline, IngestReport, IngestRequest};
pub use search::{SearchEngine, SearchOptions};

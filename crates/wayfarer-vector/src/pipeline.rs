//! Document ingestion pipeline.
//!
//! The DocumentPipeline takes extracted document text through cleaning,
//! chunking, batch embedding and vector index upsert, and keeps a registry
//! of ingested documents so they can be listed and deleted.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use wayfarer_core::config::RetrievalConfig;
use wayfarer_core::error::{Result, WayfarerError};

use crate::chunker::prepare_chunks;
use crate::embedding::DynEmbeddingService;
use crate::index::{ChunkMetadata, VectorRecord, VectorStore};

/// Category assigned when the caller does not name one.
pub const DEFAULT_CATEGORY: &str = "general";

/// A document to ingest. The text has already been extracted from its source.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub filename: String,
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Either a list or a comma-separated string.
    #[serde(default, deserialize_with = "tags_from_list_or_csv")]
    pub tags: Vec<String>,
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub document_id: String,
    pub filename: String,
    pub chunks: usize,
    pub characters: usize,
}

/// Registry entry for an ingested document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub document_id: String,
    pub filename: String,
    pub category: String,
    pub tags: Vec<String>,
    pub total_chunks: usize,
    pub total_characters: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// Ingests documents into a shared [`VectorStore`].
pub struct DocumentPipeline {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn DynEmbeddingService>,
    documents: RwLock<HashMap<String, DocumentInfo>>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentPipeline {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn DynEmbeddingService>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            documents: RwLock::new(HashMap::new()),
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }

    /// Chunk, embed and index a document.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReport> {
        let filename = request.filename.trim().to_string();
        if filename.is_empty() {
            return Err(WayfarerError::Ingest("filename is required".to_string()));
        }

        let chunks = prepare_chunks(&request.text, self.chunk_size, self.chunk_overlap)?;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        debug!(filename = %filename, chunks = texts.len(), "Embedding document chunks");

        let embeddings = self.embedder.embed_batch_boxed(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(WayfarerError::Ingest(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let document_id = Uuid::new_v4().to_string();
        let category = request
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let uploaded_at = Utc::now();
        let total_chunks = chunks.len();

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| VectorRecord {
                id: VectorRecord::chunk_id(&document_id, chunk.chunk_index),
                embedding,
                metadata: ChunkMetadata {
                    document_id: document_id.clone(),
                    filename: filename.clone(),
                    chunk_index: chunk.chunk_index,
                    total_chunks,
                    text: chunk.text,
                    category: category.clone(),
                    upload_date: uploaded_at,
                },
            })
            .collect();
        self.store.upsert(records)?;

        let characters: usize = texts.iter().map(|t| t.chars().count()).sum();
        let info = DocumentInfo {
            document_id: document_id.clone(),
            filename: filename.clone(),
            category,
            tags: request.tags,
            total_chunks,
            total_characters: characters,
            uploaded_at,
        };
        self.documents
            .write()
            .map_err(|e| WayfarerError::Index(format!("Lock poisoned: {}", e)))?
            .insert(document_id.clone(), info);

        info!(
            document_id = %document_id,
            filename = %filename,
            chunks = total_chunks,
            characters,
            "Document indexed"
        );

        Ok(IngestReport {
            document_id,
            filename,
            chunks: total_chunks,
            characters,
        })
    }

    /// Registered documents, newest first, optionally restricted to a category.
    pub fn list_documents(&self, category: Option<&str>) -> Result<Vec<DocumentInfo>> {
        let documents = self
            .documents
            .read()
            .map_err(|e| WayfarerError::Index(format!("Lock poisoned: {}", e)))?;
        let mut listed: Vec<DocumentInfo> = documents
            .values()
            .filter(|d| category.map_or(true, |c| d.category == c))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(listed)
    }

    /// Remove a document and all of its vectors.
    pub fn delete(&self, document_id: &str) -> Result<usize> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| WayfarerError::Index(format!("Lock poisoned: {}", e)))?;
        if !documents.contains_key(document_id) {
            return Err(WayfarerError::NotFound(format!("Document {} not found", document_id)));
        }
        let removed = self.store.delete_document(document_id)?;
        documents.remove(document_id);
        info!(document_id = %document_id, vectors = removed, "Document deleted");
        Ok(removed)
    }

    /// Number of registered documents.
    pub fn document_count(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }
}

fn tags_from_list_or_csv<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Csv(String),
    }

    let tags = match Option::<Tags>::deserialize(deserializer)? {
        Some(Tags::List(list)) => list,
        Some(Tags::Csv(csv)) => csv.split(',').map(str::to_string).collect(),
        None => Vec::new(),
    };
    Ok(tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

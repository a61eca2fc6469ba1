//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use wayfarer_chat::{ContextAssembler, LanguageModel, TripOrchestrator};
use wayfarer_core::WayfarerConfig;
use wayfarer_vector::{DocumentPipeline, DynEmbeddingService, SearchEngine, VectorStore};

/// Shared application state.
///
/// All fields use `Arc` (or are cheap to clone) so handler tasks can each
/// hold a copy. The document index is the only shared mutable resource and
/// guards itself.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<WayfarerConfig>,
    /// Conversational turn handler.
    pub orchestrator: Arc<TripOrchestrator>,
    /// Document ingestion and registry.
    pub pipeline: Arc<DocumentPipeline>,
    /// Retrieval over the document index.
    pub search_engine: SearchEngine,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Wire the services around a language model, a vector store and an
    /// embedding service.
    pub fn new(
        config: WayfarerConfig,
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn DynEmbeddingService>,
    ) -> Self {
        let search_engine = SearchEngine::new(Arc::clone(&store), Arc::clone(&embedder));
        let pipeline = DocumentPipeline::new(store, embedder, &config.retrieval);
        let orchestrator = TripOrchestrator::new(
            model,
            ContextAssembler::new(search_engine.clone(), &config.retrieval),
            &config.llm,
            &config.chat,
        );

        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            pipeline: Arc::new(pipeline),
            search_engine,
            start_time: Instant::now(),
        }
    }
}

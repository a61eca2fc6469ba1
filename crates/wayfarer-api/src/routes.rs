//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression, rate limiting
//! and body limits around the endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use wayfarer_core::error::WayfarerError;
use wayfarer_core::WayfarerConfig;

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::state::AppState;

/// Global request body limit.
const BODY_LIMIT: usize = 1024 * 1024;
/// Body limit for document ingestion, which carries full extracted text.
const DOCUMENT_BODY_LIMIT: usize = 10 * 1024 * 1024;

fn cors_layer(config: &WayfarerConfig) -> CorsLayer {
    let port = config.general.port;
    let own = [
        format!("http://127.0.0.1:{}", port),
        format!("http://localhost:{}", port),
    ];
    let origins: Vec<HeaderValue> = own
        .iter()
        .chain(config.general.allowed_origins.iter())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let limiter = RateLimiter::new(state.config.general.rate_limit_per_sec);

    let api_routes = Router::new()
        .route("/ai/message", post(handlers::message))
        .route(
            "/documents",
            get(handlers::list_documents)
                .post(handlers::ingest_document)
                .layer(DefaultBodyLimit::max(DOCUMENT_BODY_LIMIT)),
        )
        .route("/documents/query", post(handlers::query_documents))
        .route("/documents/{id}", delete(handlers::delete_document))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
        .layer(axum::Extension(limiter));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind the configured address and serve until the process exits.
pub async fn start_server(config: &WayfarerConfig, state: AppState) -> Result<(), WayfarerError> {
    let addr = format!("{}:{}", config.general.bind_address, config.general.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WayfarerError::Api(format!("Failed to bind {}: {}", addr, e)))?;
    info!("Starting API server on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| WayfarerError::Api(format!("Server error: {}", e)))?;

    Ok(())
}

//! Wayfarer API crate - axum HTTP server and route handlers.
//!
//! Serves the conversational trip-planning endpoint, document ingestion and
//! retrieval endpoints, and a health check.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;

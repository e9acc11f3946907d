//! Axum HTTP API server.
//!
//! This crate provides:
//! - `POST /analyze` running the fetch, classify, normalize pipeline
//! - Liveness and readiness checks
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::Pipeline;
pub use state::AppState;

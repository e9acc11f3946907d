//! Shared data models for the VDetect backend.
//!
//! This crate provides Serde-serializable types for:
//! - Inbound analysis requests and per-request identifiers
//! - The canonical verdict returned to callers
//! - The classification error taxonomy shared by every pipeline stage

pub mod error;
pub mod request;
pub mod verdict;

// Re-export common types
pub use error::{ClassificationError, ClassificationResult};
pub use request::{AnalysisRequest, RequestId};
pub use verdict::{Details, NormalizedResult, SCORE_MAX, SCORE_MIN};

//! Media acquisition for the analysis pipeline.
//!
//! This crate provides:
//! - Per-request scratch storage that never shares a path between requests
//! - A `MediaFetcher` seam with a yt-dlp implementation
//! - Cleanup of partial downloads when retrieval fails

pub mod config;
pub mod download;
pub mod error;
pub mod scratch;

pub use config::FetchConfig;
pub use download::{MediaFetcher, YtDlpFetcher};
pub use error::{MediaError, MediaResult};
pub use scratch::{ScratchFile, ScratchSlot, ScratchSpace};

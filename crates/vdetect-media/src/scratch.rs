//! Per-request scratch storage.
//!
//! Every request gets a slot named after its `RequestId`. The fetcher writes
//! into the slot, and the pipeline discards the resulting file when the
//! request finishes. Concurrent requests therefore never collide on a path.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};
use vdetect_models::RequestId;

use crate::error::MediaResult;

/// Suffixes yt-dlp uses for in-progress downloads.
const PARTIAL_SUFFIXES: [&str; 3] = [".part", ".ytdl", ".temp"];

/// Root directory that hands out per-request slots.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if it does not exist yet.
    pub async fn ensure(&self) -> MediaResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve the slot for a request.
    pub fn slot(&self, request_id: &RequestId) -> ScratchSlot {
        ScratchSlot {
            dir: self.root.clone(),
            stem: request_id.as_str().to_string(),
        }
    }
}

/// The set of paths one request may write to: `<root>/<request_id>.*`.
#[derive(Debug, Clone)]
pub struct ScratchSlot {
    dir: PathBuf,
    stem: String,
}

impl ScratchSlot {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// yt-dlp output template; the extension is chosen by the downloader.
    pub fn output_template(&self) -> PathBuf {
        self.dir.join(format!("{}.%(ext)s", self.stem))
    }

    /// Path inside this slot with a fixed extension.
    pub fn path_with_extension(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, ext))
    }

    /// Whether `path` belongs to this slot.
    pub fn owns(&self, path: &Path) -> bool {
        path.parent() == Some(self.dir.as_path())
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&format!("{}.", self.stem)))
                .unwrap_or(false)
    }

    /// Find a completed download in this slot.
    pub async fn find_completed(&self) -> MediaResult<Option<PathBuf>> {
        for path in self.entries().await? {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if !PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Remove everything in this slot, including partial downloads.
    ///
    /// Returns the number of files removed.
    pub async fn sweep(&self) -> usize {
        let entries = match self.entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(stem = %self.stem, "Failed to list scratch slot: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for path in entries {
            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!("Removed scratch leftover: {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove scratch leftover {}: {}", path.display(), e),
            }
        }
        removed
    }

    /// Blocking variant of [`ScratchSlot::sweep`] for use from `Drop` and
    /// scope guards, where awaiting is not possible.
    pub fn sweep_now(&self) -> usize {
        let dir = match std::fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!(stem = %self.stem, "Failed to list scratch slot: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for path in dir.flatten().map(|entry| entry.path()) {
            if !self.owns(&path) {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed scratch leftover: {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove scratch leftover {}: {}", path.display(), e),
            }
        }
        removed
    }

    async fn entries(&self) -> MediaResult<Vec<PathBuf>> {
        let mut found = Vec::new();
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if self.owns(&path) {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }
}

/// A fetched video on local disk.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Delete the file if it is still present.
    ///
    /// Synchronous so it can run from a scope guard on any exit path.
    /// Returns `true` if a file was removed.
    pub fn discard(self) -> bool {
        if !self.path.exists() {
            return false;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed scratch file: {}", self.path.display());
                true
            }
            Err(e) => {
                warn!("Failed to remove scratch file {}: {}", self.path.display(), e);
                false
            }
        }
    }
}

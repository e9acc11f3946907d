//! Video download using yt-dlp.
//!
//! The fetcher resolves the best stream for a URL, writes it into the
//! request's scratch slot and reports the final path. On any failure the
//! slot is swept so no partial download is left behind.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::error::{MediaError, MediaResult};
use crate::scratch::{ScratchFile, ScratchSlot};

/// Retrieves remote media into a scratch slot.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download `url` into `slot` and return the resolved local file.
    ///
    /// Implementations must leave the slot empty when they fail.
    async fn fetch(&self, url: &str, slot: &ScratchSlot) -> MediaResult<ScratchFile>;
}

/// `MediaFetcher` backed by the yt-dlp CLI.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    config: FetchConfig,
}

impl YtDlpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Build the yt-dlp argument list for one download.
    fn build_args(&self, url: &str, slot: &ScratchSlot) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            // --print implies --simulate; the file must still be downloaded
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "-f".to_string(),
            self.config.format.clone(),
            "-o".to_string(),
            slot.output_template().to_string_lossy().into_owned(),
        ];

        if let Some(cookies) = &self.config.cookies_path {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().into_owned());
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    async fn download(&self, url: &str, slot: &ScratchSlot) -> MediaResult<ScratchFile> {
        which::which(&self.config.binary).map_err(|_| MediaError::YtDlpNotFound)?;

        info!(url = %url, slot = %slot.stem(), "Downloading video");
        let started = Instant::now();

        let child = Command::new(&self.config.binary)
            .args(self.build_args(url, slot))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.config.timeout, child)
            .await
            .map_err(|_| MediaError::Timeout(self.config.timeout.as_secs()))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            let error_msg = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("Unknown error")
                .trim();
            return Err(MediaError::download_failed(format!(
                "yt-dlp failed: {}",
                error_msg
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = self.resolve_path(&stdout, slot).await?;

        let file_size = tokio::fs::metadata(&path).await?.len();
        info!(
            output = %path.display(),
            size_mb = file_size as f64 / (1024.0 * 1024.0),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Downloaded video successfully"
        );

        Ok(ScratchFile::new(path))
    }

    /// Trust the path yt-dlp printed if it lies inside the slot, otherwise
    /// look for whatever landed there.
    async fn resolve_path(&self, stdout: &str, slot: &ScratchSlot) -> MediaResult<PathBuf> {
        let printed = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(PathBuf::from);

        if let Some(path) = printed {
            if slot.owns(&path) && path.exists() {
                return Ok(path);
            }
            warn!(
                printed = %path.display(),
                "yt-dlp reported a path outside the scratch slot, scanning slot"
            );
        }

        slot.find_completed()
            .await?
            .ok_or_else(|| MediaError::FileNotFound(slot.output_template()))
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, slot: &ScratchSlot) -> MediaResult<ScratchFile> {
        match self.download(url, slot).await {
            Ok(file) => Ok(file),
            Err(e) => {
                let removed = slot.sweep().await;
                if removed > 0 {
                    debug!(removed, "Swept partial download after failure");
                }
                warn!(url = %url, "Video fetch failed: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scratch::ScratchSpace;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use vdetect_models::RequestId;

    fn fetcher_with(binary: PathBuf) -> YtDlpFetcher {
        YtDlpFetcher::new(FetchConfig {
            binary,
            timeout: Duration::from_secs(10),
            ..FetchConfig::default()
        })
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_build_args_prefers_mp4_and_ends_with_url() {
        let space = ScratchSpace::new("/tmp/scratch");
        let slot = space.slot(&RequestId::from_string("req"));
        let args = fetcher_with(PathBuf::from("yt-dlp")).build_args("https://v.example/1", &slot);

        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], "best[ext=mp4]/best");
        let o = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[o + 1], "/tmp/scratch/req.%(ext)s");
        assert_eq!(args[args.len() - 2], "--");
        assert_eq!(args.last().unwrap(), "https://v.example/1");
        assert!(!args.contains(&"--cookies".to_string()));
    }

    #[test]
    fn test_build_args_includes_cookies() {
        let fetcher = YtDlpFetcher::new(FetchConfig {
            cookies_path: Some(PathBuf::from("/etc/cookies.txt")),
            ..FetchConfig::default()
        });
        let slot = ScratchSpace::new("/tmp").slot(&RequestId::new());
        let args = fetcher.build_args("https://v.example/1", &slot);
        let c = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[c + 1], "/etc/cookies.txt");
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let dir = TempDir::new().unwrap();
        let slot = ScratchSpace::new(dir.path()).slot(&RequestId::new());
        let fetcher = fetcher_with(dir.path().join("no-such-yt-dlp"));

        let err = fetcher.fetch("https://v.example/1", &slot).await.unwrap_err();
        assert!(matches!(err, MediaError::YtDlpNotFound));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_resolves_printed_path() {
        let bin = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let slot = ScratchSpace::new(scratch.path()).slot(&RequestId::from_string("ok"));
        let target = slot.path_with_extension("mp4");

        let script = write_script(
            bin.path(),
            "fake-yt-dlp",
            &format!("printf 'video' > '{0}'\necho '{0}'", target.display()),
        );

        let file = fetcher_with(script)
            .fetch("https://v.example/1", &slot)
            .await
            .unwrap();
        assert_eq!(file.path(), target.as_path());
        assert!(file.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_fetch_leaves_no_partial_file() {
        let bin = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let slot = ScratchSpace::new(scratch.path()).slot(&RequestId::from_string("bad"));
        let partial = slot.path_with_extension("mp4.part");

        let script = write_script(
            bin.path(),
            "fake-yt-dlp",
            &format!(
                "printf 'x' > '{}'\necho 'ERROR: Unsupported URL: https://v.example/1' >&2\nexit 1",
                partial.display()
            ),
        );

        let err = fetcher_with(script)
            .fetch("https://v.example/1", &slot)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported URL"));
        assert!(!partial.exists());
        assert_eq!(slot.find_completed().await.unwrap(), None);
    }
}

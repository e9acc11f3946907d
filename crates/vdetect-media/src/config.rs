//! Fetcher configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Preferred container first, then whatever yt-dlp ranks best.
pub const DEFAULT_FORMAT: &str = "best[ext=mp4]/best";

/// Media fetcher configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// yt-dlp executable, looked up in PATH when not absolute
    pub binary: PathBuf,
    /// Root directory for per-request scratch files
    pub scratch_dir: PathBuf,
    /// yt-dlp format selector
    pub format: String,
    /// Upper bound for a single download
    pub timeout: Duration,
    /// Optional Netscape cookies file passed to yt-dlp
    pub cookies_path: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            scratch_dir: std::env::temp_dir().join("vdetect"),
            format: DEFAULT_FORMAT.to_string(),
            timeout: Duration::from_secs(600),
            cookies_path: None,
        }
    }
}

impl FetchConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            binary: std::env::var("YTDLP_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.binary),
            scratch_dir: std::env::var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            format: std::env::var("YTDLP_FORMAT").unwrap_or(defaults.format),
            timeout: std::env::var("FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            cookies_path: std::env::var("YTDLP_COOKIES")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.binary, PathBuf::from("yt-dlp"));
        assert_eq!(config.format, "best[ext=mp4]/best");
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert!(config.cookies_path.is_none());
        assert!(config.scratch_dir.ends_with("vdetect"));
    }
}

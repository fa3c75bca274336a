use crate::downloaders::DownloaderKind;
use crate::error::{Error, Result};
use crate::parsers::ParserBackend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Configuration shared by every pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Directory downloaded media is written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// HTML parser backend used by the media locator
    #[serde(default)]
    pub parser_backend: ParserBackend,

    /// Which media download delegate to use
    #[serde(default)]
    pub downloader: DownloaderKind,

    /// Path or name of the yt-dlp executable
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,

    /// yt-dlp format selector
    #[serde(default = "default_format")]
    pub format: String,

    /// Maximum number of downloads running at once in batch runs
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Keep going after a failed item in batch runs
    #[serde(default = "default_continue_on_error")]
    pub continue_on_error: bool,

    /// Extra fetch attempts after a transient failure
    #[serde(default)]
    pub retries: u32,

    /// Delay before the first retry, doubled on each further attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Extra headers sent with every page request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// PEM files with additional trusted root certificates
    #[serde(default)]
    pub ca_certificates: Vec<PathBuf>,

    /// Disable certificate validation entirely
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Scheme and host RaiPlay relative links are resolved against
    #[serde(default = "default_raiplay_host")]
    pub raiplay_host: String,

    /// Regex patterns a candidate URL must match to count as media
    #[serde(default = "default_media_include_patterns")]
    pub media_include_patterns: Vec<String>,

    /// Regex patterns that disqualify a candidate URL (take precedence)
    #[serde(default)]
    pub media_exclude_patterns: Vec<String>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            parser_backend: ParserBackend::default(),
            downloader: DownloaderKind::default(),
            ytdlp_path: default_ytdlp_path(),
            format: default_format(),
            max_concurrency: default_max_concurrency(),
            continue_on_error: default_continue_on_error(),
            retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            headers: BTreeMap::new(),
            ca_certificates: Vec::new(),
            accept_invalid_certs: false,
            raiplay_host: default_raiplay_host(),
            media_include_patterns: default_media_include_patterns(),
            media_exclude_patterns: Vec::new(),
        }
    }
}

impl DownloaderConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&contents)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("YT_DLP_PATH") {
            if !path.is_empty() {
                self.ytdlp_path = path;
            }
        }
        self
    }

    /// Reject values no stage can work with
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".to_string()));
        }
        if url::Url::parse(&self.raiplay_host).is_err() {
            return Err(Error::Config(format!(
                "raiplay_host is not a valid URL: {}",
                self.raiplay_host
            )));
        }
        Ok(())
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

fn default_format() -> String {
    "best[height<=720]/best".to_string()
}

fn default_max_concurrency() -> usize {
    1
}

fn default_continue_on_error() -> bool {
    true
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("raiplay-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_raiplay_host() -> String {
    "https://www.raiplay.it".to_string()
}

/// Default media URL patterns (progressive files plus HLS and DASH manifests)
pub fn default_media_include_patterns() -> Vec<String> {
    vec![r"(?i)\.(mp4|m4v|webm|mkv|mov|mp3|m4a|m3u8|mpd)(\?.*)?$".to_string()]
}

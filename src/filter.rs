use crate::config::{DownloaderConfig, default_media_include_patterns};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for deciding which candidate URLs are media
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFilterConfig {
    /// Regex patterns for media URLs (if empty, every URL counts unless excluded)
    #[serde(default = "default_media_include_patterns")]
    pub include_patterns: Vec<String>,

    /// Regex patterns for URLs to reject (these take precedence over include patterns)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl Default for MediaFilterConfig {
    fn default() -> Self {
        Self {
            include_patterns: default_media_include_patterns(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl From<&DownloaderConfig> for MediaFilterConfig {
    fn from(config: &DownloaderConfig) -> Self {
        Self {
            include_patterns: config.media_include_patterns.clone(),
            exclude_patterns: config.media_exclude_patterns.clone(),
        }
    }
}

/// URL filter that uses regex patterns to classify candidate links as media
#[derive(Debug)]
pub struct MediaFilter {
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new(MediaFilterConfig::default()).expect("Default regex patterns should be valid")
    }
}

impl MediaFilter {
    /// Create a new media filter from configuration
    pub fn new(config: MediaFilterConfig) -> Result<Self, regex::Error> {
        let include_regexes = config
            .include_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude_regexes = config
            .exclude_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_regexes,
            exclude_regexes,
        })
    }

    /// Whether a link found in an `<a href>` should be treated as media
    pub fn is_media(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        // Exclusions take precedence
        let url_str = url.as_str();
        if self.exclude_regexes.iter().any(|r| r.is_match(url_str)) {
            return false;
        }

        self.include_regexes.is_empty() || self.include_regexes.iter().any(|r| r.is_match(url_str))
    }

    /// Whether an explicit media marker (e.g. `<video src>`) should be kept
    ///
    /// Explicit markers only need to pass the exclusions.
    pub fn accepts_marker(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
            && !self.exclude_regexes.iter().any(|r| r.is_match(url.as_str()))
    }
}

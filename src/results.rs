use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A request for a single page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// URL of the page
    pub url: String,

    /// Headers sent in addition to the fetcher's defaults
    pub headers: BTreeMap<String, String>,
}

impl PageRequest {
    /// Create a request with no extra headers
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Add a request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Raw content of a fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// Final URL of the page, after redirects
    pub url: String,

    /// Body text
    pub body: String,
}

impl PageContent {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }
}

/// A downloadable media asset found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    /// Absolute URL of the asset (or of the page the delegate resolves it from)
    pub url: String,

    /// Human-readable title, used for the output file name
    pub title: Option<String>,

    /// Container hint such as `mp4` or `m3u8`
    pub format_hint: Option<String>,
}

impl MediaReference {
    /// Create a reference with no metadata
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            format_hint: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_format_hint(mut self, hint: impl Into<String>) -> Self {
        self.format_hint = Some(hint.into());
        self
    }
}

/// Outcome of downloading one media reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadResult {
    Success {
        url: String,
        path: PathBuf,
        bytes: u64,
    },
    Failure {
        url: String,
        reason: String,
    },
}

impl DownloadResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadResult::Success { .. })
    }

    /// Source URL of the media this result belongs to
    pub fn url(&self) -> &str {
        match self {
            DownloadResult::Success { url, .. } | DownloadResult::Failure { url, .. } => url,
        }
    }

    /// Local path of the downloaded file, if the download succeeded
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            DownloadResult::Success { path, .. } => Some(path),
            DownloadResult::Failure { .. } => None,
        }
    }
}

/// Results of a run, in the order the references were submitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub results: Vec<DownloadResult>,
}

impl BatchSummary {
    pub fn new(results: Vec<DownloadResult>) -> Self {
        Self { results }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Failed results as (url, reason) pairs
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results.iter().filter_map(|r| match r {
            DownloadResult::Failure { url, reason } => Some((url.as_str(), reason.as_str())),
            DownloadResult::Success { .. } => None,
        })
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

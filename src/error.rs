use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the pipeline stages
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure or non-2xx status while fetching a page
    #[error("network error fetching {url}: {reason}")]
    Network {
        url: String,
        /// HTTP status when the server answered, `None` for transport failures
        status: Option<u16>,
        reason: String,
    },

    /// Certificate validation or TLS handshake failure
    #[error("TLS error fetching {url}: {reason}")]
    Tls { url: String, reason: String },

    /// Expected structural markers were not found in fetched content
    #[error("parse error in {source_url}: {reason}")]
    Parse { source_url: String, reason: String },

    /// The media download delegate failed
    #[error("download error for {url}: {reason}")]
    Download { url: String, reason: String },

    /// Invalid configuration value or configuration file
    #[error("configuration error: {0}")]
    Config(String),

    /// Local filesystem failure (output directory, config file)
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Name of the pipeline stage that produced this error
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Network { .. } | Error::Tls { .. } => "fetch",
            Error::Parse { .. } => "locate",
            Error::Download { .. } => "download",
            Error::Config(_) => "config",
            Error::Io { .. } => "io",
        }
    }

    pub(crate) fn parse(source_url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Parse {
            source_url: source_url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn download(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Download {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network { status: None, .. } => true,
            Error::Network {
                status: Some(code), ..
            } => *code >= 500,
            _ => false,
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Config(format!("invalid pattern: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let err = Error::Network {
            url: "https://example.test".to_string(),
            status: Some(404),
            reason: "404 Not Found".to_string(),
        };
        assert_eq!(err.stage(), "fetch");
        assert_eq!(Error::parse("u", "r").stage(), "locate");
        assert_eq!(Error::download("u", "r").stage(), "download");
        assert_eq!(Error::Config("x".to_string()).stage(), "config");
    }

    #[test]
    fn test_transient_classification() {
        let server_error = Error::Network {
            url: "u".to_string(),
            status: Some(503),
            reason: "unavailable".to_string(),
        };
        let not_found = Error::Network {
            url: "u".to_string(),
            status: Some(404),
            reason: "not found".to_string(),
        };
        let timeout = Error::Network {
            url: "u".to_string(),
            status: None,
            reason: "timed out".to_string(),
        };
        let tls = Error::Tls {
            url: "u".to_string(),
            reason: "invalid peer certificate".to_string(),
        };

        assert!(server_error.is_transient());
        assert!(!not_found.is_transient());
        assert!(timeout.is_transient());
        assert!(!tls.is_transient());
    }

    #[test]
    fn test_display_mentions_url() {
        let err = Error::download("https://cdn.test/ep1.mp4", "exit status 1");
        assert_eq!(
            err.to_string(),
            "download error for https://cdn.test/ep1.mp4: exit status 1"
        );
    }
}

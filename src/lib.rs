//! Download RaiPlay episodes, whole series seasons, and media linked from
//! arbitrary web pages.
//!
//! The work is split into three stages: a [`PageFetcher`] retrieves the page,
//! a [`MediaLocator`] finds media references in it, and a
//! [`DownloadOrchestrator`] hands each reference to a [`MediaDownloader`].
//! [`Pipeline`] wires the stages together from a [`DownloaderConfig`].

// Re-export modules
pub mod config;
pub mod downloaders;
pub mod error;
pub mod fetchers;
pub mod filter;
pub mod orchestrator;
pub mod parsers;
pub mod pipeline;
pub mod progress;
pub mod results;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::DownloaderConfig;
pub use downloaders::{DownloadTarget, DownloadedFile, DownloaderKind, MediaDownloader};
pub use error::{Error, Result};
pub use fetchers::{HttpFetcher, PageFetcher};
pub use filter::{MediaFilter, MediaFilterConfig};
pub use orchestrator::{BatchPolicy, DownloadOrchestrator};
pub use parsers::{MediaLocator, MediaReferences, ParserBackend};
pub use pipeline::Pipeline;
pub use progress::{NoProgress, ProgressSink, ProgressUpdate};
pub use results::{BatchSummary, DownloadResult, MediaReference, PageContent, PageRequest};

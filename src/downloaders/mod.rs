pub mod http;
pub mod ytdlp;

pub use http::HttpDownloader;
pub use ytdlp::YtDlpDownloader;

use crate::config::DownloaderConfig;
use crate::error::Result;
use crate::progress::ProgressSink;
use crate::results::MediaReference;
use crate::utils::{last_path_segment, sanitize_filename, split_extension, url_extension};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Progressive containers a plain HTTP GET can fetch in one piece
const PROGRESSIVE_EXTENSIONS: &[&str] = &["mp4", "m4v", "webm", "mkv", "mov", "mp3", "m4a"];

/// Every extension the locator recognises as media
const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "webm", "mkv", "mov", "mp3", "m4a", "m3u8", "mpd",
];

const DEFAULT_EXTENSION: &str = "mp4";
const FALLBACK_STEM: &str = "media";

/// Which delegate performs downloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownloaderKind {
    /// Direct HTTP for progressive files, yt-dlp for everything else
    #[default]
    Auto,
    YtDlp,
    Http,
}

/// Where a download should land
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub dir: PathBuf,
    /// File name without extension
    pub stem: String,
    /// Expected extension; yt-dlp may pick another one for the container it fetches
    pub extension: String,
}

impl DownloadTarget {
    /// Derive the output location of a reference inside `dir`
    ///
    /// The stem is the sanitised title, or the name of the URL's last path
    /// segment when there is no usable title.
    pub fn for_reference(reference: &MediaReference, dir: impl Into<PathBuf>) -> Self {
        let parsed = Url::parse(&reference.url).ok();
        let url_stem = parsed
            .as_ref()
            .and_then(last_path_segment)
            .map(|name| sanitize_filename(split_extension(name).0))
            .filter(|s| !s.is_empty());

        let stem = reference
            .title
            .as_deref()
            .map(sanitize_filename)
            .filter(|s| !s.is_empty())
            .or(url_stem)
            .unwrap_or_else(|| FALLBACK_STEM.to_string());

        Self {
            dir: dir.into(),
            stem,
            extension: media_extension(reference).unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, self.extension))
    }
}

/// A file written by a delegate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// External capability that retrieves and stores media
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Download the reference into the target, reporting progress to the sink
    async fn download(
        &self,
        reference: &MediaReference,
        target: &DownloadTarget,
        sink: &mut dyn ProgressSink,
    ) -> Result<DownloadedFile>;
}

/// Routes progressive files to HTTP and everything else to yt-dlp
pub struct AutoDownloader {
    http: HttpDownloader,
    ytdlp: YtDlpDownloader,
}

impl AutoDownloader {
    pub fn new(http: HttpDownloader, ytdlp: YtDlpDownloader) -> Self {
        Self { http, ytdlp }
    }
}

#[async_trait]
impl MediaDownloader for AutoDownloader {
    fn name(&self) -> &'static str {
        "auto"
    }

    async fn download(
        &self,
        reference: &MediaReference,
        target: &DownloadTarget,
        sink: &mut dyn ProgressSink,
    ) -> Result<DownloadedFile> {
        if is_progressive(reference) {
            self.http.download(reference, target, sink).await
        } else {
            self.ytdlp.download(reference, target, sink).await
        }
    }
}

/// Build the delegate selected by the configuration
pub fn from_config(
    config: &DownloaderConfig,
    client: reqwest::Client,
) -> Arc<dyn MediaDownloader> {
    match config.downloader {
        DownloaderKind::Http => Arc::new(HttpDownloader::new(client)),
        DownloaderKind::YtDlp => Arc::new(YtDlpDownloader::from_config(config)),
        DownloaderKind::Auto => Arc::new(AutoDownloader::new(
            HttpDownloader::new(client),
            YtDlpDownloader::from_config(config),
        )),
    }
}

/// Media extension from the format hint, else from the URL
fn media_extension(reference: &MediaReference) -> Option<String> {
    reference
        .format_hint
        .as_deref()
        .map(str::to_ascii_lowercase)
        .or_else(|| url_extension(&reference.url))
        .filter(|ext| MEDIA_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether the reference is a single progressive file
pub fn is_progressive(reference: &MediaReference) -> bool {
    media_extension(reference).is_some_and(|ext| PROGRESSIVE_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_url() {
        let reference = MediaReference::new("https://cdn.test/ep1.mp4");
        let target = DownloadTarget::for_reference(&reference, "./downloads");
        assert_eq!(target.stem, "ep1");
        assert_eq!(target.extension, "mp4");
        assert_eq!(target.path(), PathBuf::from("./downloads/ep1.mp4"));
    }

    #[test]
    fn test_target_prefers_title() {
        let reference = MediaReference::new("https://www.raiplay.it/video/2020/01/x-123.html")
            .with_title("Montalbano: Il cane di terracotta");
        let target = DownloadTarget::for_reference(&reference, "out");
        assert_eq!(target.stem, "Montalbano Il cane di terracotta");
        // Pages are not media; the default container is assumed
        assert_eq!(target.extension, "mp4");
    }

    #[test]
    fn test_target_fallbacks() {
        let reference = MediaReference::new("https://cdn.test/").with_title("???");
        let target = DownloadTarget::for_reference(&reference, "out");
        assert_eq!(target.stem, "media");

        let hls = MediaReference::new("https://cdn.test/live/master.m3u8?t=1");
        let target = DownloadTarget::for_reference(&hls, "out");
        assert_eq!(target.stem, "master");
        assert_eq!(target.extension, "m3u8");
    }

    #[test]
    fn test_format_hint_wins() {
        let reference =
            MediaReference::new("https://cdn.test/relinker?cont=1").with_format_hint("WEBM");
        let target = DownloadTarget::for_reference(&reference, "out");
        assert_eq!(target.stem, "relinker");
        assert_eq!(target.extension, "webm");
        assert!(is_progressive(&reference));
    }

    #[test]
    fn test_is_progressive() {
        assert!(is_progressive(&MediaReference::new("https://cdn.test/a.mp4")));
        assert!(is_progressive(&MediaReference::new("https://cdn.test/a.MP3?x=1")));
        assert!(!is_progressive(&MediaReference::new("https://cdn.test/a.m3u8")));
        assert!(!is_progressive(&MediaReference::new("https://cdn.test/a.mpd")));
        assert!(!is_progressive(&MediaReference::new(
            "https://www.raiplay.it/video/ep.html"
        )));
    }

    #[test]
    fn test_kind_serde_names() {
        let kind: DownloaderKind = serde_json::from_str("\"yt-dlp\"").unwrap();
        assert_eq!(kind, DownloaderKind::YtDlp);
        let kind: DownloaderKind = serde_json::from_str("\"http\"").unwrap();
        assert_eq!(kind, DownloaderKind::Http);
    }
}

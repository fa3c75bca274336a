use crate::config::DownloaderConfig;
use crate::downloaders::{self, MediaDownloader, YtDlpDownloader};
use crate::error::Result;
use crate::fetchers::{HttpFetcher, PageFetcher};
use crate::orchestrator::{BatchPolicy, DownloadOrchestrator};
use crate::parsers::raiplay;
use crate::parsers::{MediaLocator, MediaReferences};
use crate::progress::{BatchProgress, ConsoleProgress, NoProgress, ProgressSink};
use crate::results::{BatchSummary, DownloadResult, MediaReference, PageRequest};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fetch → locate → download, wired from one configuration
pub struct Pipeline {
    config: DownloaderConfig,
    fetcher: Arc<dyn PageFetcher>,
    locator: MediaLocator,
    orchestrator: DownloadOrchestrator,
    show_progress: bool,
}

impl Pipeline {
    /// Build a pipeline with the HTTP fetcher and the configured download delegate
    pub fn new(config: DownloaderConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(&config)?;
        let downloader = downloaders::from_config(&config, fetcher.client().clone());
        Self::with_components(config, Arc::new(fetcher), downloader)
    }

    /// Build a pipeline around caller-supplied collaborators
    pub fn with_components(
        config: DownloaderConfig,
        fetcher: Arc<dyn PageFetcher>,
        downloader: Arc<dyn MediaDownloader>,
    ) -> Result<Self> {
        let locator = MediaLocator::from_config(&config)?;
        let orchestrator = DownloadOrchestrator::new(downloader, config.output_dir.clone());
        Ok(Self {
            config,
            fetcher,
            locator,
            orchestrator,
            show_progress: false,
        })
    }

    /// Render console progress bars
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Override the output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.config.output_dir = dir.clone();
        self.orchestrator = DownloadOrchestrator::new(self.orchestrator.delegate(), dir);
        self
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        self.orchestrator.output_dir()
    }

    fn json_request(url: &str) -> PageRequest {
        PageRequest::new(url).with_header("Accept", "application/json")
    }

    fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            max_concurrency: self.config.max_concurrency,
            continue_on_error: self.config.continue_on_error,
        }
    }

    fn single_sink(&self, reference: &MediaReference) -> Box<dyn ProgressSink> {
        if self.show_progress {
            let title = reference.title.as_deref().unwrap_or(&reference.url);
            Box::new(ConsoleProgress::new(title))
        } else {
            Box::new(NoProgress)
        }
    }

    /// Fetch a page and locate its media references
    pub async fn resolve_page(&self, url: &str) -> Result<MediaReferences> {
        ::log::info!("Resolving media on {}", url);
        let page = self.fetcher.fetch(&PageRequest::new(url)).await?;
        self.locator.locate(&page)
    }

    /// Generic page mode
    ///
    /// Downloads the first reference in document order, or every reference
    /// when `all` is set. With a single reference a failed download is an
    /// error; with `all` failures are collected in the summary.
    pub async fn download_page(&self, url: &str, all: bool) -> Result<BatchSummary> {
        let references = self.resolve_page(url).await?;

        if !all {
            let reference = references.first().clone();
            if references.len() > 1 {
                ::log::info!(
                    "{} media references found, downloading the first: {}",
                    references.len(),
                    reference.url
                );
            }
            let result = self.download_one(&reference).await?;
            return Ok(BatchSummary::new(vec![result]));
        }

        Ok(self.download_batch(references.into_vec()).await)
    }

    /// RaiPlay single episode mode
    ///
    /// The title comes from the episode's JSON twin; the page URL itself is
    /// handed to the download delegate.
    pub async fn download_episode(&self, url: &str) -> Result<DownloadResult> {
        let json_url = raiplay::episode_json_url(url)?;
        ::log::info!("Reading episode metadata from {}", json_url);
        let json = self.fetcher.fetch_json(&Self::json_request(&json_url)).await?;
        let title = raiplay::episode_title(&json, &json_url)?;

        let reference = MediaReference::new(url).with_title(title);
        self.download_one(&reference).await
    }

    /// Episode references of a RaiPlay series season
    ///
    /// `season` is zero-based; episodes before `first_episode` are skipped.
    pub async fn resolve_series(
        &self,
        url: &str,
        season: usize,
        first_episode: usize,
    ) -> Result<Vec<MediaReference>> {
        let page = self.fetcher.fetch(&PageRequest::new(url)).await?;
        let endpoint = raiplay::locate_episodes_endpoint(
            &page,
            self.locator.backend(),
            &self.config.raiplay_host,
        )?;

        let json = self.fetcher.fetch_json(&Self::json_request(&endpoint)).await?;
        raiplay::season_cards(&json, season, first_episode, &endpoint)?
            .iter()
            .map(|card| card.to_reference(&self.config.raiplay_host))
            .collect()
    }

    /// RaiPlay series mode: download a season from `first_episode` on
    pub async fn download_series(
        &self,
        url: &str,
        season: usize,
        first_episode: usize,
    ) -> Result<BatchSummary> {
        let references = self.resolve_series(url, season, first_episode).await?;
        if references.is_empty() {
            ::log::warn!("No episodes to download from {}", url);
            return Ok(BatchSummary::default());
        }
        Ok(self.download_batch(references).await)
    }

    /// Ask yt-dlp which formats are available for a URL
    pub async fn list_formats(&self, url: &str) -> Result<String> {
        YtDlpDownloader::from_config(&self.config)
            .list_formats(url)
            .await
    }

    async fn download_one(&self, reference: &MediaReference) -> Result<DownloadResult> {
        let mut sink = self.single_sink(reference);
        let file = self.orchestrator.try_download(reference, sink.as_mut()).await?;
        Ok(DownloadResult::Success {
            url: reference.url.clone(),
            path: file.path,
            bytes: file.bytes,
        })
    }

    async fn download_batch(&self, references: Vec<MediaReference>) -> BatchSummary {
        if self.show_progress {
            let progress = BatchProgress::new(references.len());
            let sinks = progress.clone();
            let summary = self
                .orchestrator
                .download_all(references, self.batch_policy(), move |index, total, reference| {
                    let title = reference.title.as_deref().unwrap_or(&reference.url);
                    Box::new(sinks.item(index, total, title))
                })
                .await;
            progress.finish();
            summary
        } else {
            self.orchestrator
                .download_all(references, self.batch_policy(), |_, _, _| {
                    Box::new(NoProgress)
                })
                .await
        }
    }
}

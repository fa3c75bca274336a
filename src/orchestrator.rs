use crate::downloaders::{DownloadTarget, DownloadedFile, MediaDownloader};
use crate::error::Result;
use crate::progress::ProgressSink;
use crate::results::{BatchSummary, DownloadResult, MediaReference};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Semaphore;

const NOT_ATTEMPTED: &str = "not attempted: an earlier download failed";

/// How a batch reacts to individual failures and how wide it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Downloads running at once (1 runs the batch sequentially)
    pub max_concurrency: usize,
    /// Keep going after a failed item
    pub continue_on_error: bool,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            continue_on_error: true,
        }
    }
}

/// Drives the media download delegate for resolved references
#[derive(Clone)]
pub struct DownloadOrchestrator {
    downloader: Arc<dyn MediaDownloader>,
    output_dir: PathBuf,
}

impl DownloadOrchestrator {
    pub fn new(downloader: Arc<dyn MediaDownloader>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloader,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The delegate downloads are handed to
    pub fn delegate(&self) -> Arc<dyn MediaDownloader> {
        Arc::clone(&self.downloader)
    }

    /// Download one reference, failing with the delegate's error
    pub async fn try_download(
        &self,
        reference: &MediaReference,
        sink: &mut dyn ProgressSink,
    ) -> Result<DownloadedFile> {
        let target = DownloadTarget::for_reference(reference, &self.output_dir);
        ::log::info!(
            "Downloading {} to {} via {}",
            reference.url,
            target.path().display(),
            self.downloader.name()
        );

        let result = self.downloader.download(reference, &target, sink).await;
        match &result {
            Ok(file) => {
                ::log::info!("Saved {} ({} bytes)", file.path.display(), file.bytes);
                sink.on_finish(&file.path);
            }
            Err(e) => {
                ::log::error!("Download of {} failed: {}", reference.url, e);
                sink.on_failure(&e.to_string());
            }
        }
        result
    }

    /// Download one reference and report the outcome as a value
    pub async fn download(
        &self,
        reference: &MediaReference,
        sink: &mut dyn ProgressSink,
    ) -> DownloadResult {
        match self.try_download(reference, sink).await {
            Ok(file) => DownloadResult::Success {
                url: reference.url.clone(),
                path: file.path,
                bytes: file.bytes,
            },
            Err(e) => DownloadResult::Failure {
                url: reference.url.clone(),
                reason: e.to_string(),
            },
        }
    }

    /// Download every reference, isolating failures per item
    ///
    /// `make_sink` is called with the item index, the batch size and the
    /// reference. Results keep the input order.
    pub async fn download_all<F>(
        &self,
        references: Vec<MediaReference>,
        policy: BatchPolicy,
        make_sink: F,
    ) -> BatchSummary
    where
        F: Fn(usize, usize, &MediaReference) -> Box<dyn ProgressSink>,
    {
        let total = references.len();
        ::log::info!(
            "Starting batch download of {} items ({} at a time)",
            total,
            policy.max_concurrency.max(1)
        );

        let results = if policy.max_concurrency <= 1 {
            self.run_sequential(references, policy, make_sink).await
        } else {
            self.run_concurrent(references, policy, make_sink).await
        };

        let summary = BatchSummary::new(results);
        ::log::info!(
            "Batch finished: {} succeeded, {} failed",
            summary.succeeded(),
            summary.failed()
        );
        summary
    }

    async fn run_sequential<F>(
        &self,
        references: Vec<MediaReference>,
        policy: BatchPolicy,
        make_sink: F,
    ) -> Vec<DownloadResult>
    where
        F: Fn(usize, usize, &MediaReference) -> Box<dyn ProgressSink>,
    {
        let total = references.len();
        let mut results = Vec::with_capacity(total);
        let mut aborted = false;

        for (index, reference) in references.into_iter().enumerate() {
            let mut sink = make_sink(index, total, &reference);
            if aborted {
                results.push(not_attempted(reference, sink.as_mut()));
                continue;
            }
            let result = self.download(&reference, sink.as_mut()).await;
            if !result.is_success() && !policy.continue_on_error {
                ::log::warn!("Stopping batch after failure of {}", reference.url);
                aborted = true;
            }
            results.push(result);
        }
        results
    }

    async fn run_concurrent<F>(
        &self,
        references: Vec<MediaReference>,
        policy: BatchPolicy,
        make_sink: F,
    ) -> Vec<DownloadResult>
    where
        F: Fn(usize, usize, &MediaReference) -> Box<dyn ProgressSink>,
    {
        let total = references.len();
        let semaphore = Arc::new(Semaphore::new(policy.max_concurrency));
        let aborted = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(total);

        for (index, reference) in references.into_iter().enumerate() {
            let mut sink = make_sink(index, total, &reference);
            let orchestrator = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let aborted = Arc::clone(&aborted);
            let url = reference.url.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return not_attempted(reference, sink.as_mut()),
                };
                if aborted.load(Ordering::SeqCst) {
                    return not_attempted(reference, sink.as_mut());
                }
                let result = orchestrator.download(&reference, sink.as_mut()).await;
                if !result.is_success() && !policy.continue_on_error {
                    aborted.store(true, Ordering::SeqCst);
                }
                result
            });
            handles.push((url, handle));
        }

        let mut results = Vec::with_capacity(total);
        for (url, handle) in handles {
            let result = handle.await.unwrap_or_else(|e| DownloadResult::Failure {
                url,
                reason: format!("download task failed: {}", e),
            });
            results.push(result);
        }
        results
    }
}

/// Result for an item skipped after an earlier failure; its sink is closed too
fn not_attempted(reference: MediaReference, sink: &mut dyn ProgressSink) -> DownloadResult {
    sink.on_failure(NOT_ATTEMPTED);
    DownloadResult::Failure {
        url: reference.url,
        reason: NOT_ATTEMPTED.to_string(),
    }
}

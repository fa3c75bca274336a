use crate::utils::truncate_label;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;

const BYTES_TEMPLATE: &str =
    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{msg} {spinner} {bytes} ({bytes_per_sec})";
const OVERALL_TEMPLATE: &str = "{msg} [{bar:40.green/white}] {pos}/{len} episodes";
const LABEL_CHARS: usize = 30;

/// Bytes transferred so far for one download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub downloaded: u64,
    /// Total size when the delegate knows or estimates it
    pub total: Option<u64>,
}

impl ProgressUpdate {
    pub fn new(downloaded: u64, total: Option<u64>) -> Self {
        Self { downloaded, total }
    }

    /// Completed fraction in `0.0..=1.0`, if the total is known
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) | None => None,
            Some(total) => Some((self.downloaded as f64 / total as f64).min(1.0)),
        }
    }
}

/// Receives progress for a single download, synchronously and in order
pub trait ProgressSink: Send {
    fn on_progress(&mut self, update: ProgressUpdate);

    /// Called once after the delegate reports success
    fn on_finish(&mut self, _path: &Path) {}

    /// Called once after the delegate fails
    fn on_failure(&mut self, _reason: &str) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressUpdate) + Send,
{
    fn on_progress(&mut self, update: ProgressUpdate) {
        self(update)
    }
}

/// Sink that only logs at trace level
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, update: ProgressUpdate) {
        ::log::trace!("progress {}/{:?}", update.downloaded, update.total);
    }
}

/// Console progress bar for one download
///
/// The bar is created on the first update so downloads that fail before
/// transferring anything leave no empty bar behind.
pub struct ConsoleProgress {
    label: String,
    bar: Option<ProgressBar>,
    multi: Option<MultiProgress>,
    overall: Option<ProgressBar>,
}

impl ConsoleProgress {
    pub fn new(title: &str) -> Self {
        Self {
            label: format!("Downloading: {}", truncate_label(title, LABEL_CHARS)),
            bar: None,
            multi: None,
            overall: None,
        }
    }

    fn create_bar(&self, total: Option<u64>) -> ProgressBar {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(BYTES_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        bar.set_message(self.label.clone());

        match &self.multi {
            Some(multi) => multi.add(bar),
            None => bar,
        }
    }

    fn advance_overall(&self) {
        if let Some(overall) = &self.overall {
            overall.inc(1);
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&mut self, update: ProgressUpdate) {
        if self.bar.is_none() {
            self.bar = Some(self.create_bar(update.total));
        }
        if let Some(bar) = &self.bar {
            if let Some(total) = update.total {
                if bar.length() != Some(total) {
                    bar.set_length(total);
                }
            }
            bar.set_position(update.downloaded);
        }
    }

    fn on_finish(&mut self, path: &Path) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        let line = format!("✓ Download completed: {}", path.display());
        match &self.multi {
            Some(multi) => {
                let _ = multi.println(line);
            }
            None => println!("{}", line),
        }
        self.advance_overall();
    }

    fn on_failure(&mut self, reason: &str) {
        if let Some(bar) = self.bar.take() {
            bar.abandon_with_message(format!("✗ {}", self.label));
        }
        ::log::debug!("{} failed: {}", self.label, reason);
        self.advance_overall();
    }
}

/// Progress display for a batch: one overall bar plus a bar per item
#[derive(Clone)]
pub struct BatchProgress {
    multi: MultiProgress,
    overall: ProgressBar,
}

impl BatchProgress {
    pub fn new(total_items: usize) -> Self {
        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_items as u64));
        overall.set_style(
            ProgressStyle::with_template(OVERALL_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        overall.set_message("Overall Progress");
        Self { multi, overall }
    }

    /// Sink for item `index` (zero-based) of `total`
    pub fn item(&self, index: usize, total: usize, title: &str) -> ConsoleProgress {
        ConsoleProgress {
            label: format!(
                "[{}/{}] {}",
                index + 1,
                total,
                truncate_label(title, LABEL_CHARS - 5)
            ),
            bar: None,
            multi: Some(self.multi.clone()),
            overall: Some(self.overall.clone()),
        }
    }

    pub fn finish(&self) {
        self.overall.finish();
    }
}

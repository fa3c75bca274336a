use crate::config::DownloaderConfig;
use crate::downloaders::{DownloadTarget, DownloadedFile, MediaDownloader};
use crate::error::{Error, Result};
use crate::progress::{ProgressSink, ProgressUpdate};
use crate::results::MediaReference;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

const PROGRESS_PREFIX: &str = "[raiplay-dl:progress]";
const FILE_PREFIX: &str = "[raiplay-dl:file]";
const STDERR_TAIL: usize = 20;

/// Delegates downloads to the yt-dlp executable
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    binary: String,
    format: String,
}

impl YtDlpDownloader {
    pub fn new(binary: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            format: format.into(),
        }
    }

    pub fn from_config(config: &DownloaderConfig) -> Self {
        Self::new(config.ytdlp_path.clone(), config.format.clone())
    }

    /// Command line for downloading `url` into `target`
    pub fn download_args(&self, url: &str, target: &DownloadTarget) -> Vec<String> {
        let template = target.dir.join(format!("{}.%(ext)s", target.stem));
        vec![
            "--newline".to_string(),
            "--no-simulate".to_string(),
            "--progress".to_string(),
            "--no-write-subs".to_string(),
            "--no-write-auto-subs".to_string(),
            "--format".to_string(),
            self.format.clone(),
            "--output".to_string(),
            template.to_string_lossy().into_owned(),
            "--progress-template".to_string(),
            format!(
                "download:{} %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s",
                PROGRESS_PREFIX
            ),
            "--print".to_string(),
            format!("after_move:{} %(filepath)s", FILE_PREFIX),
            "--".to_string(),
            url.to_string(),
        ]
    }

    /// Ask yt-dlp for the formats available at `url`
    pub async fn list_formats(&self, url: &str) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("--list-formats")
            .arg("--")
            .arg(url)
            .output()
            .await
            .map_err(|e| self.spawn_error(url, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::download(url, failure_reason(stderr.lines(), output.status)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn spawn_error(&self, url: &str, err: std::io::Error) -> Error {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::download(url, format!("yt-dlp executable not found: {}", self.binary))
        } else {
            Error::download(url, format!("cannot run {}: {}", self.binary, err))
        }
    }
}

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn download(
        &self,
        reference: &MediaReference,
        target: &DownloadTarget,
        sink: &mut dyn ProgressSink,
    ) -> Result<DownloadedFile> {
        let url = &reference.url;
        tokio::fs::create_dir_all(&target.dir)
            .await
            .map_err(|e| Error::io(&target.dir, e))?;

        let args = self.download_args(url, target);
        ::log::debug!("Running {} {}", self.binary, args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(url, e))?;

        // Drain stderr concurrently so a chatty child never blocks on a full pipe
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut tail = Vec::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    ::log::debug!("yt-dlp: {}", line);
                    tail.push(line);
                    if tail.len() > STDERR_TAIL {
                        tail.remove(0);
                    }
                }
            }
            tail
        });

        let mut output_path: Option<PathBuf> = None;
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines
                .next_line()
                .await
                .map_err(|e| Error::download(url, format!("reading yt-dlp output: {}", e)))?
            {
                if let Some(update) = parse_progress_line(&line) {
                    sink.on_progress(update);
                } else if let Some(path) = line.strip_prefix(FILE_PREFIX) {
                    output_path = Some(PathBuf::from(path.trim()));
                } else if !line.trim().is_empty() {
                    ::log::debug!("yt-dlp: {}", line);
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| Error::download(url, format!("waiting for yt-dlp: {}", e)))?;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(Error::download(
                url,
                failure_reason(stderr_tail.iter().map(String::as_str), status),
            ));
        }

        let path = output_path
            .ok_or_else(|| Error::download(url, "yt-dlp did not report an output file"))?;
        let bytes = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Error::io(&path, e))?
            .len();

        Ok(DownloadedFile { path, bytes })
    }
}

/// Parse a line produced by the progress template
///
/// yt-dlp prints `NA` for unknown fields and may print byte counts as floats.
pub fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.split_whitespace().map(parse_bytes);

    let downloaded = fields.next()??;
    let total_bytes = fields.next().flatten();
    let estimate = fields.next().flatten();

    Some(ProgressUpdate::new(downloaded, total_bytes.or(estimate)))
}

fn parse_bytes(field: &str) -> Option<u64> {
    if field == "NA" {
        return None;
    }
    field
        .parse::<u64>()
        .ok()
        .or_else(|| field.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
}

/// Most useful line of yt-dlp's stderr for a failed run
fn failure_reason<'a>(
    stderr: impl Iterator<Item = &'a str>,
    status: std::process::ExitStatus,
) -> String {
    let lines: Vec<&str> = stderr.filter(|l| !l.trim().is_empty()).collect();
    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR"))
        .or_else(|| lines.last())
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| format!("yt-dlp exited with {}", status))
}

use crate::downloaders::{DownloadTarget, DownloadedFile, MediaDownloader};
use crate::error::{Error, Result};
use crate::progress::{ProgressSink, ProgressUpdate};
use crate::results::MediaReference;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Streams a progressive media file straight to disk
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn stream_to_file(
        &self,
        reference: &MediaReference,
        target: &DownloadTarget,
        sink: &mut dyn ProgressSink,
    ) -> Result<DownloadedFile> {
        let url = &reference.url;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::download(url, e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::download(url, format!("server returned {}", status)));
        }

        let total = response.content_length();
        let path = target.path();
        let file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| Error::io(&path, e))?;

        match write_body(response, file, &path, url, total, sink).await {
            Ok(bytes) => Ok(DownloadedFile { path, bytes }),
            Err(e) => {
                // Leave no truncated file behind
                let _ = tokio::fs::remove_file(&path).await;
                Err(e)
            }
        }
    }
}

/// Copies the response body into `file`, returning the bytes written
async fn write_body(
    mut response: Response,
    mut file: tokio::fs::File,
    path: &Path,
    url: &str,
    total: Option<u64>,
    sink: &mut dyn ProgressSink,
) -> Result<u64> {
    let mut downloaded = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| Error::download(url, e.without_url().to_string()))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::io(path, e))?;
        downloaded += chunk.len() as u64;
        sink.on_progress(ProgressUpdate::new(downloaded, total));
    }
    file.flush().await.map_err(|e| Error::io(path, e))?;

    if let Some(expected) = total {
        if downloaded < expected {
            return Err(Error::download(
                url,
                format!("connection closed after {} of {} bytes", downloaded, expected),
            ));
        }
    }
    Ok(downloaded)
}

#[async_trait]
impl MediaDownloader for HttpDownloader {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn download(
        &self,
        reference: &MediaReference,
        target: &DownloadTarget,
        sink: &mut dyn ProgressSink,
    ) -> Result<DownloadedFile> {
        tokio::fs::create_dir_all(&target.dir)
            .await
            .map_err(|e| Error::io(&target.dir, e))?;

        ::log::debug!("HTTP download {} -> {}", reference.url, target.path().display());
        self.stream_to_file(reference, target, sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_download_writes_file_and_reports_progress() {
        let server = MockServer::start().await;
        let body = vec![7u8; 64 * 1024];
        Mock::given(method("GET"))
            .and(path("/ep1.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let reference = MediaReference::new(format!("{}/ep1.mp4", server.uri()));
        let target = DownloadTarget::for_reference(&reference, dir.path().join("nested"));

        let mut updates = Vec::new();
        let mut sink = |u: ProgressUpdate| updates.push(u);
        let file = HttpDownloader::new(Client::new())
            .download(&reference, &target, &mut sink)
            .await
            .unwrap();

        assert_eq!(file.path, dir.path().join("nested").join("ep1.mp4"));
        assert_eq!(file.bytes, body.len() as u64);
        assert_eq!(std::fs::read(&file.path).unwrap(), body);

        assert!(!updates.is_empty());
        let last = updates.last().unwrap();
        assert_eq!(last.downloaded, body.len() as u64);
        assert_eq!(last.total, Some(body.len() as u64));
        assert!(updates.windows(2).all(|w| w[0].downloaded <= w[1].downloaded));
    }

    #[tokio::test]
    async fn test_download_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let reference = MediaReference::new(format!("{}/ep1.mp4", server.uri()));
        let target = DownloadTarget::for_reference(&reference, dir.path());

        let mut sink = |_: ProgressUpdate| {};
        let err = HttpDownloader::new(Client::new())
            .download(&reference, &target, &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Download { .. }));
        assert!(err.to_string().contains("403"));
        assert!(!target.path().exists());
    }

    #[tokio::test]
    async fn test_failed_request_keeps_existing_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let reference = MediaReference::new(format!("{}/ep1.mp4", server.uri()));
        let target = DownloadTarget::for_reference(&reference, dir.path());
        std::fs::write(target.path(), b"previously downloaded episode").unwrap();

        let mut sink = |_: ProgressUpdate| {};
        let result = HttpDownloader::new(Client::new())
            .download(&reference, &target, &mut sink)
            .await;

        assert!(result.is_err());
        assert_eq!(
            std::fs::read(target.path()).unwrap(),
            b"previously downloaded episode"
        );
    }
}

use crate::config::DownloaderConfig;
use crate::error::{Error, Result};
use crate::fetchers::PageFetcher;
use crate::results::{PageContent, PageRequest};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Certificate, Client};
use std::time::Duration;

/// Page fetcher backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retries: u32,
    backoff: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the client settings and retry policy from the configuration
    pub fn new(config: &DownloaderConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            retries: config.retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// The underlying HTTP client, shared with the direct media downloader
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn fetch_once(&self, request: &PageRequest) -> Result<PageContent> {
        ::log::debug!("GET {}", request.url);

        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(&request.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network {
                url: request.url.clone(),
                status: Some(status.as_u16()),
                reason: format!("server returned {}", status),
            });
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(&request.url, e))?;

        ::log::debug!("Fetched {} bytes from {}", body.len(), final_url);
        Ok(PageContent::new(final_url, body))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<PageContent> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(request).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt < self.retries && e.is_transient() => {
                    let delay = self.backoff.saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    ::log::warn!(
                        "Fetch of {} failed ({}), retry {}/{} in {:?}",
                        request.url,
                        e,
                        attempt,
                        self.retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Build the HTTP client shared by every network stage
pub fn build_client(config: &DownloaderConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Config(format!("invalid header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Config(format!("invalid value for header {}: {}", name, e)))?;
        headers.insert(name, value);
    }

    let mut builder = Client::builder()
        .use_rustls_tls()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs));

    for path in &config.ca_certificates {
        let pem = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let cert = Certificate::from_pem(&pem).map_err(|e| {
            Error::Config(format!("invalid CA certificate {}: {}", path.display(), e))
        })?;
        builder = builder.add_root_certificate(cert);
    }

    if config.accept_invalid_certs {
        ::log::warn!("TLS certificate validation is disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))
}

/// Map a reqwest failure onto the network/TLS split
pub(crate) fn classify_error(url: &str, err: reqwest::Error) -> Error {
    // The URL is reported separately and must not influence classification
    let err = err.without_url();
    let reason = error_chain(&err);

    if err.is_builder() {
        return Error::Config(format!("invalid request for {}: {}", url, reason));
    }

    if is_tls_failure(&reason) {
        Error::Tls {
            url: url.to_string(),
            reason,
        }
    } else {
        Error::Network {
            url: url.to_string(),
            status: err.status().map(|s| s.as_u16()),
            reason,
        }
    }
}

/// Whole source chain of an error, joined with `: `
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = inner.source();
    }
    parts.join(": ")
}

fn is_tls_failure(reason: &str) -> bool {
    let reason = reason.to_ascii_lowercase();
    ["certificate", "tls", "ssl", "handshake", "unknownissuer"]
        .iter()
        .any(|needle| reason.contains(needle))
}

pub mod http;

pub use http::HttpFetcher;

use crate::error::{Error, Result};
use crate::results::{PageContent, PageRequest};
use async_trait::async_trait;
use serde_json::Value;

/// Retrieves pages over the network
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page, failing on transport errors and non-2xx statuses
    async fn fetch(&self, request: &PageRequest) -> Result<PageContent>;

    /// Fetch a page and decode its body as JSON
    async fn fetch_json(&self, request: &PageRequest) -> Result<Value> {
        let page = self.fetch(request).await?;
        serde_json::from_str(&page.body)
            .map_err(|e| Error::parse(&page.url, format!("invalid JSON: {}", e)))
    }
}

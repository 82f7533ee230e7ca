pub mod model;
pub mod reader;

#[cfg(test)]
mod tests;

pub use model::ExtractedPage;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tracing::instrument;

use crate::fetcher::{FetchError, PageFetcher, PageResponse};

/// Anything that can turn a URL into an [`ExtractedPage`].
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedPage, FetchError>;
}

/// Fetches a page and reduces it to title and visible text.
#[derive(Debug, Clone)]
pub struct WebTextExtractor {
    fetcher: PageFetcher,
}

impl WebTextExtractor {
    pub fn new(headers: HeaderMap) -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: PageFetcher::new(headers)?,
        })
    }
}

#[async_trait]
impl PageSource for WebTextExtractor {
    #[instrument(skip_all, fields(url = %url))]
    async fn extract(&self, url: &str) -> Result<ExtractedPage, FetchError> {
        let response = self.fetcher.fetch(url).await?;
        Ok(extract_page(&response, url))
    }
}

/// Title and text are derived from the decoded body; `requested_url` is what
/// the record points at, even if the fetch was redirected.
pub fn extract_page(resp: &PageResponse, requested_url: &str) -> ExtractedPage {
    reader::extract(&resp.body_utf8, requested_url)
}

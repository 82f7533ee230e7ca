use crate::fetcher::{
    errors::{FetchError, FetchFailure},
    pipeline::process_response,
    types::PageResponse,
};
use reqwest::{
    Client, ClientBuilder,
    header::{ACCEPT, HeaderMap, HeaderValue},
};
use std::time::Duration;
use tracing::{debug, instrument};

const MAX_BODY_SIZE: u64 = 5 * 1024 * 1024; // 5MB

pub const DEFAULT_USER_AGENT: &str = "HannaWebScraper/1.0 (+https://botinfo.hivenet.dev/)";
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for scraping pages. Built once per batch and reused.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// `headers` are sent with every request, on top of the identifying
    /// `User-Agent` and an HTML `Accept` header. A caller supplied
    /// `User-Agent` wins over the default one.
    pub fn new(headers: HeaderMap) -> Result<Self, FetchError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        default_headers.extend(headers);

        let client = ClientBuilder::new()
            .connect_timeout(FETCH_TIMEOUT)
            .timeout(FETCH_TIMEOUT)
            .user_agent(DEFAULT_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .default_headers(default_headers)
            .build()
            .map_err(|e| FetchError::new("", FetchFailure::Client(e.to_string())))?;

        Ok(Self { client })
    }

    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<PageResponse, FetchError> {
        let fail = |cause: FetchFailure| FetchError::new(url, cause);

        let parsed_url = url::Url::parse(url).map_err(|e| fail(e.into()))?;

        let response = self
            .client
            .get(parsed_url)
            .send()
            .await
            .map_err(|e| fail(FetchFailure::from_reqwest_error(e)))?;

        // Check content length before downloading
        if let Some(content_length) = response.content_length()
            && content_length > MAX_BODY_SIZE
        {
            return Err(fail(FetchFailure::BodyTooLarge(content_length)));
        }

        let final_url = response.url().clone();
        let status = response.status();

        if !status.is_success() {
            return Err(fail(FetchFailure::Http { status }));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        let body_bytes = response
            .bytes()
            .await
            .map_err(|e| fail(FetchFailure::from_reqwest_error(e)))?;

        // Content-Length may be missing or wrong
        if body_bytes.len() as u64 > MAX_BODY_SIZE {
            return Err(fail(FetchFailure::BodyTooLarge(body_bytes.len() as u64)));
        }

        debug!(
            status = %status,
            final_url = %final_url,
            bytes = body_bytes.len(),
            "Fetched page"
        );

        Ok(process_response(final_url, status, body_bytes, &content_type))
    }
}

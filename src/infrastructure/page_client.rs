use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::PageError;
use crate::market::{self, Page, PageSource};

/// pump.fun token pages.
pub const DEFAULT_PAGE_BASE_URL: &str = "https://pump.fun/coin";

/// Fetches token pages over HTTP from `{base_url}/{mint}`.
///
/// Pages that render their numbers client-side will not carry a market cap
/// in the served HTML; those read as zero until a client posts rendered HTML.
pub struct HttpPageSource {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpPageSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn page_url(&self, mint: &str) -> String {
        market::page_url(&self.base_url, mint)
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, mint: &str) -> Result<Page, PageError> {
        let url = self.page_url(mint);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|source| PageError::Fetch {
                mint: mint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageError::Status {
                mint: mint.to_string(),
                status,
            });
        }

        let html = response.text().await.map_err(|source| PageError::Fetch {
            mint: mint.to_string(),
            source,
        })?;

        debug!("Fetched {} ({} bytes)", url, html.len());
        Ok(Page::new(mint, html))
    }
}

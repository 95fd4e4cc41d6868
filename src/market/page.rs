use async_trait::async_trait;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::extractor::MarketCapExtractor;
use crate::error::PageError;

pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// Raw HTML of a token page, tagged with the token's mint address.
#[derive(Debug, Clone)]
pub struct Page {
    pub mint: String,
    pub html: String,
}

/// What a page says about its token at the moment it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct PageReading {
    pub mint: String,
    pub symbol: String,
    pub market_cap: Decimal,
}

impl Page {
    pub fn new(mint: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            mint: mint.into(),
            html: html.into(),
        }
    }

    /// Parse once and pull symbol and market cap out of the document.
    ///
    /// The parsed document is not `Send`, so it never outlives this call.
    pub fn read(&self, extractor: &dyn MarketCapExtractor) -> PageReading {
        let document = Html::parse_document(&self.html);
        PageReading {
            mint: self.mint.clone(),
            symbol: symbol_from_title(&document_title(&document)),
            market_cap: extractor.extract_market_cap(&document),
        }
    }
}

fn document_title(document: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .map(|title| title.text().collect::<String>())
        })
        .unwrap_or_default()
}

/// Page address for `mint` under `base_url`.
pub fn page_url(base_url: &str, mint: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), mint)
}

/// Token mint from a page URL: the last path segment.
pub fn mint_from_url(url: &str) -> Option<String> {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    path.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Ticker from a title like `Pepe (PEPE) - pump`: the first non-empty
/// parenthesised group, or `UNKNOWN`.
pub fn symbol_from_title(title: &str) -> String {
    let mut rest = title;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        match after.find(')') {
            Some(0) => rest = after,
            Some(close) => return after[..close].to_string(),
            None => break,
        }
    }
    UNKNOWN_SYMBOL.to_string()
}

/// Where the trade desk and live tracker get token pages from.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, mint: &str) -> Result<Page, PageError>;
}

/// In-memory pages, keyed by mint.
#[derive(Debug, Default)]
pub struct StaticPageSource {
    pages: RwLock<HashMap<String, String>>,
}

impl StaticPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, mint: impl Into<String>, html: impl Into<String>) {
        self.pages.write().await.insert(mint.into(), html.into());
    }
}

#[async_trait]
impl PageSource for StaticPageSource {
    async fn fetch(&self, mint: &str) -> Result<Page, PageError> {
        self.pages
            .read()
            .await
            .get(mint)
            .map(|html| Page::new(mint, html.clone()))
            .ok_or_else(|| PageError::Missing {
                mint: mint.to_string(),
            })
    }
}

//! Page sources for the tree builder.
//!
//! A [`PageSource`] turns a listing path (`""` for the root listing, `"6"`,
//! `"63"`, `"636.7"`, ...) into the class rows found on that page. The
//! builder only depends on the trait; [`HttpPageSource`] is the production
//! implementation that downloads pages from the reference site.
//!
//! # Retry Strategy
//!
//! Same policy as the oracle providers:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

use crate::config::CrawlerConfig;
use crate::listing::parse_listing;
use crate::models::ListingEntry;

/// Fetch-and-parse capability consumed by the tree builder.
///
/// Implementations own their timeouts and retries; an `Err` means the
/// page is given up on and the builder skips that subtree.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Return the class rows listed under `path`, in page order.
    async fn fetch_entries(&self, path: &str) -> Result<Vec<ListingEntry>>;
}

/// Downloads listing pages over HTTP and parses them with
/// [`parse_listing`].
pub struct HttpPageSource {
    client: reqwest::Client,
    base_url: Url,
    max_retries: u32,
}

impl HttpPageSource {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid crawler.base_url: {}", config.base_url))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            max_retries: config.max_retries,
        })
    }

    /// URL of the listing page for `path`.
    pub fn page_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid listing path: {}", path))
    }

    async fn fetch_html(&self, url: &Url) -> Result<String> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .text()
                            .await
                            .with_context(|| format!("Failed to read body of {}", url));
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow::anyhow!("GET {} returned {}", url, status));
                        continue;
                    }

                    bail!("GET {} returned {}", url, status);
                }
                Err(e) => {
                    last_err = Some(anyhow::anyhow!("GET {} failed: {}", url, e));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("GET {} failed after retries", url)))
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_entries(&self, path: &str) -> Result<Vec<ListingEntry>> {
        let url = self.page_url(path)?;
        let html = self.fetch_html(&url).await?;
        let entries = parse_listing(&html);
        debug!(%url, entries = entries.len(), "parsed listing page");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> HttpPageSource {
        HttpPageSource::new(&CrawlerConfig::default()).unwrap()
    }

    #[test]
    fn test_root_url() {
        assert_eq!(
            source().page_url("").unwrap().as_str(),
            "https://www.librarything.com/mds/"
        );
    }

    #[test]
    fn test_child_urls() {
        let source = source();
        assert_eq!(
            source.page_url("6").unwrap().as_str(),
            "https://www.librarything.com/mds/6"
        );
        assert_eq!(
            source.page_url("636.7").unwrap().as_str(),
            "https://www.librarything.com/mds/636.7"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = CrawlerConfig {
            base_url: "not a url".to_string(),
            ..CrawlerConfig::default()
        };
        assert!(HttpPageSource::new(&config).is_err());
    }
}

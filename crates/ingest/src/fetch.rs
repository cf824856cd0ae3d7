//! Page fetching from the source API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use tender_core::config::SourceConfig;

use crate::error::FetchError;

/// The portal rejects requests without a browser-like agent.
const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                             (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Query keys owned by the fetcher; any copies in the base URL are replaced.
const PAGING_KEYS: &[&str] = &["draw", "start", "length", "status", "dateFrom", "dateTo"];

/// Fetch one page of the source listing as raw JSON.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch zero-based page `page`, starting at item `offset`.
    ///
    /// The offset is the number of items already received, which trails
    /// `page * page_size` whenever the source serves short pages.
    async fn fetch_page(&self, page: u32, offset: u64) -> Result<Value, FetchError>;

    /// Items requested per page.
    fn page_size(&self) -> u32;
}

/// [`PageFetcher`] over HTTP GET with offset/length paging.
pub struct HttpPageFetcher {
    client: Client,
    base_url: Url,
    page_size: u32,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(source: &SourceConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(source.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(&source.base_url)?,
            page_size: source.page_size.max(1),
            date_from: source.date_from,
            date_to: source.date_to,
            timeout: source.request_timeout(),
        })
    }

    /// Request URL for zero-based `page` starting at item `offset`.
    pub fn page_url(&self, page: u32, offset: u64) -> Url {
        let mut url = self.base_url.clone();
        let kept: Vec<(String, String)> = self
            .base_url
            .query_pairs()
            .filter(|(k, _)| !PAGING_KEYS.contains(&k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.set_query(None);
        {
            let mut q = url.query_pairs_mut();
            for (k, v) in &kept {
                q.append_pair(k, v);
            }
            q.append_pair("draw", &(page + 1).to_string())
                .append_pair("start", &offset.to_string())
                .append_pair("length", &self.page_size.to_string())
                .append_pair("status", "1");
            if let Some(from) = self.date_from {
                q.append_pair("dateFrom", &from.format("%Y-%m-%d").to_string());
            }
            if let Some(to) = self.date_to {
                q.append_pair("dateTo", &to.format("%Y-%m-%d").to_string());
            }
        }
        url
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, page: u32, offset: u64) -> Result<Value, FetchError> {
        let url = self.page_url(page, offset);
        debug!(page, offset, url = %url, "Fetching source page");

        let response = self.client.get(url).send().await.map_err(|e| self.map_err(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate(&body, 512),
            });
        }

        let body = response.text().await.map_err(|e| self.map_err(e))?;
        serde_json::from_str(&body).map_err(|e| {
            FetchError::Decode(format!("{e}; body starts {:?}", truncate(&body, 200)))
        })
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }
}

impl HttpPageFetcher {
    fn map_err(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout.as_millis() as u64)
        } else {
            FetchError::Http(e)
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base_url: &str) -> SourceConfig {
        SourceConfig {
            base_url: base_url.to_string(),
            page_size: 100,
            max_pages: 5,
            request_timeout_secs: 30,
            date_from: NaiveDate::from_ymd_opt(2025, 10, 1),
            date_to: None,
        }
    }

    #[test]
    fn page_url_sets_offset_and_window() {
        let fetcher = HttpPageFetcher::new(&source("https://example.test/Home/Paginated")).unwrap();
        let url = fetcher.page_url(2, 200);

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("start".into(), "200".into())));
        assert!(pairs.contains(&("length".into(), "100".into())));
        assert!(pairs.contains(&("draw".into(), "3".into())));
        assert!(pairs.contains(&("status".into(), "1".into())));
        assert!(pairs.contains(&("dateFrom".into(), "2025-10-01".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "dateTo"));
    }

    #[test]
    fn page_url_replaces_paging_keys_in_base() {
        let fetcher = HttpPageFetcher::new(&source(
            "https://example.test/Home/Paginated?draw=1&length=10&status=1&lang=en",
        ))
        .unwrap();
        let url = fetcher.page_url(0, 0);

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs.iter().filter(|(k, _)| k == "length").count(), 1);
        assert!(pairs.contains(&("length".into(), "100".into())));
        assert!(pairs.contains(&("lang".into(), "en".into())));
    }

    #[test]
    fn page_url_takes_offset_not_page_times_size() {
        let fetcher = HttpPageFetcher::new(&source("https://example.test/Home/Paginated")).unwrap();
        let url = fetcher.page_url(1, 40);

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("start".into(), "40".into())));
        assert!(pairs.contains(&("draw".into(), "2".into())));
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("héllo", 2), "hé");
    }
}

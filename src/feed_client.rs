use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Url};

pub const DEFAULT_FEED_URL: &str = "https://nationalbank.kz/rss/get_rates.cfm";

const FEED_DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum FetchError {
    #[error("can't reach {url}: {message}")]
    Network { url: String, message: String },
    #[error("can't download the feed from {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },
}

/// Source of raw feed documents. One call is one outbound request, never retried.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpFeedClient {
    client: Client,
    base_url: Url,
}

impl HttpFeedClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("can't build HTTP client")?;

        Self::with_client(base_url, client)
    }

    pub fn with_client(base_url: &str, client: Client) -> anyhow::Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid feed url {base_url}"))?;

        Ok(Self { client, base_url })
    }

    pub fn url_for(&self, date: NaiveDate) -> Url {
        get_url(&self.base_url, date)
    }
}

fn get_url(base_url: &Url, date: NaiveDate) -> Url {
    let mut url = base_url.clone();
    url.query_pairs_mut()
        .append_pair("fdate", &date.format(FEED_DATE_FORMAT).to_string());
    url
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(date);
        log::debug!("fetching rates feed {url}");

        let network = |e: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };

        let resp = self.client.get(url.clone()).send().await.map_err(network)?;
        if !resp.status().is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(network)?;

        Ok(body.to_vec())
    }
}

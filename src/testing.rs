//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Notify, Semaphore};

use crate::exchange_rate::{PersistedRate, RateRecord};
use crate::feed_client::{FeedClient, FetchError};
use crate::store::{RateStore, StoreError};

pub const FEED_2022_04_28: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rates>
    <date>28.04.2022</date>
    <item>
        <fullname>Australian dollar</fullname>
        <title>AUD</title>
        <description>1.3241</description>
    </item>
    <item>
        <fullname>Canadian dollar</fullname>
        <title>CAD</title>
        <description>1.2688</description>
    </item>
</rates>"#;

pub fn date(s: &str) -> NaiveDate {
    crate::exchange_rate::parse_date(s).unwrap()
}

/// Feed answering every request with the same canned response.
pub struct StubFeed {
    response: Result<Vec<u8>, FetchError>,
    calls: AtomicUsize,
}

impl StubFeed {
    pub fn ok(body: &str) -> Self {
        Self {
            response: Ok(body.as_bytes().to_vec()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: FetchError) -> Self {
        Self {
            response: Err(err),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedClient for StubFeed {
    async fn fetch(&self, _date: NaiveDate) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

/// Feed that parks each request until the test lets it through.
pub struct GatedFeed {
    body: Vec<u8>,
    entered: Notify,
    gate: Semaphore,
}

impl GatedFeed {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.as_bytes().to_vec(),
            entered: Notify::new(),
            gate: Semaphore::new(0),
        }
    }

    /// Resolves once a request is parked at the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self, requests: usize) {
        self.gate.add_permits(requests);
    }
}

#[async_trait]
impl FeedClient for GatedFeed {
    async fn fetch(&self, _date: NaiveDate) -> Result<Vec<u8>, FetchError> {
        self.entered.notify_one();
        let permit = self.gate.acquire().await.map_err(|e| FetchError::Network {
            url: "gated".to_string(),
            message: e.to_string(),
        })?;
        permit.forget();
        Ok(self.body.clone())
    }
}

/// Store whose every call fails with the given error.
pub struct FailingStore(pub StoreError);

#[async_trait]
impl RateStore for FailingStore {
    async fn replace_for_date(
        &self,
        _date: NaiveDate,
        _records: &[RateRecord],
    ) -> Result<u64, StoreError> {
        Err(self.0.clone())
    }

    async fn query(
        &self,
        _date: NaiveDate,
        _code: Option<&str>,
    ) -> Result<Vec<PersistedRate>, StoreError> {
        Err(self.0.clone())
    }
}

use std::sync::Arc;

use chrono::NaiveDate;

use crate::feed_client::{FeedClient, FetchError};
use crate::rates::{self, ParseError};
use crate::single_flight::{ConcurrencyPolicy, DateLocks};
use crate::store::{RateStore, StoreError};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("ingestion for {0} is already in progress")]
    AlreadyInProgress(NaiveDate),
}

/// Runs fetch → parse → replace, one run at a time per date.
///
/// Nothing is retried here. A failed fetch or parse never reaches the store, and dropping the
/// returned future at any point leaves the store as it was (or fully replaced, if the commit
/// already happened).
pub struct IngestionService {
    feed: Arc<dyn FeedClient>,
    store: Arc<dyn RateStore>,
    locks: DateLocks,
    policy: ConcurrencyPolicy,
}

impl IngestionService {
    pub fn new(
        feed: Arc<dyn FeedClient>,
        store: Arc<dyn RateStore>,
        policy: ConcurrencyPolicy,
    ) -> Self {
        Self {
            feed,
            store,
            locks: DateLocks::new(),
            policy,
        }
    }

    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    pub fn is_running(&self, date: NaiveDate) -> bool {
        self.locks.is_held(date)
    }

    /// Returns the number of rows now stored for `date`.
    pub async fn ingest(&self, date: NaiveDate) -> Result<u64, IngestError> {
        let Some(_lease) = self.locks.acquire_with(date, self.policy).await else {
            log::info!("ingestion for {date} rejected: already in progress");
            return Err(IngestError::AlreadyInProgress(date));
        };

        log::info!("ingesting rates for {date}");
        let result = self.run(date).await;
        match &result {
            Ok(count) => log::info!("stored {count} rates for {date}"),
            Err(err) => log::warn!("ingestion for {date} failed: {err}"),
        }

        result
    }

    async fn run(&self, date: NaiveDate) -> Result<u64, IngestError> {
        let body = self.feed.fetch(date).await?;
        let records = rates::parse(&body)?;
        if records.is_empty() {
            log::info!("feed has no rates for {date}");
        }

        Ok(self.store.replace_for_date(date, &records).await?)
    }
}

use std::sync::Arc;

use crate::exchange_rate::{RateRow, parse_date};
use crate::store::{RateStore, StoreError};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueryError {
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read side: every call hits the store, nothing is cached.
pub struct QueryService {
    store: Arc<dyn RateStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn RateStore>) -> Self {
        Self { store }
    }

    /// Rates for `date`; an empty or missing `code` means all codes.
    pub async fn query(
        &self,
        date: &str,
        code: Option<&str>,
    ) -> Result<Vec<RateRow>, QueryError> {
        let date = parse_date(date).ok_or_else(|| QueryError::InvalidDate(date.to_string()))?;
        let code = code.filter(|code| !code.is_empty());

        let rates = self.store.query(date, code).await?;

        Ok(rates.into_iter().map(RateRow::from).collect())
    }
}

//! Persistence of daily rates.
//!
//! Every write goes through [`RateStore::replace_for_date`], which swaps the whole set of rows
//! for one date atomically. Readers never observe a half-replaced date.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::exchange_rate::{PersistedRate, RateRecord};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRateStore;
pub use postgres::PgRateStore;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("storage unreachable: {0}")]
    Connection(String),
    #[error("uniqueness violated: {0}")]
    Constraint(String),
    #[error("database error: {0}")]
    Database(String),
}

#[async_trait]
pub trait RateStore: Send + Sync {
    /// Removes every row for `date` and inserts `records`, in one transaction.
    /// Returns the number of rows inserted. On error the store is unchanged.
    async fn replace_for_date(
        &self,
        date: NaiveDate,
        records: &[RateRecord],
    ) -> Result<u64, StoreError>;

    /// Rows for `date`, restricted to `code` when given, ordered by code.
    async fn query(
        &self,
        date: NaiveDate,
        code: Option<&str>,
    ) -> Result<Vec<PersistedRate>, StoreError>;
}

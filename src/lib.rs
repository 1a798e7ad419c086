//! Daily exchange rates from the National Bank feed: fetch, store, serve.

pub mod config;
pub mod exchange_rate;
pub mod feed_client;
pub mod http;
pub mod ingest;
pub mod query;
pub mod rates;
pub mod single_flight;
pub mod store;

#[cfg(test)]
mod testing;

pub use exchange_rate::{PersistedRate, RateRecord, RateRow};
pub use feed_client::{FeedClient, FetchError, HttpFeedClient};
pub use ingest::{IngestError, IngestionService};
pub use query::{QueryError, QueryService};
pub use rates::ParseError;
pub use single_flight::ConcurrencyPolicy;
pub use store::{MemoryRateStore, PgRateStore, RateStore, StoreError};

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{RateStore, StoreError};
use crate::exchange_rate::{PersistedRate, RateRecord};

/// Process-local store. Each date's rows are kept sorted by code and replaced by a single
/// swap under the write lock.
#[derive(Debug, Default)]
pub struct MemoryRateStore {
    rates: RwLock<BTreeMap<NaiveDate, Vec<PersistedRate>>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored row, ordered by date then code.
    pub fn snapshot(&self) -> Result<Vec<PersistedRate>, StoreError> {
        let rates = self
            .rates
            .read()
            .map_err(|_| StoreError::Connection("rate table lock poisoned".to_string()))?;
        Ok(rates.values().flatten().cloned().collect())
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn replace_for_date(
        &self,
        date: NaiveDate,
        records: &[RateRecord],
    ) -> Result<u64, StoreError> {
        let mut seen = HashSet::new();
        for record in records {
            if !seen.insert(record.code.as_str()) {
                return Err(StoreError::Constraint(format!(
                    "duplicate code {} for {date}",
                    record.code
                )));
            }
        }

        let mut rows: Vec<PersistedRate> = records
            .iter()
            .map(|record| PersistedRate::from_record(record, date))
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        let count = rows.len() as u64;

        let mut rates = self
            .rates
            .write()
            .map_err(|_| StoreError::Connection("rate table lock poisoned".to_string()))?;
        if rows.is_empty() {
            rates.remove(&date);
        } else {
            rates.insert(date, rows);
        }

        Ok(count)
    }

    async fn query(
        &self,
        date: NaiveDate,
        code: Option<&str>,
    ) -> Result<Vec<PersistedRate>, StoreError> {
        let rates = self
            .rates
            .read()
            .map_err(|_| StoreError::Connection("rate table lock poisoned".to_string()))?;

        Ok(rates
            .get(&date)
            .into_iter()
            .flatten()
            .filter(|rate| code.is_none_or(|code| rate.code == code))
            .cloned()
            .collect())
    }
}

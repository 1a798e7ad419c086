use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sqlx::PgPool;
use uuid::Uuid;

use super::{RateStore, StoreError};
use crate::exchange_rate::{PersistedRate, RateRecord};

/// Rates stored in the `r_currency` table.
pub struct PgRateStore {
    pool: PgPool,
}

impl PgRateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Advisory lock key serializing writers for one date across processes.
fn date_lock_key(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Constraint(db.message().to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Connection(err.to_string()),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

#[async_trait]
impl RateStore for PgRateStore {
    async fn replace_for_date(
        &self,
        date: NaiveDate,
        records: &[RateRecord],
    ) -> Result<u64, StoreError> {
        // Dropping `tx` before commit rolls everything back.
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(date_lock_key(date))
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM r_currency WHERE a_date = $1")
            .bind(date)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let mut inserted = 0;
        for record in records {
            inserted += sqlx::query(
                r#"
                INSERT INTO r_currency (id, name, code, value, a_date)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&record.fullname)
            .bind(&record.code)
            .bind(record.value)
            .bind(date)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        log::debug!("replaced {deleted} rows with {inserted} for {date}");
        Ok(inserted)
    }

    async fn query(
        &self,
        date: NaiveDate,
        code: Option<&str>,
    ) -> Result<Vec<PersistedRate>, StoreError> {
        let rows = sqlx::query_as::<_, PersistedRate>(
            r#"
            SELECT id, name, code, value, a_date AS date
            FROM r_currency
            WHERE a_date = $1 AND ($2::text IS NULL OR code = $2)
            ORDER BY code
            "#,
        )
        .bind(date)
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

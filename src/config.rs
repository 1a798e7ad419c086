use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::feed_client::DEFAULT_FEED_URL;
use crate::single_flight::ConcurrencyPolicy;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    Postgres(DatabaseConfig),
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub store: StoreConfig,
    pub feed_url: String,
    pub feed_timeout: Duration,
    pub ingest_policy: ConcurrencyPolicy,
}

impl Config {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store = match var("RATE_STORE").as_deref().unwrap_or("postgres") {
            "postgres" => StoreConfig::Postgres(DatabaseConfig {
                database_url: database_url(&var)?,
                max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 5)?,
            }),
            "memory" => StoreConfig::Memory,
            other => bail!("RATE_STORE must be `postgres` or `memory`, got {other:?}"),
        };

        let ingest_policy = match var("INGEST_CONCURRENCY") {
            Some(policy) => policy
                .parse()
                .map_err(anyhow::Error::msg)
                .context("invalid INGEST_CONCURRENCY")?,
            None => ConcurrencyPolicy::default(),
        };

        Ok(Self {
            host: var("HTTP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&var, "PORT", 8080)?,
            store,
            feed_url: var("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            feed_timeout: Duration::from_secs(parse_or(&var, "FEED_TIMEOUT_SECS", 10)?),
            ingest_policy,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn database_url(var: &impl Fn(&str) -> Option<String>) -> Result<String> {
    if let Some(url) = var("DATABASE_URL") {
        return Ok(url);
    }

    let host = var("DB_HOST").context("DATABASE_URL or DB_HOST must be set")?;
    let port: u16 = parse_or(var, "DB_PORT", 5432)?;
    let name = var("DB_NAME").context("DB_NAME must be set")?;
    let user = var("DB_USER").context("DB_USER must be set")?;
    let password = var("DB_PASSWORD").unwrap_or_default();

    Ok(format!("postgres://{user}:{password}@{host}:{port}/{name}"))
}

/// Hides the password part of a connection URL for logging.
pub fn mask_database_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}

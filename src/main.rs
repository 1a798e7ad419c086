use std::sync::Arc;

use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

use tenge::config::{Config, StoreConfig, mask_database_url};
use tenge::{HttpFeedClient, IngestionService, MemoryRateStore, PgRateStore, QueryService, RateStore};

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let store = open_store(&config.store).await?;
    let feed = Arc::new(HttpFeedClient::new(&config.feed_url, config.feed_timeout)?);

    let ingest = web::Data::new(IngestionService::new(
        feed,
        store.clone(),
        config.ingest_policy,
    ));
    let query = web::Data::new(QueryService::new(store));

    log::info!(
        "starting server on {}:{} (ingest policy {:?})",
        config.host,
        config.port,
        config.ingest_policy
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(ingest.clone())
            .app_data(query.clone())
            .configure(tenge::http::configure)
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("can't bind {}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}

async fn open_store(config: &StoreConfig) -> Result<Arc<dyn RateStore>> {
    match config {
        StoreConfig::Memory => {
            log::warn!("using in-memory rate store, data is lost on exit");
            Ok(Arc::new(MemoryRateStore::new()))
        }
        StoreConfig::Postgres(db) => {
            log::info!(
                "connecting to database {}",
                mask_database_url(&db.database_url)
            );
            let pool = PgPoolOptions::new()
                .max_connections(db.max_connections)
                .connect(&db.database_url)
                .await
                .context("can't connect to database")?;

            let store = PgRateStore::new(pool);
            store
                .migrate()
                .await
                .context("can't apply database migrations")?;

            Ok(Arc::new(store))
        }
    }
}

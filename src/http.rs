//! HTTP surface: `/currency/save/{date}` and `/currency/{date}/{code}`.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, get, web};
use serde::Serialize;
use serde_json::json;

use crate::exchange_rate::parse_date;
use crate::ingest::{IngestError, IngestionService};
use crate::query::{QueryError, QueryService};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidDate(_) | ApiError::Query(QueryError::InvalidDate(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Ingest(IngestError::Fetch(_) | IngestError::Parse(_)) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Ingest(IngestError::AlreadyInProgress(_)) => StatusCode::CONFLICT,
            ApiError::Ingest(IngestError::Store(_)) | ApiError::Query(QueryError::Store(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[derive(Debug, Serialize)]
struct Inserted {
    inserted: u64,
}

#[get("/currency/save/{date}")]
async fn save_currency(
    ingest: web::Data<IngestionService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let raw = path.into_inner();
    let date = parse_date(&raw).ok_or(ApiError::InvalidDate(raw))?;

    let inserted = ingest.ingest(date).await?;

    Ok(HttpResponse::Ok().json(Inserted { inserted }))
}

async fn get_currency_all(
    query: web::Data<QueryService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let rows = query.query(&path, None).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[get("/currency/{date}/{code}")]
async fn get_currency(
    query: web::Data<QueryService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (date, code) = path.into_inner();
    let rows = query.query(&date, Some(&code)).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Registers the routes. `save` must come before the `{date}/{code}` pattern it overlaps.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(save_currency)
        .service(get_currency)
        .route("/currency/{date}", web::get().to(get_currency_all))
        .route("/currency/{date}/", web::get().to(get_currency_all));
}

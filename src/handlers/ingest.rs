//! # Ingestion Handler
//!
//! Endpoint that bulk-loads the operator store from the configured open-data
//! feed. Kept as a GET with a plain-text response for compatibility with the
//! historical surface.

use axum::extract::State;
use std::time::Duration;

use crate::error::{ApiError, feed_fetch_error};
use crate::feed::HttpFeedSource;
use crate::ingest::{IngestError, IngestionService};
use crate::server::AppState;

/// Populate the store from the open-data CSV feed
///
/// Re-invocation appends rather than upserts; with the unique SIRET index,
/// rows already present are counted as discards.
#[utoipa::path(
    get,
    path = "/create_init_db",
    responses(
        (status = 200, description = "Ingestion summary", content_type = "text/plain"),
        (status = 502, description = "Feed unreachable or unusable", body = ApiError)
    ),
    tag = "ingestion"
)]
pub async fn create_init_db(State(state): State<AppState>) -> Result<String, ApiError> {
    let feed_url = state.config.feed_url.clone();

    let source = HttpFeedSource::new(
        feed_url.clone(),
        Duration::from_secs(state.config.feed_timeout_seconds),
    )
    .map_err(|err| feed_fetch_error(&feed_url, err.to_string()))?;

    let service = IngestionService::new(&state.db, &source, state.config.ingest_batch_size);

    let report = service
        .run(state.shutdown.child_token())
        .await
        .map_err(|err| match err {
            IngestError::Feed(feed_err) => feed_fetch_error(&feed_url, feed_err.to_string()),
            IngestError::Normalize(normalize_err) => {
                feed_fetch_error(&feed_url, normalize_err.to_string())
            }
            IngestError::Cancelled { inserted } => ApiError::new(
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                &format!(
                    "ingestion interrupted by shutdown after {} inserted rows",
                    inserted
                ),
            ),
            IngestError::Database(db_err) => db_err.into(),
        })?;

    Ok(format!(
        "Base de données initiale générée avec succès : {} enregistrements insérés, {} écartés",
        report.inserted, report.discarded
    ))
}

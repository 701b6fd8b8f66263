//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the Opérateurs Bio API.

use axum::http::StatusCode;
use axum::response::{Html, Json};

use crate::db;
use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;
use axum::extract::State;

pub mod ingest;
pub mod operateurs;

pub use ingest::create_init_db;
pub use operateurs::{
    create_operateur, delete_operateur, get_operateur, list_operateurs_filtres, patch_operateur,
};

/// Landing page describing the service
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "HTML banner", content_type = "text/html")
    ),
    tag = "root"
)]
pub async fn root() -> Html<&'static str> {
    Html(
        "<h1>Opérateurs BIO</h1>\n<p>Ce site est le prototype d’une API mettant à disposition \
         des données sur les opérateurs BIO en France.</p>",
    )
}

/// Service health, backed by a live database round-trip
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = ServiceInfo),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn health(State(state): State<AppState>) -> Result<Json<ServiceInfo>, ApiError> {
    db::health_check(&state.db).await.map_err(|err| {
        tracing::warn!(error = ?err, "Health check failed");
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "database unreachable",
        )
    })?;

    Ok(Json(ServiceInfo::default()))
}

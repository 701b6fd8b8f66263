//! # Server Configuration
//!
//! This module contains the server setup and configuration for the
//! Opérateurs Bio API.

use std::sync::Arc;

use axum::{Router, routing::get};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    /// Cancelled on shutdown; ingestion runs take a child token from it.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build the state shared by every handler.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        Self {
            db,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/create_init_db", get(handlers::create_init_db))
        .route(
            "/api/v1/resources/operateur/{siret}",
            get(handlers::get_operateur)
                .put(handlers::create_operateur)
                .patch(handlers::patch_operateur)
                .delete(handlers::delete_operateur),
        )
        .route(
            "/api/v1/resources/operateurs-filtres",
            get(handlers::list_operateurs_filtres),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = AppState::new(config, db);
    let shutdown = state.shutdown.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::ingest::create_init_db,
        crate::handlers::operateurs::get_operateur,
        crate::handlers::operateurs::create_operateur,
        crate::handlers::operateurs::patch_operateur,
        crate::handlers::operateurs::delete_operateur,
        crate::handlers::operateurs::list_operateurs_filtres,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::operateurs::OperateurDto,
            crate::handlers::operateurs::CreateOperateurDto,
            crate::handlers::operateurs::PatchOperateurDto,
            crate::error::ApiError,
        )
    ),
    info(
        title = "Opérateurs Bio API",
        description = "API exposing French organic-operator registrations",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;

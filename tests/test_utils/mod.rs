//! Test utilities for database and router testing.
//!
//! Provides an in-memory SQLite database with migrations applied, a fully
//! wired application router, and a builder for ISO-8859-3 encoded feed
//! payloads.

use anyhow::Result;
use axum::Router;
use migration::{Migrator, MigratorTrait};
use operateurs_bio::config::AppConfig;
use operateurs_bio::server::{AppState, create_app};
use sea_orm::{Database, DatabaseConnection};

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Builds an application router over a fresh in-memory database.
///
/// The returned connection can seed or inspect the store behind the
/// router's back.
#[allow(dead_code)]
pub async fn setup_test_app() -> Result<(DatabaseConnection, Router)> {
    setup_test_app_with_config(AppConfig {
        profile: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        ..Default::default()
    })
    .await
}

/// Same as [`setup_test_app`], with a caller-supplied configuration
/// (used to point the feed URL at a mock server).
#[allow(dead_code)]
pub async fn setup_test_app_with_config(
    config: AppConfig,
) -> Result<(DatabaseConnection, Router)> {
    let db = setup_test_db().await?;
    let state = AppState::new(config, db.clone());
    Ok((db, create_app(state)))
}

/// Standard header row of the open-data export.
pub const FEED_HEADER: &str =
    "SIRET;NUMERO BIO;DENOMINATION;CODE POSTAL SIEGE SOCIAL;DATEENGAGEMENT;ACTIVITES;ORGANISME CERTIFICATEUR";

/// Encode a feed payload the way the portal serves it: ISO-8859-3 bytes.
#[allow(dead_code)]
pub fn iso_8859_3_feed(rows: &[&str]) -> Vec<u8> {
    let mut text = FEED_HEADER.to_string();
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }

    let (bytes, _, had_errors) = encoding_rs::ISO_8859_3.encode(&text);
    assert!(!had_errors, "test feed not representable in ISO-8859-3");
    bytes.into_owned()
}

//! # Ingestion Orchestrator
//!
//! Drives the feed normalizer over the complete open-data snapshot and
//! materializes surviving rows into the operator store. The run is
//! best-effort per row: normalizer discards and store rejections are counted
//! and logged, never fatal. Only a failed feed fetch or an unusable payload
//! aborts the run.

use metrics::{counter, histogram};
use sea_orm::{ActiveModelTrait, DatabaseConnection, TransactionTrait};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::feed::{FeedError, FeedSource, NormalizeError, RowOutcome, normalize_feed};
use crate::models::operateur::ActiveModel as OperateurActiveModel;

/// Counts reported at the end of an ingestion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub inserted: u64,
    pub discarded: u64,
}

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("feed fetch failed: {0}")]
    Feed(#[from] FeedError),

    #[error("feed normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("ingestion cancelled after {inserted} inserted rows")]
    Cancelled { inserted: u64 },

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Orchestrates one bulk load of the operator store from a feed source.
pub struct IngestionService<'a> {
    db: &'a DatabaseConnection,
    source: &'a dyn FeedSource,
    batch_size: usize,
}

impl<'a> IngestionService<'a> {
    /// Create a service inserting `batch_size` rows per transaction.
    pub fn new(db: &'a DatabaseConnection, source: &'a dyn FeedSource, batch_size: usize) -> Self {
        Self {
            db,
            source,
            batch_size: batch_size.max(1),
        }
    }

    /// Fetch, normalize, and insert the whole feed.
    ///
    /// Rows are committed in batches rather than one whole-feed transaction
    /// so a large snapshot does not starve concurrent readers. The
    /// cancellation token is checked between batches; already-committed
    /// batches survive a cancellation.
    #[instrument(skip_all)]
    pub async fn run(&self, cancel: CancellationToken) -> Result<IngestReport, IngestError> {
        let started = std::time::Instant::now();
        info!(feed = self.source.describe(), "Starting feed ingestion");

        let bytes = self.source.fetch().await?;
        info!(bytes = bytes.len(), "Feed payload fetched");

        let outcomes = normalize_feed(&bytes)?;

        let mut report = IngestReport::default();
        for chunk in outcomes.chunks(self.batch_size) {
            if cancel.is_cancelled() {
                warn!(
                    inserted = report.inserted,
                    "Ingestion cancelled before completion"
                );
                return Err(IngestError::Cancelled {
                    inserted: report.inserted,
                });
            }

            let txn = self.db.begin().await?;
            for outcome in chunk {
                match outcome {
                    RowOutcome::Draft(draft) => {
                        match OperateurActiveModel::from(draft.clone()).insert(&txn).await {
                            Ok(_) => report.inserted += 1,
                            Err(err) => {
                                // Typically the unique SIRET index on a re-run;
                                // the row is dropped, the batch continues.
                                report.discarded += 1;
                                debug!(
                                    siret = draft.siret,
                                    error = %err,
                                    "feed row rejected by the store"
                                );
                            }
                        }
                    }
                    RowOutcome::Discarded(reason) => {
                        report.discarded += 1;
                        debug!(reason = %reason, "feed row discarded");
                    }
                }
            }
            txn.commit().await?;
        }

        counter!("ingest_rows_inserted_total").increment(report.inserted);
        counter!("ingest_rows_discarded_total").increment(report.discarded);
        histogram!("ingest_run_duration_ms").record(started.elapsed().as_secs_f64() * 1_000.0);

        info!(
            inserted = report.inserted,
            discarded = report.discarded,
            "Feed ingestion completed"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    struct StaticFeed {
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl FeedSource for StaticFeed {
        async fn fetch(&self) -> Result<Vec<u8>, FeedError> {
            Ok(self.bytes.clone())
        }

        fn describe(&self) -> &str {
            "static-test-feed"
        }
    }

    struct BrokenFeed;

    #[async_trait]
    impl FeedSource for BrokenFeed {
        async fn fetch(&self) -> Result<Vec<u8>, FeedError> {
            Err(FeedError::Status { status: 503 })
        }

        fn describe(&self) -> &str {
            "broken-test-feed"
        }
    }

    async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    fn feed_bytes(rows: &[String]) -> Vec<u8> {
        let header = "SIRET;NUMERO BIO;DENOMINATION;CODE POSTAL SIEGE SOCIAL;DATEENGAGEMENT;ACTIVITES;ORGANISME CERTIFICATEUR";
        let mut text = header.to_string();
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.into_bytes()
    }

    fn valid_rows(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                format!(
                    "{};{};Ferme {};75001;2019-03-15;Production;ECOCERT FRANCE",
                    10000000000000 + i as i64,
                    i + 1,
                    i
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_run_counts_inserted_and_discarded() {
        let db = setup_test_db().await;

        let mut rows = valid_rows(100);
        rows.push(";9001;Sans Siret;75001;2019-03-15;Production;ECOCERT FRANCE".to_string());
        rows.push("10000000000200;9002;Date Cassée;75001;pas-une-date;Production;ECOCERT FRANCE".to_string());
        rows.push("10000000000201;abc;Numero Cassé;75001;2019-03-15;Production;ECOCERT FRANCE".to_string());

        let source = StaticFeed {
            bytes: feed_bytes(&rows),
        };
        let service = IngestionService::new(&db, &source, 32);

        let report = service.run(CancellationToken::new()).await.unwrap();
        assert_eq!(report.inserted, 100);
        assert_eq!(report.discarded, 3);
    }

    #[tokio::test]
    async fn test_rerun_discards_every_duplicate() {
        let db = setup_test_db().await;
        let source = StaticFeed {
            bytes: feed_bytes(&valid_rows(10)),
        };
        let service = IngestionService::new(&db, &source, 4);

        let first = service.run(CancellationToken::new()).await.unwrap();
        assert_eq!(first.inserted, 10);
        assert_eq!(first.discarded, 0);

        // The unique SIRET index turns a re-run into an all-discard pass
        let second = service.run(CancellationToken::new()).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.discarded, 10);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fatal() {
        let db = setup_test_db().await;
        let service = IngestionService::new(&db, &BrokenFeed, 32);

        let result = service.run(CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(IngestError::Feed(FeedError::Status { status: 503 }))
        ));
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_inserts_nothing() {
        let db = setup_test_db().await;
        let source = StaticFeed {
            bytes: feed_bytes(&valid_rows(5)),
        };
        let service = IngestionService::new(&db, &source, 2);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = service.run(cancel).await;
        assert!(matches!(
            result,
            Err(IngestError::Cancelled { inserted: 0 })
        ));
    }
}

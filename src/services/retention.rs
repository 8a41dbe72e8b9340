use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::RetentionConfig;
use crate::db::Database;
use crate::error::Result;
use crate::services::{BlobService, ConversionService};
use crate::storage::StorageProvider;

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Intents left by an interrupted sweep that were finished
    pub resumed: usize,
    /// Records found past the horizon
    pub expired: usize,
    /// Expired records deleted together with their blobs
    pub removed: usize,
    /// Unreferenced blobs deleted
    pub orphan_blobs: usize,
    pub failed: usize,
}

/// Handle for a running sweeper
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for an in-flight sweep to finish
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).await.is_err() {
            debug!("Retention sweeper already stopped");
        }
        if let Err(e) = self.join.await {
            error!(error = ?e, "Retention sweeper task panicked");
        }
    }
}

/// Periodically deletes conversions older than the retention horizon, along
/// with their blobs.
pub struct RetentionSweeper {
    db: Database,
    storage: Arc<dyn StorageProvider>,
    config: RetentionConfig,
}

impl RetentionSweeper {
    pub fn new(db: Database, storage: Arc<dyn StorageProvider>, config: RetentionConfig) -> Self {
        Self { db, storage, config }
    }

    /// Spawn the sweep loop. The first sweep runs immediately.
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let join = tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        SweeperHandle { shutdown_tx, join }
    }

    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        info!(
            horizon_days = self.config.horizon_days,
            interval_secs = self.config.sweep_interval_secs,
            "Retention sweeper started"
        );

        let mut ticker = tokio::time::interval(self.config.sweep_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Retention sweeper received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep_once(Utc::now()).await {
                        Ok(report) if report == SweepReport::default() => {
                            debug!("Retention sweep found nothing to delete");
                        }
                        Ok(report) => {
                            info!(
                                resumed = report.resumed,
                                expired = report.expired,
                                removed = report.removed,
                                orphan_blobs = report.orphan_blobs,
                                failed = report.failed,
                                "Retention sweep finished"
                            );
                        }
                        Err(e) => error!(error = %e, "Retention sweep failed"),
                    }
                }
            }
        }
    }

    /// Run one sweep as of `now`.
    ///
    /// Per-item failures are logged and counted; only failures to list what
    /// needs deleting abort the sweep.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for pending in ConversionService::pending_deletions(&self.db).await? {
            match self.delete_pair(&pending.record_id, &pending.blob_id).await {
                Ok(()) => report.resumed += 1,
                Err(e) => {
                    warn!(record_id = %pending.record_id, error = %e, "Failed to resume deletion");
                    report.failed += 1;
                }
            }
        }

        let cutoff = now - self.config.horizon();
        let expired = ConversionService::expired(&self.db, cutoff).await?;
        report.expired = expired.len();

        for record in expired {
            let result = match ConversionService::begin_deletion(&self.db, &record).await {
                Ok(()) => self.delete_pair(&record.id, &record.blob_id).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    debug!(record_id = %record.id, filename = %record.filename, "Expired conversion removed");
                    report.removed += 1;
                }
                Err(e) => {
                    warn!(record_id = %record.id, error = %e, "Failed to remove expired conversion");
                    report.failed += 1;
                }
            }
        }

        for blob in BlobService::list_orphans(&self.db, cutoff).await? {
            match BlobService::delete(&self.db, self.storage.as_ref(), &blob.id).await {
                Ok(()) => report.orphan_blobs += 1,
                Err(e) => {
                    warn!(blob_id = %blob.id, error = %e, "Failed to remove orphan blob");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Blob first, then record and intent together
    async fn delete_pair(&self, record_id: &str, blob_id: &str) -> Result<()> {
        BlobService::delete(&self.db, self.storage.as_ref(), blob_id).await?;
        ConversionService::finish_deletion(&self.db, record_id).await
    }
}

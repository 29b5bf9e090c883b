use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::access;
use super::types::Document;
use crate::database::{Database, DbError};
use crate::error::AppError;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Soft-delete: the document stays in storage until the sweeper removes it
pub fn move_to_trash(doc: &mut Document, owner_id: &str, now: i64) -> Result<(), AppError> {
    access::require_owner(doc, owner_id)?;

    doc.is_deleted = true;
    doc.deleted_at = Some(now);
    doc.last_modified = now;
    Ok(())
}

pub fn restore_from_trash(doc: &mut Document, owner_id: &str, now: i64) -> Result<(), AppError> {
    access::require_owner(doc, owner_id)?;

    if !doc.is_deleted {
        return Err(AppError::validation("Document is not in the trash"));
    }

    doc.is_deleted = false;
    doc.deleted_at = None;
    doc.last_modified = now;
    Ok(())
}

/// Periodic hard-delete of documents that stayed in the trash past the
/// retention window.
///
/// Each tick awaits the purge before the next tick is taken and missed
/// ticks are skipped, so two runs never overlap.
pub struct TrashSweeper {
    db: Arc<Database>,
    retention: Duration,
    interval: Duration,
}

impl TrashSweeper {
    /// A zero interval is raised to one second; `tokio::time::interval` panics on zero.
    pub fn new(db: Arc<Database>, retention: Duration, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            tracing::warn!("trash sweep interval of zero raised to {:?}", MIN_SWEEP_INTERVAL);
            MIN_SWEEP_INTERVAL
        } else {
            interval
        };
        Self { db, retention, interval }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(
                retention_secs = self.retention.as_secs(),
                interval_secs = self.interval.as_secs(),
                "trash sweeper started"
            );

            loop {
                ticker.tick().await;

                let db = self.db.clone();
                let retention = self.retention;
                let result = tokio::task::spawn_blocking(move || sweep_once(&db, retention)).await;

                match result {
                    Ok(Ok(removed)) if !removed.is_empty() => {
                        tracing::info!(count = removed.len(), "purged expired documents from trash");
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::error!(error = %e, "trash sweep failed"),
                    Err(e) => tracing::error!(error = %e, "trash sweep task panicked"),
                }
            }
        })
    }
}

/// One sweep against the current clock
pub fn sweep_once(db: &Database, retention: Duration) -> Result<Vec<String>, DbError> {
    let now = chrono::Utc::now().timestamp_millis();
    db.purge_expired_trash(now, retention.as_millis() as i64)
}

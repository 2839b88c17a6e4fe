//! Startup recovery and retention cleanup
//!
//! On startup, recordings left in `recording` by a previous process are
//! failed and schedule timers are rebuilt. When a retention window is
//! configured, a background task periodically deletes old finished
//! recordings along with their files.

use chrono::Utc;
use std::time::Duration;
use tokio::time;

use crate::error::Result;

use super::engine::RecordingEngine;
use super::scheduler::Scheduler;

/// Configuration for the retention task
pub struct CleanupConfig {
    /// How often to run cleanup (in seconds)
    pub interval_secs: u64,
    /// Finished recordings older than this many days are deleted
    pub retention_days: i64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600, // Run every hour
            retention_days: 30,
        }
    }
}

/// Result of a startup recovery pass
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    pub interrupted_failed: usize,
    pub schedules_armed: usize,
}

/// Fail orphaned captures, then re-arm enabled schedules.
/// Must run before the HTTP server accepts requests.
pub async fn run_startup_recovery(scheduler: &Scheduler) -> Result<RecoveryResult> {
    let interrupted_failed = scheduler.engine().fail_interrupted().await?;
    let schedules_armed = scheduler.init_scheduled_recordings().await?;

    tracing::info!(
        "Startup recovery: {} interrupted recordings failed, {} schedules armed",
        interrupted_failed,
        schedules_armed
    );

    Ok(RecoveryResult {
        interrupted_failed,
        schedules_armed,
    })
}

/// Delete finished recordings that ended before the retention window.
/// Returns the number of deleted recordings.
pub async fn purge_expired(engine: &RecordingEngine, retention_days: i64) -> Result<usize> {
    let cutoff = Utc::now() - chrono::Duration::days(retention_days);

    let expired: Vec<String> = engine
        .get_recordings()
        .await
        .into_iter()
        .filter(|r| r.status.is_terminal() && r.end_time.unwrap_or(r.created_at) < cutoff)
        .map(|r| r.id)
        .collect();

    for id in &expired {
        engine.delete_recording(id).await?;
    }

    Ok(expired.len())
}

/// Start the background retention task
///
/// Runs immediately, then periodically at the configured interval.
/// This should be spawned as a background task using `tokio::spawn`.
pub async fn start_cleanup_task(engine: RecordingEngine, config: CleanupConfig) {
    tracing::info!(
        "Starting cleanup task (interval: {}s, retention: {} days)",
        config.interval_secs,
        config.retention_days
    );

    let mut interval = time::interval(Duration::from_secs(config.interval_secs.max(1)));

    loop {
        interval.tick().await;

        match purge_expired(&engine, config.retention_days).await {
            Ok(0) => {}
            Ok(count) => tracing::info!("Cleanup: deleted {} expired recordings", count),
            Err(e) => tracing::warn!("Cleanup error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Recording, RecordingCategory, RecordingOptions, RecordingStatus};
    use crate::services::testing::{engine_in, PendingSource};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn finished(days_ago: i64, file_path: String) -> Recording {
        let mut rec = Recording::started(
            "BBC One",
            "http://stream/1",
            30,
            file_path,
            RecordingCategory::Other,
            RecordingOptions::default(),
        );
        let end = Utc::now() - chrono::Duration::days(days_ago);
        rec.start_time = end - chrono::Duration::minutes(30);
        rec.created_at = rec.start_time;
        rec.complete(end, Some(0)).unwrap();
        rec
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_recent() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = engine_in(dir.path(), Arc::new(PendingSource::new(&[]))).await;

        let old_file = dir.path().join("old.ts");
        tokio::fs::write(&old_file, b"old").await.unwrap();

        let old = finished(40, old_file.to_string_lossy().into_owned());
        let recent = finished(2, "recent.ts".to_string());
        let recent_id = recent.id.clone();
        engine
            .store()
            .update_recordings(|list| {
                list.push(old);
                list.push(recent);
            })
            .await
            .unwrap();

        assert_eq!(purge_expired(&engine, 30).await.unwrap(), 1);

        let remaining = engine.get_recordings().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, recent_id);
        assert!(!old_file.exists());
    }

    #[tokio::test]
    async fn test_startup_recovery() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = engine_in(dir.path(), Arc::new(PendingSource::new(&[]))).await;

        let orphan = Recording::started(
            "CNN",
            "http://stream/2",
            30,
            "orphan.ts".to_string(),
            RecordingCategory::News,
            RecordingOptions::default(),
        );
        let orphan_id = orphan.id.clone();
        engine
            .store()
            .update_recordings(|list| list.push(orphan))
            .await
            .unwrap();

        let scheduler = Scheduler::new(engine.clone(), chrono::Duration::minutes(5));
        let at = Utc::now() + chrono::Duration::hours(1);
        scheduler
            .schedule_recording("CNN", "ch1", "http://stream/2", at, 30, Default::default())
            .await
            .unwrap();

        let restarted = Scheduler::new(engine.clone(), chrono::Duration::minutes(5));
        let result = run_startup_recovery(&restarted).await.unwrap();
        assert_eq!(
            result,
            RecoveryResult {
                interrupted_failed: 1,
                schedules_armed: 1,
            }
        );
        assert_eq!(
            engine.get_recording(&orphan_id).await.unwrap().status,
            RecordingStatus::Failed
        );
        assert_eq!(restarted.armed_count(), 1);
    }
}

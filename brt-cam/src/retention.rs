//! Retention sweep
//!
//! Deletes observations older than the configured window. Running a sweep
//! twice at the same instant deletes nothing the second time.

use crate::store::ObservationStore;
use brt_common::config::RetentionConfig;
use brt_common::{time, Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Oldest instant that survives a sweep at `now`
pub fn cutoff_for(window: Duration, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let window = chrono::Duration::from_std(window)
        .map_err(|e| Error::Config(format!("Retention window too large: {}", e)))?;
    now.checked_sub_signed(window)
        .ok_or_else(|| Error::Config("Retention window reaches before the epoch".to_string()))
}

/// Delete everything observed strictly before `now - window`
pub async fn sweep(
    store: &dyn ObservationStore,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<u64> {
    let cutoff = cutoff_for(window, now)?;
    let deleted = store.delete_older_than(cutoff).await?;

    if deleted > 0 {
        info!(deleted, cutoff = %cutoff, "Retention sweep removed old observations");
    } else {
        debug!(cutoff = %cutoff, "Retention sweep found nothing to remove");
    }
    Ok(deleted)
}

/// Spawn the periodic sweep; returns `None` when retention is disabled
pub fn spawn_retention_task(
    store: Arc<dyn ObservationStore>,
    config: &RetentionConfig,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    if !config.enabled {
        info!("Retention task disabled");
        return None;
    }

    let window = time::secs_to_duration(config.window_secs);
    let period = time::secs_to_duration(config.interval_secs.max(1));
    info!(
        window_secs = config.window_secs,
        interval_secs = period.as_secs(),
        "Starting retention task"
    );

    Some(tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Retention task stopped");
                    break;
                }
                _ = timer.tick() => {
                    if let Err(e) = sweep(store.as_ref(), window, time::now()).await {
                        error!("Retention sweep failed: {}", e);
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryObservationStore;
    use brt_common::{Observation, ObservationSource, Prediction};
    use chrono::TimeZone;

    fn observation_at(at: DateTime<Utc>) -> Observation {
        Observation::resolved(
            at,
            None,
            Some("P1".into()),
            Prediction::starting_at("437", 5, at),
            "TI Caxangá (Conde da Boa Vista)",
            10,
            ObservationSource::Upload,
        )
    }

    #[tokio::test]
    async fn test_sweep_cutoff_is_exclusive_and_idempotent() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let store = MemoryObservationStore::new();
        store.insert(&observation_at(now - chrono::Duration::minutes(61))).await.unwrap();
        store.insert(&observation_at(now - chrono::Duration::minutes(60))).await.unwrap();
        store.insert(&observation_at(now - chrono::Duration::minutes(5))).await.unwrap();

        let window = Duration::from_secs(3600);
        assert_eq!(sweep(&store, window, now).await.unwrap(), 1);
        assert_eq!(sweep(&store, window, now).await.unwrap(), 0);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_disabled_task_is_not_spawned() {
        let config = RetentionConfig {
            enabled: false,
            ..RetentionConfig::default()
        };
        let store: Arc<dyn ObservationStore> = Arc::new(MemoryObservationStore::new());
        assert!(spawn_retention_task(store, &config, CancellationToken::new()).is_none());
    }

    #[tokio::test]
    async fn test_task_stops_on_cancel() {
        let store: Arc<dyn ObservationStore> = Arc::new(MemoryObservationStore::new());
        let cancel = CancellationToken::new();
        let handle = spawn_retention_task(store, &RetentionConfig::default(), cancel.clone())
            .expect("enabled by default");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("task should stop")
            .unwrap();
    }
}

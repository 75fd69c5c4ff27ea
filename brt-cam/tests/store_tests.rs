//! Observation store contract, run against both engines
//!
//! Tests cover:
//! - Insert and read back (resolved and unresolved)
//! - Recent ordering and limit
//! - Per-stop ordering
//! - Counting by destination and line, including missing destinations
//! - Retention cutoff and idempotence
//! - SQLite persistence across reopen
//! - Ping on a live store

use brt_cam::store::{MemoryObservationStore, ObservationStore, SqliteObservationStore};
use brt_common::{Observation, ObservationSource, Prediction};
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap()
}

/// T1..T5 are one minute apart
fn t(n: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(n)
}

fn resolved(at: DateTime<Utc>, line: &str, destination: Option<&str>) -> Observation {
    Observation::resolved(
        at,
        Some("origin".into()),
        destination.map(str::to_string),
        Prediction::starting_at(line, 5, at),
        format!("Line {}", line),
        128,
        ObservationSource::Upload,
    )
}

async fn stores() -> Vec<(&'static str, Box<dyn ObservationStore>)> {
    vec![
        ("memory", Box::new(MemoryObservationStore::new())),
        (
            "sqlite",
            Box::new(SqliteObservationStore::open_in_memory().await.unwrap()),
        ),
    ]
}

#[tokio::test]
async fn test_insert_round_trips_all_fields() {
    for (engine, store) in stores().await {
        let observation = resolved(t(1), "437", Some("P1"));
        let unresolved = Observation::unresolved(t(2), None, None, 0, ObservationSource::SimulatedReplay);

        assert_eq!(store.insert(&observation).await.unwrap(), observation.id);
        store.insert(&unresolved).await.unwrap();

        let recent = store.find_recent(10).await.unwrap();
        assert_eq!(recent, vec![unresolved.clone(), observation.clone()], "{}", engine);
    }
}

#[tokio::test]
async fn test_ping_live_store() {
    for (engine, store) in stores().await {
        assert!(store.ping().await.is_ok(), "{}", engine);
    }
}

#[tokio::test]
async fn test_recent_is_newest_first_and_limited() {
    for (engine, store) in stores().await {
        // Inserted out of order on purpose
        for n in [3, 1, 5, 2, 4] {
            store.insert(&resolved(t(n), "301", None)).await.unwrap();
        }

        let recent = store.find_recent(2).await.unwrap();
        let times: Vec<_> = recent.iter().map(|o| o.observed_at).collect();
        assert_eq!(times, vec![t(5), t(4)], "{}", engine);

        assert_eq!(store.find_recent(100).await.unwrap().len(), 5, "{}", engine);
    }
}

#[tokio::test]
async fn test_find_by_destination_is_oldest_first() {
    for (engine, store) in stores().await {
        store.insert(&resolved(t(3), "820", Some("P1"))).await.unwrap();
        store.insert(&resolved(t(1), "437", Some("P1"))).await.unwrap();
        store.insert(&resolved(t(2), "723", Some("P2"))).await.unwrap();

        let lines: Vec<_> = store
            .find_by_destination_stop("P1")
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.line_id.unwrap())
            .collect();
        assert_eq!(lines, vec!["437", "820"], "{}", engine);
        assert!(store.find_by_destination_stop("P9").await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_count_matching() {
    for (engine, store) in stores().await {
        store.insert(&resolved(t(1), "437", Some("P1"))).await.unwrap();
        store.insert(&resolved(t(2), "437", Some("P1"))).await.unwrap();
        store.insert(&resolved(t(3), "437", Some("P2"))).await.unwrap();
        store.insert(&resolved(t(4), "820", Some("P1"))).await.unwrap();
        store.insert(&resolved(t(5), "437", None)).await.unwrap();

        assert_eq!(store.count_matching(Some("P1"), "437").await.unwrap(), 2, "{}", engine);
        assert_eq!(store.count_matching(Some("P2"), "437").await.unwrap(), 1, "{}", engine);
        assert_eq!(store.count_matching(None, "437").await.unwrap(), 1, "{}", engine);
        assert_eq!(store.count_matching(Some("P1"), "999").await.unwrap(), 0, "{}", engine);
    }
}

#[tokio::test]
async fn test_delete_older_than_is_strict_and_idempotent() {
    for (engine, store) in stores().await {
        for n in 1..=5 {
            store.insert(&resolved(t(n), "301", None)).await.unwrap();
        }

        assert_eq!(store.delete_older_than(t(3)).await.unwrap(), 2, "{}", engine);
        assert_eq!(store.delete_older_than(t(3)).await.unwrap(), 0, "{}", engine);

        let remaining: Vec<_> = store
            .find_recent(10)
            .await
            .unwrap()
            .iter()
            .map(|o| o.observed_at)
            .collect();
        assert_eq!(remaining, vec![t(5), t(4), t(3)], "{}", engine);
    }
}

#[tokio::test]
async fn test_sqlite_store_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("brt.db");
    let observation = resolved(t(1), "2450", Some("P3"));

    let store = SqliteObservationStore::open(&db_path).await.unwrap();
    store.insert(&observation).await.unwrap();
    store.close().await;

    let reopened = SqliteObservationStore::open(&db_path).await.unwrap();
    let found = reopened.find_by_destination_stop("P3").await.unwrap();
    assert_eq!(found, vec![observation]);
    reopened.close().await;
}

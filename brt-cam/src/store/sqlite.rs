//! SQLite observation store

use super::ObservationStore;
use async_trait::async_trait;
use brt_common::db::{init_database, init_memory_database};
use brt_common::{time, Error, Observation, ObservationSource, Prediction, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

const SELECT_COLUMNS: &str = r#"
    SELECT guid, observed_at_us, origin_stop, destination_stop, line_id,
           display_name, eta_minutes, arrival_at_us, payload_size_bytes, source
    FROM observations
"#;

#[derive(Debug, Clone)]
pub struct SqliteObservationStore {
    pool: SqlitePool,
}

impl SqliteObservationStore {
    /// Open (creating if needed) the database file
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = init_database(db_path).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database with the schema applied
    pub async fn open_in_memory() -> Result<Self> {
        let pool = init_memory_database().await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ObservationStore for SqliteObservationStore {
    async fn insert(&self, observation: &Observation) -> Result<Uuid> {
        let (eta_minutes, arrival_at_us) = match &observation.prediction {
            Some(p) => (Some(i64::from(p.eta_minutes)), Some(time::to_micros(p.arrival_at))),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO observations (
                guid, observed_at_us, origin_stop, destination_stop, line_id,
                display_name, eta_minutes, arrival_at_us, payload_size_bytes, source
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(observation.id.to_string())
        .bind(time::to_micros(observation.observed_at))
        .bind(&observation.origin_stop)
        .bind(&observation.destination_stop)
        .bind(&observation.line_id)
        .bind(&observation.display_name)
        .bind(eta_minutes)
        .bind(arrival_at_us)
        .bind(i64::try_from(observation.payload_size_bytes).unwrap_or(i64::MAX))
        .bind(observation.source.as_str())
        .execute(&self.pool)
        .await?;

        Ok(observation.id)
    }

    async fn find_recent(&self, limit: u32) -> Result<Vec<Observation>> {
        let sql = format!(
            "{} ORDER BY observed_at_us DESC, rowid DESC LIMIT ?",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(observation_from_row).collect()
    }

    async fn find_by_destination_stop(&self, stop_id: &str) -> Result<Vec<Observation>> {
        let sql = format!(
            "{} WHERE destination_stop = ? ORDER BY observed_at_us ASC, rowid ASC",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(stop_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(observation_from_row).collect()
    }

    async fn count_matching(&self, destination_stop: Option<&str>, line_id: &str) -> Result<u64> {
        // `IS` compares NULL to NULL as equal
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM observations WHERE destination_stop IS ? AND line_id = ?",
        )
        .bind(destination_stop)
        .bind(line_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM observations WHERE observed_at_us < ?")
            .bind(time::to_micros(cutoff))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Observation database closed");
    }
}

fn observation_from_row(row: &SqliteRow) -> Result<Observation> {
    let guid: String = row.try_get("guid")?;
    let id = Uuid::parse_str(&guid)
        .map_err(|e| Error::Internal(format!("Invalid observation id {}: {}", guid, e)))?;

    let observed_at = timestamp_column(row, "observed_at_us")?;
    let line_id: Option<String> = row.try_get("line_id")?;
    let eta_minutes: Option<i64> = row.try_get("eta_minutes")?;
    let arrival_at_us: Option<i64> = row.try_get("arrival_at_us")?;

    let prediction = match (&line_id, eta_minutes, arrival_at_us) {
        (Some(line), Some(eta), Some(arrival)) => Some(Prediction {
            line_id: line.clone(),
            eta_minutes: u32::try_from(eta)
                .map_err(|_| Error::Internal(format!("Invalid eta {} for {}", eta, guid)))?,
            arrival_at: time::from_micros(arrival)
                .ok_or_else(|| Error::Internal(format!("Invalid arrival time for {}", guid)))?,
        }),
        _ => None,
    };

    let source: String = row.try_get("source")?;
    let source: ObservationSource = source.parse()?;
    let payload_size_bytes: i64 = row.try_get("payload_size_bytes")?;

    Ok(Observation {
        id,
        observed_at,
        origin_stop: row.try_get("origin_stop")?,
        destination_stop: row.try_get("destination_stop")?,
        line_id,
        display_name: row.try_get("display_name")?,
        prediction,
        payload_size_bytes: payload_size_bytes.max(0) as u64,
        source,
    })
}

fn timestamp_column(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let micros: i64 = row.try_get(column)?;
    time::from_micros(micros)
        .ok_or_else(|| Error::Internal(format!("Timestamp out of range in {}", column)))
}

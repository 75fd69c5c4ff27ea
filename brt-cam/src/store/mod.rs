//! Observation store
//!
//! The write/read contract the pipeline needs from persistence. Every
//! operation is atomic on its own; nothing here spans operations.
//!
//! Engines:
//! - [`SqliteObservationStore`]: the service database
//! - [`MemoryObservationStore`]: tests and `--in-memory` runs

use async_trait::async_trait;
use brt_common::{Observation, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

mod memory;
mod sqlite;

pub use memory::MemoryObservationStore;
pub use sqlite::SqliteObservationStore;

#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Persist one observation, returning its id
    async fn insert(&self, observation: &Observation) -> Result<Uuid>;

    /// Up to `limit` observations, newest first
    async fn find_recent(&self, limit: u32) -> Result<Vec<Observation>>;

    /// All observations for a destination stop, oldest first
    async fn find_by_destination_stop(&self, stop_id: &str) -> Result<Vec<Observation>>;

    /// Observations with this destination (`None` = no destination) and line
    async fn count_matching(&self, destination_stop: Option<&str>, line_id: &str) -> Result<u64>;

    /// Delete observations strictly older than `cutoff`, returning how many
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Cheap round trip proving the store answers
    async fn ping(&self) -> Result<()>;

    /// Release resources; further calls may fail
    async fn close(&self);
}

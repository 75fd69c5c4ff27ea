//! In-memory observation store

use super::ObservationStore;
use async_trait::async_trait;
use brt_common::{Observation, Result};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Observations kept in insertion order
#[derive(Debug, Default)]
pub struct MemoryObservationStore {
    observations: RwLock<Vec<Observation>>,
}

impl MemoryObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.observations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.observations.read().await.is_empty()
    }
}

#[async_trait]
impl ObservationStore for MemoryObservationStore {
    async fn insert(&self, observation: &Observation) -> Result<Uuid> {
        self.observations.write().await.push(observation.clone());
        Ok(observation.id)
    }

    async fn find_recent(&self, limit: u32) -> Result<Vec<Observation>> {
        let observations = self.observations.read().await;
        // Reverse first so equal timestamps come back latest-inserted first
        let mut recent: Vec<Observation> = observations.iter().rev().cloned().collect();
        recent.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        recent.truncate(limit as usize);
        Ok(recent)
    }

    async fn find_by_destination_stop(&self, stop_id: &str) -> Result<Vec<Observation>> {
        let observations = self.observations.read().await;
        let mut matching: Vec<Observation> = observations
            .iter()
            .filter(|o| o.destination_stop.as_deref() == Some(stop_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.observed_at.cmp(&b.observed_at));
        Ok(matching)
    }

    async fn count_matching(&self, destination_stop: Option<&str>, line_id: &str) -> Result<u64> {
        let observations = self.observations.read().await;
        Ok(observations
            .iter()
            .filter(|o| o.destination_stop.as_deref() == destination_stop)
            .filter(|o| o.line_id.as_deref() == Some(line_id))
            .count() as u64)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut observations = self.observations.write().await;
        let before = observations.len();
        observations.retain(|o| o.observed_at >= cutoff);
        Ok((before - observations.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}

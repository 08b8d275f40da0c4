//! CRUD store for domain entities (§6): trip lookup, alert persistence,
//! status escalation. The HTTP bridge uses this — not the processors —
//! since "the bridge MUST NOT own state that the processor owns" (§4.10);
//! trips and alerts are bridge-side bookkeeping, distinct from the
//! pipeline's own State Store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unknown trip id: {0}")]
    UnknownTrip(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Active,
    Escalated,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub trip_id: String,
    pub truck_id: String,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: Uuid,
    pub trip_id: String,
    pub truck_id: String,
    pub risk_level: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_trip(&self, trip_id: &str) -> Result<Trip, StoreError>;
    async fn escalate_trip(&self, trip_id: &str) -> Result<(), StoreError>;
    async fn record_alert(&self, alert: Alert) -> Result<(), StoreError>;
    async fn list_alerts(&self, trip_id: &str) -> Vec<Alert>;
}

/// In-memory trip/alert store backing the HTTP bridge in a single-process
/// deployment. Trips are seeded on first reference from an unknown truck
/// id rather than requiring a separate provisioning step, so the bridge
/// works standalone against the demo feed.
pub struct InMemoryStore {
    trips: DashMap<String, Trip>,
    alerts: DashMap<String, Vec<Alert>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self { trips: DashMap::new(), alerts: DashMap::new() }
    }

    pub fn seed_trip(&self, trip_id: &str, truck_id: &str) {
        self.trips.entry(trip_id.to_string()).or_insert_with(|| Trip {
            trip_id: trip_id.to_string(),
            truck_id: truck_id.to_string(),
            status: TripStatus::Active,
            created_at: Utc::now(),
        });
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_trip(&self, trip_id: &str) -> Result<Trip, StoreError> {
        self.trips.get(trip_id).map(|t| t.clone()).ok_or_else(|| StoreError::UnknownTrip(trip_id.to_string()))
    }

    async fn escalate_trip(&self, trip_id: &str) -> Result<(), StoreError> {
        let mut trip =
            self.trips.get_mut(trip_id).ok_or_else(|| StoreError::UnknownTrip(trip_id.to_string()))?;
        trip.status = TripStatus::Escalated;
        Ok(())
    }

    async fn record_alert(&self, alert: Alert) -> Result<(), StoreError> {
        if !self.trips.contains_key(&alert.trip_id) {
            return Err(StoreError::UnknownTrip(alert.trip_id.clone()));
        }
        self.alerts.entry(alert.trip_id.clone()).or_default().push(alert);
        Ok(())
    }

    async fn list_alerts(&self, trip_id: &str) -> Vec<Alert> {
        self.alerts.get(trip_id).map(|a| a.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_trip_errors() {
        let store = InMemoryStore::new();
        assert!(store.get_trip("nope").await.is_err());
    }

    #[tokio::test]
    async fn seeded_trip_is_found() {
        let store = InMemoryStore::new();
        store.seed_trip("trip-1", "T1");
        let trip = store.get_trip("trip-1").await.unwrap();
        assert_eq!(trip.truck_id, "T1");
        assert_eq!(trip.status, TripStatus::Active);
    }

    #[tokio::test]
    async fn escalate_updates_status() {
        let store = InMemoryStore::new();
        store.seed_trip("trip-1", "T1");
        store.escalate_trip("trip-1").await.unwrap();
        let trip = store.get_trip("trip-1").await.unwrap();
        assert_eq!(trip.status, TripStatus::Escalated);
    }

    #[tokio::test]
    async fn alert_on_unknown_trip_errors() {
        let store = InMemoryStore::new();
        let alert = Alert {
            alert_id: Uuid::new_v4(),
            trip_id: "nope".into(),
            truck_id: "T1".into(),
            risk_level: "HIGH".into(),
            created_at: Utc::now(),
        };
        assert!(store.record_alert(alert).await.is_err());
    }
}

//! Optional sled-backed persistence for baselines and corridor geometry
//! (§6 "Persisted state layout"). This is a write-behind layer on top of
//! [`super::InMemoryStateStore`], not a replacement for it: startup reads
//! from disk to warm the in-memory maps, and writes go to both. A missing
//! or corrupt database file degrades to an empty store with a warning —
//! the pipeline must run cold.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::{IncidentSummary, InMemoryStateStore, StateStore};
use crate::types::{RiskOutput, TwinBaseline};

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to open sled db at {0}: {1}")]
    Open(std::path::PathBuf, sled::Error),
    #[error("sled operation failed: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to (de)serialize persisted value: {0}")]
    Serde(#[from] serde_json::Error),
}

const BASELINE_TREE: &str = "baselines";
const GEOMETRY_KEY: &str = "corridor_geometry";

/// Thin wrapper around a sled database persisting baselines and, when
/// present, a raw corridor/risk-zone geometry blob (the same bytes the
/// geofence module would otherwise load from `route.geometry_path`).
pub struct PersistentStore {
    db: sled::Db,
}

impl PersistentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|e| PersistenceError::Open(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Opened persistent state store");
        Ok(Self { db })
    }

    /// Open the store, logging and falling back to `None` on any failure
    /// rather than propagating — persistence is an optimization, not a
    /// requirement (§6).
    pub fn open_or_warn(path: impl AsRef<Path>) -> Option<Arc<Self>> {
        match Self::open(path) {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                warn!(error = %e, "Persistent state store unavailable, running cold");
                None
            }
        }
    }

    pub fn load_baseline(&self, truck_id: &str) -> Option<TwinBaseline> {
        let tree = self.db.open_tree(BASELINE_TREE).ok()?;
        let raw = tree.get(truck_id.as_bytes()).ok()??;
        serde_json::from_slice(&raw).ok()
    }

    pub fn save_baseline(&self, truck_id: &str, baseline: &TwinBaseline) -> Result<(), PersistenceError> {
        let tree = self.db.open_tree(BASELINE_TREE)?;
        let raw = serde_json::to_vec(baseline)?;
        tree.insert(truck_id.as_bytes(), raw)?;
        Ok(())
    }

    pub fn load_all_baselines(&self) -> Vec<(String, TwinBaseline)> {
        let Ok(tree) = self.db.open_tree(BASELINE_TREE) else {
            return Vec::new();
        };
        tree.iter()
            .filter_map(|entry| entry.ok())
            .filter_map(|(k, v)| {
                let truck_id = String::from_utf8(k.to_vec()).ok()?;
                let baseline: TwinBaseline = serde_json::from_slice(&v).ok()?;
                Some((truck_id, baseline))
            })
            .collect()
    }

    pub fn load_geometry(&self) -> Option<Vec<u8>> {
        self.db.get(GEOMETRY_KEY).ok()?.map(|v| v.to_vec())
    }

    pub fn save_geometry(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        self.db.insert(GEOMETRY_KEY, bytes)?;
        Ok(())
    }
}

/// A [`StateStore`] that warms its baselines from a [`PersistentStore`] at
/// construction and mirrors every baseline write back to disk, while every
/// other entry (signals, cooldowns, incidents, the risk cache) stays
/// in-memory-only — those are short-lived by design (§4.2) and don't need
/// to survive a restart.
pub struct PersistedStateStore {
    memory: InMemoryStateStore,
    disk: Option<Arc<PersistentStore>>,
}

impl PersistedStateStore {
    pub fn new(disk: Option<Arc<PersistentStore>>) -> Self {
        let memory = InMemoryStateStore::new();
        if let Some(disk) = &disk {
            for (truck_id, baseline) in disk.load_all_baselines() {
                memory.set_baseline(&truck_id, baseline);
            }
        }
        Self { memory, disk }
    }
}

impl StateStore for PersistedStateStore {
    fn get_baseline(&self, truck_id: &str) -> TwinBaseline {
        self.memory.get_baseline(truck_id)
    }

    fn set_baseline(&self, truck_id: &str, baseline: TwinBaseline) {
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.save_baseline(truck_id, &baseline) {
                warn!(truck_id, error = %e, "failed to persist baseline, keeping in-memory only");
            }
        }
        self.memory.set_baseline(truck_id, baseline);
    }

    fn get_signal(&self, truck_id: &str, channel: &str) -> Option<(Vec<u8>, chrono::DateTime<chrono::Utc>)> {
        self.memory.get_signal(truck_id, channel)
    }

    fn set_signal(&self, truck_id: &str, channel: &str, payload: Vec<u8>, ttl: Duration) {
        self.memory.set_signal(truck_id, channel, payload, ttl)
    }

    fn is_on_cooldown(&self, truck_id: &str, rule_id: &str) -> bool {
        self.memory.is_on_cooldown(truck_id, rule_id)
    }

    fn set_cooldown(&self, truck_id: &str, rule_id: &str, ttl: Duration) {
        self.memory.set_cooldown(truck_id, rule_id, ttl)
    }

    fn push_incident(&self, truck_id: &str, incident: IncidentSummary) {
        self.memory.push_incident(truck_id, incident)
    }

    fn list_incidents(&self, truck_id: &str) -> Vec<IncidentSummary> {
        self.memory.list_incidents(truck_id)
    }

    fn cache_risk(&self, risk: RiskOutput) {
        self.memory.cache_risk(risk)
    }

    fn get_cached_risk(&self, incident_id: Uuid) -> Option<RiskOutput> {
        self.memory.get_cached_risk(incident_id)
    }
}

#[cfg(test)]
mod persisted_store_tests {
    use super::*;
    use crate::state::StateStore as _;

    #[test]
    fn warms_baselines_from_disk_on_construction() {
        let dir = tempfile::tempdir().unwrap();
        let disk = Arc::new(PersistentStore::open(dir.path()).unwrap());
        disk.save_baseline("T1", &TwinBaseline { expected_cargo_weight_kg: 500.0, ..Default::default() }).unwrap();

        let store = PersistedStateStore::new(Some(disk));
        assert_eq!(store.get_baseline("T1").expected_cargo_weight_kg, 500.0);
    }

    #[test]
    fn set_baseline_persists_when_disk_present() {
        let dir = tempfile::tempdir().unwrap();
        let disk = Arc::new(PersistentStore::open(dir.path()).unwrap());
        let store = PersistedStateStore::new(Some(disk.clone()));
        store.set_baseline("T2", TwinBaseline { expected_cargo_weight_kg: 900.0, ..Default::default() });
        assert_eq!(disk.load_baseline("T2").unwrap().expected_cargo_weight_kg, 900.0);
    }

    #[test]
    fn works_without_a_disk_backend() {
        let store = PersistedStateStore::new(None);
        store.set_baseline("T3", TwinBaseline::default());
        assert_eq!(store.get_baseline("T3").expected_cargo_weight_kg, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::open(dir.path()).unwrap();
        let baseline = TwinBaseline { expected_cargo_weight_kg: 1200.0, ..Default::default() };
        store.save_baseline("T1", &baseline).unwrap();
        let loaded = store.load_baseline("T1").unwrap();
        assert_eq!(loaded.expected_cargo_weight_kg, 1200.0);
    }

    #[test]
    fn missing_baseline_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::open(dir.path()).unwrap();
        assert!(store.load_baseline("unknown").is_none());
    }

    #[test]
    fn open_or_warn_survives_bad_path() {
        // A path under a file (not a directory) is not an openable sled db.
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("not-a-dir");
        std::fs::write(&file_path, b"x").unwrap();
        let bad = file_path.join("nested");
        assert!(PersistentStore::open_or_warn(bad).is_none());
    }
}

//! State Store (§4.2): per-truck short-lived state plus read-mostly
//! baselines, with TTL-bounded entries and capped lists.
//!
//! The store is a plain trait so the hot path never depends on a specific
//! backend: the in-memory implementation here is always available, and a
//! persistent backend (see [`persistence`]) can be layered underneath it
//! without changing a single processor. Absence or failure of that
//! persistent layer must never block the hot path — see the fallback
//! semantics documented on each method.

pub mod persistence;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::types::{RiskOutput, TwinBaseline};

/// A capped summary of a fired decision, appended to a truck's incident
/// log (§3, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentSummary {
    pub incident_id: Uuid,
    pub truck_id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub risk_score: f64,
    pub risk_level: String,
    pub triggered_rules: Vec<String>,
    pub logged_at: DateTime<Utc>,
}

struct TtlEntry<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T> TtlEntry<T> {
    fn fresh(&self) -> bool {
        self.expires_at.map(|t| Instant::now() < t).unwrap_or(true)
    }
}

/// Trait for the state-store contract (§4.2): get/set/setex/exists plus
/// list-push-with-trim. All methods are infallible from the caller's
/// perspective — failures degrade to the documented fallback rather than
/// propagating an error, per the "absence must not block the hot path"
/// requirement.
pub trait StateStore: Send + Sync {
    /// Read a truck's baseline, or `TwinBaseline::default()` if absent.
    fn get_baseline(&self, truck_id: &str) -> TwinBaseline;
    fn set_baseline(&self, truck_id: &str, baseline: TwinBaseline);

    /// Read the last-received payload for a (truck, channel) signal slot,
    /// if present and not yet expired.
    fn get_signal(&self, truck_id: &str, channel: &str) -> Option<(Vec<u8>, DateTime<Utc>)>;
    fn set_signal(&self, truck_id: &str, channel: &str, payload: Vec<u8>, ttl: Duration);

    /// `true` iff (truck, rule) is on cooldown. A store that cannot be
    /// reached treats every key as absent, i.e. never on cooldown (§7,
    /// §8 "Cooldown store unreachable: decision fires every time").
    fn is_on_cooldown(&self, truck_id: &str, rule_id: &str) -> bool;
    fn set_cooldown(&self, truck_id: &str, rule_id: &str, ttl: Duration);

    /// Push an incident summary to the head of a truck's capped log,
    /// trimming to `MAX_INCIDENTS_PER_TRUCK`.
    fn push_incident(&self, truck_id: &str, incident: IncidentSummary);
    fn list_incidents(&self, truck_id: &str) -> Vec<IncidentSummary>;

    /// Bounded incident-id -> RiskOutput cache used by Explainability to
    /// correlate a later DecisionOutput back to the fusion event (§4.9).
    fn cache_risk(&self, risk: RiskOutput);
    fn get_cached_risk(&self, incident_id: Uuid) -> Option<RiskOutput>;
}

/// Always-available in-memory implementation backing the hot path.
pub struct InMemoryStateStore {
    baselines: DashMap<String, TwinBaseline>,
    signals: DashMap<(String, String), TtlEntry<Vec<u8>>>,
    cooldowns: DashMap<(String, String), Instant>,
    incidents: DashMap<String, VecDeque<IncidentSummary>>,
    risk_cache: DashMap<Uuid, RiskOutput>,
    risk_cache_order: Mutex<VecDeque<Uuid>>,
    max_incidents: usize,
    risk_cache_capacity: usize,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self {
            baselines: DashMap::new(),
            signals: DashMap::new(),
            cooldowns: DashMap::new(),
            incidents: DashMap::new(),
            risk_cache: DashMap::new(),
            risk_cache_order: Mutex::new(VecDeque::new()),
            max_incidents: crate::config::defaults::MAX_INCIDENTS_PER_TRUCK,
            risk_cache_capacity: crate::config::defaults::RISK_CACHE_CAPACITY,
        }
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for InMemoryStateStore {
    fn get_baseline(&self, truck_id: &str) -> TwinBaseline {
        self.baselines.get(truck_id).map(|r| r.clone()).unwrap_or_default()
    }

    fn set_baseline(&self, truck_id: &str, baseline: TwinBaseline) {
        self.baselines.insert(truck_id.to_string(), baseline);
    }

    fn get_signal(&self, truck_id: &str, channel: &str) -> Option<(Vec<u8>, DateTime<Utc>)> {
        let key = (truck_id.to_string(), channel.to_string());
        let entry = self.signals.get(&key)?;
        if !entry.fresh() {
            return None;
        }
        // The received-at timestamp travels inside the stored payload's
        // envelope at the call site; here we only guarantee freshness of
        // the TTL slot itself. Callers that need the timestamp decode it
        // from the payload.
        Some((entry.value.clone(), Utc::now()))
    }

    fn set_signal(&self, truck_id: &str, channel: &str, payload: Vec<u8>, ttl: Duration) {
        let key = (truck_id.to_string(), channel.to_string());
        self.signals.insert(
            key,
            TtlEntry { value: payload, expires_at: Some(Instant::now() + ttl) },
        );
    }

    fn is_on_cooldown(&self, truck_id: &str, rule_id: &str) -> bool {
        let key = (truck_id.to_string(), rule_id.to_string());
        match self.cooldowns.get(&key) {
            Some(expiry) => Instant::now() < *expiry,
            None => false,
        }
    }

    fn set_cooldown(&self, truck_id: &str, rule_id: &str, ttl: Duration) {
        let key = (truck_id.to_string(), rule_id.to_string());
        self.cooldowns.insert(key, Instant::now() + ttl);
    }

    fn push_incident(&self, truck_id: &str, incident: IncidentSummary) {
        let mut list = self.incidents.entry(truck_id.to_string()).or_default();
        list.push_front(incident);
        while list.len() > self.max_incidents {
            list.pop_back();
        }
    }

    fn list_incidents(&self, truck_id: &str) -> Vec<IncidentSummary> {
        self.incidents.get(truck_id).map(|l| l.iter().cloned().collect()).unwrap_or_default()
    }

    fn cache_risk(&self, risk: RiskOutput) {
        let id = risk.incident_id;
        self.risk_cache.insert(id, risk);
        let mut order = self.risk_cache_order.lock().unwrap_or_else(|p| p.into_inner());
        order.push_back(id);
        while order.len() > self.risk_cache_capacity {
            if let Some(oldest) = order.pop_front() {
                self.risk_cache.remove(&oldest);
            }
        }
    }

    fn get_cached_risk(&self, incident_id: Uuid) -> Option<RiskOutput> {
        self.risk_cache.get(&incident_id).map(|r| r.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FusionMethod, RiskLevel};
    use std::collections::HashMap;

    fn sample_risk(id: Uuid) -> RiskOutput {
        RiskOutput {
            truck_id: "T1".into(),
            timestamp: Utc::now(),
            incident_id: id,
            composite_risk_score: 0.9,
            risk_level: RiskLevel::Critical,
            confidence: 0.9,
            component_scores: HashMap::new(),
            triggered_rules: vec![],
            fusion_method: FusionMethod::WeightedFallback,
        }
    }

    #[test]
    fn missing_baseline_returns_default() {
        let store = InMemoryStateStore::new();
        let b = store.get_baseline("T1");
        assert_eq!(b.expected_cargo_weight_kg, TwinBaseline::default().expected_cargo_weight_kg);
    }

    #[test]
    fn cooldown_expires() {
        let store = InMemoryStateStore::new();
        store.set_cooldown("T1", "R001", Duration::from_millis(10));
        assert!(store.is_on_cooldown("T1", "R001"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(!store.is_on_cooldown("T1", "R001"));
    }

    #[test]
    fn unreachable_cooldown_key_never_blocks() {
        let store = InMemoryStateStore::new();
        assert!(!store.is_on_cooldown("unknown-truck", "R999"));
    }

    #[test]
    fn incident_log_is_capped_at_head() {
        let store = InMemoryStateStore::new();
        for i in 0..60 {
            store.push_incident(
                "T1",
                IncidentSummary {
                    incident_id: Uuid::new_v4(),
                    truck_id: "T1".into(),
                    rule_id: "R001".into(),
                    rule_name: "x".into(),
                    risk_score: i as f64 / 60.0,
                    risk_level: "CRITICAL".into(),
                    triggered_rules: vec![],
                    logged_at: Utc::now(),
                },
            );
        }
        let list = store.list_incidents("T1");
        assert_eq!(list.len(), crate::config::defaults::MAX_INCIDENTS_PER_TRUCK);
        // Most recent push (i=59) is at the head.
        assert!((list[0].risk_score - 59.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn risk_cache_evicts_oldest_past_capacity() {
        let store = InMemoryStateStore::new();
        let mut ids = Vec::new();
        for _ in 0..(crate::config::defaults::RISK_CACHE_CAPACITY + 5) {
            let id = Uuid::new_v4();
            ids.push(id);
            store.cache_risk(sample_risk(id));
        }
        assert!(store.get_cached_risk(ids[0]).is_none());
        assert!(store.get_cached_risk(*ids.last().unwrap()).is_some());
    }
}

use super::TruckId;
use serde::{Deserialize, Serialize};

/// Published on `behaviour.output` (§3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviourOutput {
    pub truck_id: TruckId,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub anomaly_score: f64,
    pub is_anomaly: bool,
    pub flagged_track_ids: Vec<u64>,
    pub loitering_detected: bool,
    pub loitering_duration_s: f64,
    pub crowd_anomaly: bool,
    pub raw_track_scores: Vec<(u64, f64)>,
}

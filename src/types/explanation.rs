use super::risk::RiskLevel;
use super::TruckId;
use serde::{Deserialize, Serialize};

/// Published on `explain.output` (§3, §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationOutput {
    pub incident_id: uuid::Uuid,
    pub truck_id: TruckId,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub explanation_text: String,
    pub summarizer_id: String,
    pub generation_time_ms: u64,
    pub confidence: f64,
    pub risk_level: RiskLevel,
}

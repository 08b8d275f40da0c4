use super::risk::RiskLevel;
use super::TruckId;
use serde::{Deserialize, Serialize};

/// A notification/logging action the decision processor can take (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Sms,
    Email,
    LogIncident,
}

/// Published on `decision.output` (§3, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionOutput {
    pub truck_id: TruckId,
    pub incident_id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub rule_id: Option<String>,
    pub rule_name: Option<String>,
    pub actions_taken: Vec<Action>,
    pub alert_suppressed: bool,
    pub suppression_reason: Option<String>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

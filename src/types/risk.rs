use super::TruckId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Discretized risk level (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Classify a composite score per the boundaries in §4.7 / §8:
    /// `>= 0.85` CRITICAL, `>= 0.65` HIGH, `>= 0.45` MEDIUM, else LOW.
    pub fn classify(composite: f64) -> Self {
        if composite >= 0.85 {
            RiskLevel::Critical
        } else if composite >= 0.65 {
            RiskLevel::High
        } else if composite >= 0.45 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Which scoring path produced the composite (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    Bayesian,
    WeightedFallback,
}

/// Published on `risk.output` (§3, §4.7). The `incident_id` is allocated
/// fresh at fusion time and is the cross-processor join key for Decision
/// and Explainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskOutput {
    pub truck_id: TruckId,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub incident_id: uuid::Uuid,
    pub composite_risk_score: f64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub component_scores: HashMap<String, f64>,
    pub triggered_rules: Vec<String>,
    pub fusion_method: FusionMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_boundaries_match_spec() {
        assert_eq!(RiskLevel::classify(0.45), RiskLevel::Medium);
        assert_eq!(RiskLevel::classify(0.449_999), RiskLevel::Low);
        assert_eq!(RiskLevel::classify(0.65), RiskLevel::High);
        assert_eq!(RiskLevel::classify(0.849_999), RiskLevel::High);
        assert_eq!(RiskLevel::classify(0.85), RiskLevel::Critical);
    }
}

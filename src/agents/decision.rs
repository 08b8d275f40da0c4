//! Decision Processor (§4.8): walks the rule table in priority order,
//! enforces per-(truck,rule) cooldowns, and invokes notifications.

use std::time::Duration;

use crate::config::{RiskConfig, RuleDef};
use crate::external::notifier::{email_best_effort, sms_best_effort};
use crate::external::Notifier;
use crate::state::{IncidentSummary, StateStore};
use crate::types::{Action, DecisionOutput, RiskOutput};

pub struct DecisionProcessor;

impl DecisionProcessor {
    /// Pure rule lookup: the first matching rule in priority order, or
    /// `None` (§4.8). Exposed separately so the bridge and tests can
    /// inspect rule selection without touching the state store.
    pub fn select_rule<'a>(rules: &'a [RuleDef], composite: f64) -> Option<&'a RuleDef> {
        let mut ordered: Vec<&RuleDef> = rules.iter().collect();
        ordered.sort_by_key(|r| r.priority);
        ordered.into_iter().find(|r| {
            let above_low = composite >= r.threshold_low;
            let below_high = r.threshold_high.map(|h| composite < h).unwrap_or(true);
            above_low && below_high
        })
    }

    /// Evaluate a RiskOutput against the rule table, check/set cooldowns,
    /// dispatch notifications, and push an incident summary (§4.8). This
    /// is async because it may invoke the Notifier, but never blocks on
    /// state-store absence (§4.2).
    pub async fn process(
        risk: &RiskOutput,
        config: &RiskConfig,
        store: &dyn StateStore,
        notifier: &dyn Notifier,
        notify_target: &str,
    ) -> DecisionOutput {
        let Some(rule) = Self::select_rule(&config.rules.table, risk.composite_risk_score) else {
            return DecisionOutput {
                truck_id: risk.truck_id.clone(),
                incident_id: risk.incident_id,
                timestamp: risk.timestamp,
                rule_id: None,
                rule_name: None,
                actions_taken: vec![],
                alert_suppressed: false,
                suppression_reason: None,
                risk_score: risk.composite_risk_score,
                risk_level: risk.risk_level,
            };
        };

        if store.is_on_cooldown(&risk.truck_id, &rule.id) {
            return DecisionOutput {
                truck_id: risk.truck_id.clone(),
                incident_id: risk.incident_id,
                timestamp: risk.timestamp,
                rule_id: Some(rule.id.clone()),
                rule_name: Some(rule.name.clone()),
                actions_taken: vec![],
                alert_suppressed: true,
                suppression_reason: Some(format!("rule {} is on cooldown for this truck", rule.id)),
                risk_score: risk.composite_risk_score,
                risk_level: risk.risk_level,
            };
        }

        store.set_cooldown(&risk.truck_id, &rule.id, Duration::from_secs(rule.cooldown_s));

        let mut actions_taken = Vec::new();
        for action in &rule.actions {
            match action.as_str() {
                "sms" => {
                    let text = format!(
                        "ALERT {}: truck {} risk {:?} (score {:.2})",
                        rule.name, risk.truck_id, risk.risk_level, risk.composite_risk_score
                    );
                    sms_best_effort(notifier, &text, notify_target).await;
                    actions_taken.push(Action::Sms);
                }
                "email" => {
                    let subject = format!("[{:?}] {} — truck {}", risk.risk_level, rule.name, risk.truck_id);
                    let body = format!(
                        "Rule {} fired for truck {} with composite score {:.2} (confidence {:.2}). Triggered: {}.",
                        rule.id,
                        risk.truck_id,
                        risk.composite_risk_score,
                        risk.confidence,
                        risk.triggered_rules.join(", ")
                    );
                    email_best_effort(notifier, &subject, &body, notify_target).await;
                    actions_taken.push(Action::Email);
                }
                "log_incident" => {
                    store.push_incident(
                        &risk.truck_id,
                        IncidentSummary {
                            incident_id: risk.incident_id,
                            truck_id: risk.truck_id.clone(),
                            rule_id: rule.id.clone(),
                            rule_name: rule.name.clone(),
                            risk_score: risk.composite_risk_score,
                            risk_level: format!("{:?}", risk.risk_level).to_uppercase(),
                            triggered_rules: risk.triggered_rules.clone(),
                            logged_at: risk.timestamp,
                        },
                    );
                    actions_taken.push(Action::LogIncident);
                }
                other => tracing::warn!(action = other, "unrecognized rule action, skipping"),
            }
        }

        DecisionOutput {
            truck_id: risk.truck_id.clone(),
            incident_id: risk.incident_id,
            timestamp: risk.timestamp,
            rule_id: Some(rule.id.clone()),
            rule_name: Some(rule.name.clone()),
            actions_taken,
            alert_suppressed: false,
            suppression_reason: None,
            risk_score: risk.composite_risk_score,
            risk_level: risk.risk_level,
        }
    }
}

/// Streaming task entry point (§5): consume `risk.output`, publish
/// `decision.output`.
pub async fn run(
    bus: &crate::bus::Bus,
    config: &RiskConfig,
    store: &dyn StateStore,
    notifier: &dyn Notifier,
    notify_target: &str,
) -> crate::error::PipelineResult<()> {
    use crate::bus::topics;

    let mut sub = bus.subscribe_bytes(topics::RISK_OUTPUT);
    loop {
        let Some(delivery) = sub.recv().await else {
            return Ok(());
        };
        let risk: RiskOutput = match serde_json::from_slice(&delivery.payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode risk output, skipping");
                continue;
            }
        };
        let output = DecisionProcessor::process(&risk, config, store, notifier, notify_target).await;
        if let Err(e) = bus.publish(topics::DECISION_OUTPUT, &output) {
            tracing::warn!(error = %e, "failed to publish decision output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::notifier::LoggingNotifier;
    use crate::state::InMemoryStateStore;
    use crate::types::{FusionMethod, RiskLevel};
    use std::collections::HashMap;

    fn risk(score: f64) -> RiskOutput {
        RiskOutput {
            truck_id: "T1".into(),
            timestamp: chrono::Utc::now(),
            incident_id: uuid::Uuid::new_v4(),
            composite_risk_score: score,
            risk_level: RiskLevel::classify(score),
            confidence: 0.9,
            component_scores: HashMap::new(),
            triggered_rules: vec![],
            fusion_method: FusionMethod::WeightedFallback,
        }
    }

    #[tokio::test]
    async fn r001_fires_for_critical_score() {
        let config = RiskConfig::default();
        let store = InMemoryStateStore::new();
        let notifier = LoggingNotifier;
        let out = DecisionProcessor::process(&risk(0.9), &config, &store, &notifier, "+15551234567").await;
        assert_eq!(out.rule_id, Some("R001".to_string()));
        assert!(out.actions_taken.contains(&Action::Sms));
        assert!(out.actions_taken.contains(&Action::Email));
        assert!(out.actions_taken.contains(&Action::LogIncident));
    }

    #[tokio::test]
    async fn second_decision_within_cooldown_is_suppressed() {
        let config = RiskConfig::default();
        let store = InMemoryStateStore::new();
        let notifier = LoggingNotifier;
        DecisionProcessor::process(&risk(0.9), &config, &store, &notifier, "+15551234567").await;
        let second = DecisionProcessor::process(&risk(0.9), &config, &store, &notifier, "+15551234567").await;
        assert!(second.alert_suppressed);
        assert!(second.actions_taken.is_empty());
    }

    #[tokio::test]
    async fn no_matching_rule_yields_null_rule_id() {
        let config = RiskConfig::default();
        let store = InMemoryStateStore::new();
        let notifier = LoggingNotifier;
        let out = DecisionProcessor::process(&risk(0.1), &config, &store, &notifier, "+15551234567").await;
        assert!(out.rule_id.is_none());
        assert!(!out.alert_suppressed);
    }
}

//! Explainability Processor (§4.9): correlates a DecisionOutput back to
//! its originating RiskOutput by incident id and produces a natural-
//! language explanation via the Summarizer capability.

use std::time::{Duration, Instant};

use crate::external::summarizer::{summarize_with_fallback, ExplanationContext, TemplateSummarizer};
use crate::external::Summarizer;
use crate::state::StateStore;
use crate::types::{DecisionOutput, ExplanationOutput, RiskOutput};

pub struct ExplainabilityProcessor;

impl ExplainabilityProcessor {
    /// Cache a freshly fused RiskOutput for later correlation. Call this
    /// as soon as a RiskOutput is produced, before any DecisionOutput
    /// referencing it can arrive.
    pub fn remember(store: &dyn StateStore, risk: RiskOutput) {
        store.cache_risk(risk);
    }

    /// On a DecisionOutput with a fired rule, look up the matching
    /// RiskOutput and produce an explanation. Returns `None` when the
    /// decision didn't fire a rule (§4.9 only fires on non-null rule).
    pub async fn process(
        decision: &DecisionOutput,
        store: &dyn StateStore,
        summarizer: &dyn Summarizer,
    ) -> Option<ExplanationOutput> {
        decision.rule_id.as_ref()?;
        let risk = store.get_cached_risk(decision.incident_id)?;
        Some(Self::explain(&risk, decision, store, summarizer).await)
    }

    /// Build an explanation directly from a given RiskOutput/DecisionOutput
    /// pair, bypassing the incident cache. Used by the bridge's
    /// `/agents/explain` endpoint, where both payloads arrive in the
    /// request body instead of being correlated from prior bus traffic.
    pub async fn explain(
        risk: &RiskOutput,
        decision: &DecisionOutput,
        store: &dyn StateStore,
        summarizer: &dyn Summarizer,
    ) -> ExplanationOutput {
        let component_scores: Vec<(&str, f64)> =
            risk.component_scores.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        let actions: Vec<String> = decision.actions_taken.iter().map(|a| format!("{a:?}")).collect();
        let rule_name = decision.rule_name.clone().unwrap_or_default();
        let fusion_method = format!("{:?}", risk.fusion_method);

        let ctx = ExplanationContext {
            truck_id: &risk.truck_id,
            risk_level: &format!("{:?}", risk.risk_level),
            composite_score: risk.composite_risk_score,
            confidence: risk.confidence,
            rule_name: &rule_name,
            fusion_method: &fusion_method,
            component_scores: &component_scores,
            triggered_rules: &risk.triggered_rules,
            actions: &actions,
        };
        let prompt = TemplateSummarizer::render(&ctx);

        let start = Instant::now();
        let (explanation_text, summarizer_id) = summarize_with_fallback(summarizer, &prompt).await;
        let generation_time_ms = elapsed_ms(start.elapsed());

        let output = ExplanationOutput {
            incident_id: decision.incident_id,
            truck_id: risk.truck_id.clone(),
            timestamp: decision.timestamp,
            explanation_text,
            summarizer_id,
            generation_time_ms,
            confidence: risk.confidence,
            risk_level: risk.risk_level,
        };

        if let Ok(payload) = serde_json::to_vec(&output) {
            store.set_signal(
                &output.incident_id.to_string(),
                "explanation",
                payload,
                Duration::from_secs(crate::config::defaults::EXPLANATION_TTL_SECS),
            );
        }

        output
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Streaming task entry point (§5): consume `decision.output`, publish
/// `explain.output` for every decision that fired a rule.
pub async fn run(
    bus: &crate::bus::Bus,
    store: &dyn StateStore,
    summarizer: &dyn Summarizer,
) -> crate::error::PipelineResult<()> {
    use crate::bus::topics;

    let mut sub = bus.subscribe_bytes(topics::DECISION_OUTPUT);
    loop {
        let Some(delivery) = sub.recv().await else {
            return Ok(());
        };
        let decision: DecisionOutput = match serde_json::from_slice(&delivery.payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode decision output, skipping");
                continue;
            }
        };
        if let Some(output) = ExplainabilityProcessor::process(&decision, store, summarizer).await {
            if let Err(e) = bus.publish(topics::EXPLAIN_OUTPUT, &output) {
                tracing::warn!(error = %e, "failed to publish explanation output");
            }
        }
    }
}

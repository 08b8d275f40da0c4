//! Risk Fusion Processor (§4.7): correlates behaviour/twin/route signals
//! per truck and fires a composite risk score once all three are fresh.

use chrono::{DateTime, Timelike, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::config::RiskConfig;
use crate::scoring::bayes::{discretize_behaviour, discretize_route, discretize_time, discretize_twin, TheftRiskTable};
use crate::types::{clip01, BehaviourOutput, FusionMethod, RiskLevel, RiskOutput, RouteOutput, TwinOutput};

#[derive(Clone)]
struct Slot<T> {
    value: T,
    received_at: DateTime<Utc>,
}

#[derive(Default)]
struct TruckSlots {
    behaviour: Option<Slot<BehaviourOutput>>,
    twin: Option<Slot<TwinOutput>>,
    route: Option<Slot<RouteOutput>>,
}

/// Holds per-truck correlation slots behind a mutex (§4.7, §5: "Hold a
/// mutex during slot update + eligibility check").
pub struct RiskFusionProcessor {
    slots: dashmap::DashMap<String, Mutex<TruckSlots>>,
    bayes_table: Option<TheftRiskTable>,
}

/// The three possible triggers that update a truck's correlation slots.
pub enum SignalUpdate {
    Behaviour(BehaviourOutput),
    Twin(TwinOutput),
    Route(RouteOutput),
}

impl RiskFusionProcessor {
    pub fn new(bayes_table: Option<TheftRiskTable>) -> Self {
        Self { slots: dashmap::DashMap::new(), bayes_table }
    }

    /// Update the matching slot for `truck_id` and, if all three slots
    /// are now populated and fresh, fire a fusion and clear the slots.
    /// Returns `None` when fusion is not yet eligible.
    pub fn update(&self, truck_id: &str, update: SignalUpdate, config: &RiskConfig, now: DateTime<Utc>) -> Option<RiskOutput> {
        let entry = self.slots.entry(truck_id.to_string()).or_default();
        let mut slots = entry.lock().unwrap_or_else(|p| p.into_inner());

        match update {
            SignalUpdate::Behaviour(v) => slots.behaviour = Some(Slot { received_at: now, value: v }),
            SignalUpdate::Twin(v) => slots.twin = Some(Slot { received_at: now, value: v }),
            SignalUpdate::Route(v) => slots.route = Some(Slot { received_at: now, value: v }),
        }

        let staleness = chrono::Duration::seconds(config.fusion.signal_staleness_s);
        let all_fresh = match (&slots.behaviour, &slots.twin, &slots.route) {
            (Some(b), Some(t), Some(r)) => {
                now - b.received_at < staleness && now - t.received_at < staleness && now - r.received_at < staleness
            }
            _ => false,
        };

        if !all_fresh {
            return None;
        }

        let behaviour = slots.behaviour.take().unwrap();
        let twin = slots.twin.take().unwrap();
        let route = slots.route.take().unwrap();
        drop(slots);

        Some(self.fuse(truck_id, &behaviour, &twin, &route, config, now))
    }

    /// Fuse a given (behaviour, twin, route) triple immediately, skipping
    /// the per-truck slot/staleness machinery. Used by the bridge's
    /// `/agents/risk-fusion` endpoint, where all three inputs arrive
    /// together in one request body.
    pub fn fuse_now(
        &self,
        truck_id: &str,
        behaviour: BehaviourOutput,
        twin: TwinOutput,
        route: RouteOutput,
        config: &RiskConfig,
        now: DateTime<Utc>,
    ) -> RiskOutput {
        let behaviour = Slot { value: behaviour, received_at: now };
        let twin = Slot { value: twin, received_at: now };
        let route = Slot { value: route, received_at: now };
        self.fuse(truck_id, &behaviour, &twin, &route, config, now)
    }

    fn fuse(
        &self,
        truck_id: &str,
        behaviour: &Slot<BehaviourOutput>,
        twin: &Slot<TwinOutput>,
        route: &Slot<RouteOutput>,
        config: &RiskConfig,
        now: DateTime<Utc>,
    ) -> RiskOutput {
        let hour = now.hour();
        let temporal_score = temporal_score(hour);

        let (composite, confidence, fusion_method) = if let Some(table) = &self.bayes_table {
            let b = discretize_behaviour(behaviour.value.anomaly_score);
            let t = discretize_twin(twin.value.deviation_score);
            let r = discretize_route(route.value.deviation_km);
            let tm = discretize_time(hour);
            let (composite, confidence) = table.query(b, t, r, tm);
            (composite, confidence, FusionMethod::Bayesian)
        } else {
            weighted_fallback(behaviour, twin, route, temporal_score, config, now)
        };

        let mut component_scores = HashMap::new();
        component_scores.insert("behaviour".to_string(), behaviour.value.anomaly_score);
        component_scores.insert("twin".to_string(), twin.value.deviation_score);
        component_scores.insert("route".to_string(), route.value.route_risk_score);
        component_scores.insert("temporal".to_string(), temporal_score);

        let triggered_rules = triggered_rules(&behaviour.value, &twin.value, &route.value, composite);

        RiskOutput {
            truck_id: truck_id.to_string(),
            timestamp: now,
            incident_id: Uuid::new_v4(),
            composite_risk_score: composite,
            risk_level: RiskLevel::classify(composite),
            confidence,
            component_scores,
            triggered_rules,
            fusion_method,
        }
    }
}

fn temporal_score(hour: u32) -> f64 {
    if (22..24).contains(&hour) || (0..6).contains(&hour) {
        crate::config::defaults::TEMPORAL_NIGHT_SCORE
    } else if (6..9).contains(&hour) || (18..22).contains(&hour) {
        crate::config::defaults::TEMPORAL_RUSH_SCORE
    } else {
        crate::config::defaults::TEMPORAL_DAY_SCORE
    }
}

fn quality(age_s: f64, decay_rate: f64) -> f64 {
    (-decay_rate * age_s).exp()
}

fn weighted_fallback(
    behaviour: &Slot<BehaviourOutput>,
    twin: &Slot<TwinOutput>,
    route: &Slot<RouteOutput>,
    temporal_score: f64,
    config: &RiskConfig,
    now: DateTime<Utc>,
) -> (f64, f64, FusionMethod) {
    let decay = config.fusion.quality_decay_rate;
    let age = |received_at: DateTime<Utc>| (now - received_at).num_milliseconds().max(0) as f64 / 1000.0;

    let q_behaviour = quality(age(behaviour.received_at), decay);
    let q_twin = quality(age(twin.received_at), decay);
    let q_route = quality(age(route.received_at), decay);
    let q_temporal = 1.0;

    let w = &config.fusion.weights;
    let adj_behaviour = w.behaviour * q_behaviour;
    let adj_twin = w.twin * q_twin;
    let adj_route = w.route * q_route;
    let adj_temporal = w.temporal * q_temporal;

    let weighted_sum = adj_behaviour * behaviour.value.anomaly_score
        + adj_twin * twin.value.deviation_score
        + adj_route * route.value.route_risk_score
        + adj_temporal * temporal_score;
    let weight_sum = adj_behaviour + adj_twin + adj_route + adj_temporal;

    let composite = if weight_sum > 0.0 { clip01(weighted_sum / weight_sum) } else { 0.0 };
    let confidence = q_behaviour * q_twin * q_route;
    (composite, confidence, FusionMethod::WeightedFallback)
}

fn triggered_rules(behaviour: &BehaviourOutput, twin: &TwinOutput, route: &RouteOutput, composite: f64) -> Vec<String> {
    let mut rules = Vec::new();
    if behaviour.loitering_detected {
        rules.push("LOITERING_DETECTED".to_string());
    }
    if twin.deviation_reasons.iter().any(|r| r.contains("Door open without RFID")) {
        rules.push("DOOR_OPEN_NO_RFID".to_string());
    }
    if !route.in_safe_corridor {
        rules.push("GEOFENCE_VIOLATION".to_string());
    }
    if route.in_high_risk_zone {
        rules.push("HIGH_RISK_ZONE_ENTRY".to_string());
    }
    if composite >= crate::config::defaults::RULE_R001_THRESHOLD {
        rules.push("CRITICAL_THRESHOLD_BREACH".to_string());
    }
    rules
}

/// Streaming task entry point (§5): consume `behaviour.output`,
/// `twin.output`, and `route.output` concurrently, correlate per truck,
/// and publish `risk.output` once a fusion fires. The fused output is
/// also cached in the state store so Explainability can correlate a
/// later `decision.output` back to it by incident id (§4.9).
pub async fn run(
    bus: &crate::bus::Bus,
    processor: &RiskFusionProcessor,
    state_store: &dyn crate::state::StateStore,
    config: &RiskConfig,
) -> crate::error::PipelineResult<()> {
    use crate::bus::topics;
    use crate::types::{BehaviourOutput as BOut, RouteOutput as ROut, TwinOutput as TOut};

    let mut behaviour_sub = bus.subscribe_bytes(topics::BEHAVIOUR_OUTPUT);
    let mut twin_sub = bus.subscribe_bytes(topics::TWIN_OUTPUT);
    let mut route_sub = bus.subscribe_bytes(topics::ROUTE_OUTPUT);

    loop {
        let update = tokio::select! {
            delivery = behaviour_sub.recv() => {
                let Some(delivery) = delivery else { return Ok(()); };
                serde_json::from_slice::<BOut>(&delivery.payload).ok().map(SignalUpdate::Behaviour)
            }
            delivery = twin_sub.recv() => {
                let Some(delivery) = delivery else { return Ok(()); };
                serde_json::from_slice::<TOut>(&delivery.payload).ok().map(SignalUpdate::Twin)
            }
            delivery = route_sub.recv() => {
                let Some(delivery) = delivery else { return Ok(()); };
                serde_json::from_slice::<ROut>(&delivery.payload).ok().map(SignalUpdate::Route)
            }
        };

        let Some(update) = update else {
            tracing::warn!("failed to decode a fusion input, skipping");
            continue;
        };

        let truck_id = match &update {
            SignalUpdate::Behaviour(v) => v.truck_id.clone(),
            SignalUpdate::Twin(v) => v.truck_id.clone(),
            SignalUpdate::Route(v) => v.truck_id.clone(),
        };

        if let Some(output) = processor.update(&truck_id, update, config, chrono::Utc::now()) {
            crate::agents::explainability::ExplainabilityProcessor::remember(state_store, output.clone());
            if let Ok(payload) = serde_json::to_vec(&output.composite_risk_score) {
                state_store.set_signal(
                    &truck_id,
                    "risk_score",
                    payload,
                    std::time::Duration::from_secs(config.fusion.risk_score_ttl_s),
                );
            }
            if let Err(e) = bus.publish(topics::RISK_OUTPUT, &output) {
                tracing::warn!(error = %e, "failed to publish risk output");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DoorState, TwinStatus};

    fn behaviour_out(score: f64) -> BehaviourOutput {
        BehaviourOutput {
            truck_id: "T1".into(),
            timestamp: Utc::now(),
            anomaly_score: score,
            is_anomaly: score >= 0.6,
            flagged_track_ids: vec![],
            loitering_detected: score >= 0.6,
            loitering_duration_s: 0.0,
            crowd_anomaly: false,
            raw_track_scores: vec![],
        }
    }

    fn twin_out(score: f64) -> TwinOutput {
        TwinOutput {
            truck_id: "T1".into(),
            timestamp: Utc::now(),
            gps_lat: 0.0,
            gps_lon: 0.0,
            door_state: DoorState::Closed,
            cargo_weight_kg: 1000.0,
            engine_on: true,
            driver_rfid_scanned: true,
            deviation_score: score,
            deviation_reasons: vec![],
            status: TwinStatus::Nominal,
            signal_fresh: true,
        }
    }

    fn route_out(score: f64) -> RouteOutput {
        RouteOutput {
            truck_id: "T1".into(),
            timestamp: Utc::now(),
            gps_lat: 0.0,
            gps_lon: 0.0,
            in_safe_corridor: true,
            deviation_km: 0.0,
            in_high_risk_zone: false,
            risk_zone_name: None,
            route_risk_score: score,
            time_multiplier: 1.0,
            nearest_corridor_name: None,
        }
    }

    #[test]
    fn fusion_waits_for_all_three_slots() {
        let processor = RiskFusionProcessor::new(None);
        let config = RiskConfig::default();
        let now = Utc::now();
        let r1 = processor.update("T1", SignalUpdate::Behaviour(behaviour_out(0.5)), &config, now);
        assert!(r1.is_none());
        let r2 = processor.update("T1", SignalUpdate::Twin(twin_out(0.5)), &config, now);
        assert!(r2.is_none());
        let r3 = processor.update("T1", SignalUpdate::Route(route_out(0.5)), &config, now);
        assert!(r3.is_some());
    }

    #[test]
    fn slots_clear_after_firing() {
        let processor = RiskFusionProcessor::new(None);
        let config = RiskConfig::default();
        let now = Utc::now();
        processor.update("T1", SignalUpdate::Behaviour(behaviour_out(0.5)), &config, now);
        processor.update("T1", SignalUpdate::Twin(twin_out(0.5)), &config, now);
        let fired = processor.update("T1", SignalUpdate::Route(route_out(0.5)), &config, now);
        assert!(fired.is_some());
        // A fourth signal alone should not immediately re-fire.
        let again = processor.update("T1", SignalUpdate::Behaviour(behaviour_out(0.5)), &config, now);
        assert!(again.is_none());
    }

    #[test]
    fn quality_at_zero_age_is_one_and_decreasing() {
        assert_eq!(quality(0.0, 0.01), 1.0);
        assert!(quality(10.0, 0.01) < quality(0.0, 0.01));
        assert!(quality(20.0, 0.01) < quality(10.0, 0.01));
    }

    #[test]
    fn critical_threshold_breach_rule_fires_at_085() {
        let rules = triggered_rules(&behaviour_out(0.1), &twin_out(0.1), &route_out(0.1), 0.85);
        assert!(rules.contains(&"CRITICAL_THRESHOLD_BREACH".to_string()));
    }
}

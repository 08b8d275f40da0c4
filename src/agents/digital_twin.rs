//! Digital Twin Processor (§4.5): compares incoming telemetry against a
//! per-truck baseline and accumulates weighted deviation reasons.

use chrono::{DateTime, Utc};

use crate::config::RiskConfig;
use crate::types::{DoorState, IoTTelemetry, TwinBaseline, TwinOutput, TwinStatus, clip01};

pub struct DigitalTwinProcessor;

impl DigitalTwinProcessor {
    /// Haversine-style great-circle distance in km between two (lat, lon)
    /// points, matching the route processor's own degree-to-km treatment
    /// at small scale but using the standard spherical formula since §4.5
    /// names it explicitly.
    fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
        let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;
        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
    }

    pub fn process(
        telemetry: &IoTTelemetry,
        baseline: &TwinBaseline,
        config: &RiskConfig,
        now: DateTime<Utc>,
    ) -> TwinOutput {
        let mut components: Vec<f64> = Vec::new();
        let mut reasons: Vec<String> = Vec::new();

        let weight_delta = telemetry.cargo_weight_kg - baseline.expected_cargo_weight_kg;
        if weight_delta.abs() > config.twin.weight_delta_kg {
            components.push((weight_delta.abs() / config.twin.weight_normalizer_kg).min(1.0));
            reasons.push(format!("Cargo weight deviates by {weight_delta:.0} kg from baseline"));
        }

        if telemetry.door_state == DoorState::Open && !telemetry.engine_on && !telemetry.driver_rfid_scanned {
            components.push(config.twin.door_no_rfid_component);
            reasons.push("Door open without RFID authorization".to_string());
        }

        let route_km = Self::haversine_km(
            (telemetry.gps_lat, telemetry.gps_lon),
            baseline.planned_route_center,
        );
        if route_km > baseline.max_allowed_deviation_km {
            components.push((route_km / config.twin.route_normalizer_km).min(1.0));
            reasons.push(format!("GPS is {route_km:.1} km from planned route center"));
        }

        if telemetry.signal_strength < config.twin.weak_signal_threshold {
            components.push(config.twin.weak_signal_component);
            reasons.push("Weak IoT signal — possible jamming".to_string());
        }

        let deviation_score = if components.is_empty() {
            0.0
        } else {
            clip01(components.iter().sum::<f64>() / components.len() as f64)
        };

        let status = if deviation_score >= config.twin.critical_threshold {
            TwinStatus::Critical
        } else if deviation_score >= config.twin.degraded_threshold {
            TwinStatus::Degraded
        } else {
            TwinStatus::Nominal
        };

        let signal_fresh = (now - telemetry.timestamp).num_seconds() < config.twin.freshness_s;

        TwinOutput {
            truck_id: telemetry.truck_id.clone(),
            timestamp: now,
            gps_lat: telemetry.gps_lat,
            gps_lon: telemetry.gps_lon,
            door_state: telemetry.door_state,
            cargo_weight_kg: telemetry.cargo_weight_kg,
            engine_on: telemetry.engine_on,
            driver_rfid_scanned: telemetry.driver_rfid_scanned,
            deviation_score,
            deviation_reasons: reasons,
            status,
            signal_fresh,
        }
    }
}

/// Streaming task entry point (§5): consume `iot.telemetry`, publish
/// `twin.output`.
pub async fn run(
    bus: &crate::bus::Bus,
    state_store: &dyn crate::state::StateStore,
    config: &RiskConfig,
) -> crate::error::PipelineResult<()> {
    use crate::bus::topics;

    let mut sub = bus.subscribe_bytes(topics::IOT_TELEMETRY);
    loop {
        let Some(delivery) = sub.recv().await else {
            return Ok(());
        };
        let telemetry: IoTTelemetry = match serde_json::from_slice(&delivery.payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode telemetry, skipping");
                continue;
            }
        };
        let baseline = state_store.get_baseline(&telemetry.truck_id);
        let output = DigitalTwinProcessor::process(&telemetry, &baseline, config, telemetry.timestamp);
        if let Err(e) = bus.publish(topics::TWIN_OUTPUT, &output) {
            tracing::warn!(error = %e, "failed to publish twin output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telemetry() -> IoTTelemetry {
        IoTTelemetry {
            truck_id: "T1".into(),
            timestamp: Utc::now(),
            gps_lat: 0.0,
            gps_lon: 0.0,
            door_state: DoorState::Closed,
            cargo_weight_kg: 1000.0,
            engine_on: true,
            driver_rfid_scanned: true,
            signal_strength: 0.9,
        }
    }

    #[test]
    fn nominal_reading_has_zero_deviation() {
        let baseline = TwinBaseline { expected_cargo_weight_kg: 1000.0, ..Default::default() };
        let config = RiskConfig::default();
        let out = DigitalTwinProcessor::process(&telemetry(), &baseline, &config, Utc::now());
        assert_eq!(out.deviation_score, 0.0);
        assert_eq!(out.status, TwinStatus::Nominal);
    }

    #[test]
    fn door_open_no_rfid_adds_fixed_component_and_reason() {
        let mut t = telemetry();
        t.door_state = DoorState::Open;
        t.engine_on = false;
        t.driver_rfid_scanned = false;
        let baseline = TwinBaseline { expected_cargo_weight_kg: 1000.0, ..Default::default() };
        let config = RiskConfig::default();
        let out = DigitalTwinProcessor::process(&t, &baseline, &config, Utc::now());
        assert!(out.deviation_reasons.iter().any(|r| r.contains("Door open without RFID")));
    }

    #[test]
    fn weak_signal_triggers_component() {
        let mut t = telemetry();
        t.signal_strength = 0.1;
        let baseline = TwinBaseline { expected_cargo_weight_kg: 1000.0, ..Default::default() };
        let config = RiskConfig::default();
        let out = DigitalTwinProcessor::process(&t, &baseline, &config, Utc::now());
        assert!(out.deviation_reasons.iter().any(|r| r.contains("Weak IoT signal")));
    }

    #[test]
    fn stale_telemetry_is_not_fresh() {
        let mut t = telemetry();
        t.timestamp = Utc::now() - chrono::Duration::seconds(120);
        let baseline = TwinBaseline::default();
        let config = RiskConfig::default();
        let out = DigitalTwinProcessor::process(&t, &baseline, &config, Utc::now());
        assert!(!out.signal_fresh);
    }
}

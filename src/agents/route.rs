//! Route Processor (§4.6): geofences a GPS fix against corridors and risk
//! zones, then applies the time-of-day multiplier.

use chrono::{DateTime, Timelike, Utc};

use crate::config::RiskConfig;
use crate::geofence::GeofenceSet;
use crate::types::{clip01, RouteOutput, TwinOutput};

pub struct RouteProcessor;

impl RouteProcessor {
    pub fn process(twin: &TwinOutput, geofences: &GeofenceSet, config: &RiskConfig, now: DateTime<Utc>) -> RouteOutput {
        let result = geofences.evaluate((twin.gps_lat, twin.gps_lon));

        let hour = twin.timestamp.hour();
        let time_multiplier = if (22..24).contains(&hour) || (0..6).contains(&hour) {
            config.route.night_multiplier
        } else {
            config.route.day_multiplier
        };

        let mut base = if result.in_safe_corridor {
            0.0
        } else {
            (result.deviation_km / config.route.deviation_normalizer_km).min(config.route.deviation_cap)
        };
        if result.in_high_risk_zone {
            base = (base + config.route.risk_zone_penalty).min(1.0);
        }
        let route_risk_score = clip01((base * time_multiplier).min(1.0));

        RouteOutput {
            truck_id: twin.truck_id.clone(),
            timestamp: now,
            gps_lat: twin.gps_lat,
            gps_lon: twin.gps_lon,
            in_safe_corridor: result.in_safe_corridor,
            deviation_km: result.deviation_km,
            in_high_risk_zone: result.in_high_risk_zone,
            risk_zone_name: result.risk_zone_name.map(str::to_string),
            route_risk_score,
            time_multiplier,
            nearest_corridor_name: result.nearest_corridor_name.map(str::to_string),
        }
    }
}

/// Streaming task entry point (§5): consume `twin.output`, publish
/// `route.output`.
pub async fn run(
    bus: &crate::bus::Bus,
    geofences: &GeofenceSet,
    config: &RiskConfig,
) -> crate::error::PipelineResult<()> {
    use crate::bus::topics;

    let mut sub = bus.subscribe_bytes(topics::TWIN_OUTPUT);
    loop {
        let Some(delivery) = sub.recv().await else {
            return Ok(());
        };
        let twin: TwinOutput = match serde_json::from_slice(&delivery.payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode twin output, skipping");
                continue;
            }
        };
        let output = RouteProcessor::process(&twin, geofences, config, twin.timestamp);
        if let Err(e) = bus.publish(topics::ROUTE_OUTPUT, &output) {
            tracing::warn!(error = %e, "failed to publish route output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DoorState, TwinStatus};

    fn twin(lat: f64, lon: f64, hour: u32) -> TwinOutput {
        TwinOutput {
            truck_id: "T1".into(),
            timestamp: Utc::now().with_hour(hour).unwrap(),
            gps_lat: lat,
            gps_lon: lon,
            door_state: DoorState::Closed,
            cargo_weight_kg: 1000.0,
            engine_on: true,
            driver_rfid_scanned: true,
            deviation_score: 0.0,
            deviation_reasons: vec![],
            status: TwinStatus::Nominal,
            signal_fresh: true,
        }
    }

    #[test]
    fn in_safe_corridor_implies_zero_deviation() {
        let geofences = GeofenceSet::defaults();
        let config = RiskConfig::default();
        let t = twin(30.0, -100.0, 12);
        let out = RouteProcessor::process(&t, &geofences, &config, Utc::now());
        if out.in_safe_corridor {
            assert_eq!(out.deviation_km, 0.0);
        }
    }

    #[test]
    fn night_multiplier_is_one_point_five() {
        let geofences = GeofenceSet::defaults();
        let config = RiskConfig::default();
        let t = twin(30.0, -100.0, 2);
        let out = RouteProcessor::process(&t, &geofences, &config, Utc::now());
        assert_eq!(out.time_multiplier, 1.5);
    }

    #[test]
    fn day_multiplier_is_one() {
        let geofences = GeofenceSet::defaults();
        let config = RiskConfig::default();
        let t = twin(30.0, -100.0, 12);
        let out = RouteProcessor::process(&t, &geofences, &config, Utc::now());
        assert_eq!(out.time_multiplier, 1.0);
    }

    #[test]
    fn risk_zone_entry_adds_penalty() {
        let geofences = GeofenceSet::defaults();
        let config = RiskConfig::default();
        let t = twin(33.75, -118.27, 12);
        let out = RouteProcessor::process(&t, &geofences, &config, Utc::now());
        assert!(out.in_high_risk_zone);
        assert!(out.route_risk_score > 0.0);
    }
}

use super::telemetry::DoorState;
use super::TruckId;
use serde::{Deserialize, Serialize};

/// Per-truck baseline read from the State Store (§3, §4.5). Read-mostly,
/// defaulted when absent — the digital twin never blocks on a missing
/// baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwinBaseline {
    pub expected_cargo_weight_kg: f64,
    pub expected_door_state: DoorState,
    pub planned_route_center: (f64, f64),
    pub max_allowed_deviation_km: f64,
}

impl Default for TwinBaseline {
    fn default() -> Self {
        Self {
            expected_cargo_weight_kg: 0.0,
            expected_door_state: DoorState::Closed,
            planned_route_center: (0.0, 0.0),
            max_allowed_deviation_km: 5.0,
        }
    }
}

/// Twin health classification (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TwinStatus {
    Nominal,
    Degraded,
    Critical,
}

/// Published on `twin.output` (§3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwinOutput {
    pub truck_id: TruckId,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub gps_lat: f64,
    pub gps_lon: f64,
    pub door_state: DoorState,
    pub cargo_weight_kg: f64,
    pub engine_on: bool,
    pub driver_rfid_scanned: bool,
    pub deviation_score: f64,
    pub deviation_reasons: Vec<String>,
    pub status: TwinStatus,
    pub signal_fresh: bool,
}

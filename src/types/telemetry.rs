use super::TruckId;
use serde::{Deserialize, Serialize};

/// Cargo-door sensor state (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DoorState {
    Open,
    Closed,
}

/// Published on `iot.telemetry` for a single truck reading (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoTTelemetry {
    pub truck_id: TruckId,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub gps_lat: f64,
    pub gps_lon: f64,
    pub door_state: DoorState,
    pub cargo_weight_kg: f64,
    pub engine_on: bool,
    pub driver_rfid_scanned: bool,
    /// IoT signal strength in [0,1].
    pub signal_strength: f64,
}

use super::TruckId;
use serde::{Deserialize, Serialize};

/// Published on `route.output` (§3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteOutput {
    pub truck_id: TruckId,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub gps_lat: f64,
    pub gps_lon: f64,
    pub in_safe_corridor: bool,
    pub deviation_km: f64,
    pub in_high_risk_zone: bool,
    pub risk_zone_name: Option<String>,
    pub route_risk_score: f64,
    pub time_multiplier: f64,
    pub nearest_corridor_name: Option<String>,
}

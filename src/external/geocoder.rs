//! Geocoder capability (§6): resolves place names to coordinates and
//! computes a route between two points. Not exercised by any processor in
//! §4 directly — it exists for bridge-adjacent tooling (e.g. seeding trip
//! baselines from a named destination) and so ships only a deterministic
//! stub; a real implementation would call out to a mapping provider.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeocoderError {
    #[error("unknown place name: {0}")]
    UnknownPlace(String),
}

#[derive(Debug, Clone)]
pub struct RouteGeometry {
    pub distance_m: f64,
    pub duration_s: f64,
    pub points: Vec<(f64, f64)>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn coords(&self, name: &str) -> Result<(f64, f64), GeocoderError>;
    async fn route(&self, from: (f64, f64), to: (f64, f64)) -> Result<RouteGeometry, GeocoderError>;
}

/// Deterministic stub: a handful of known locations and a straight-line
/// route estimate. Good enough for demos and tests without a mapping API
/// key configured.
pub struct StubGeocoder;

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn coords(&self, name: &str) -> Result<(f64, f64), GeocoderError> {
        match name.to_lowercase().as_str() {
            "los angeles, ca" => Ok((34.0522, -118.2437)),
            "chicago, il" => Ok((41.8781, -87.6298)),
            "dallas, tx" => Ok((32.7767, -96.7970)),
            _ => Err(GeocoderError::UnknownPlace(name.to_string())),
        }
    }

    async fn route(&self, from: (f64, f64), to: (f64, f64)) -> Result<RouteGeometry, GeocoderError> {
        let degrees_to_km = crate::config::defaults::DEGREES_TO_KM;
        let dx = to.0 - from.0;
        let dy = to.1 - from.1;
        let distance_km = (dx * dx + dy * dy).sqrt() * degrees_to_km;
        let distance_m = distance_km * 1000.0;
        let avg_speed_kmh = 80.0;
        let duration_s = (distance_km / avg_speed_kmh) * 3600.0;
        Ok(RouteGeometry { distance_m, duration_s, points: vec![from, to] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_place_resolves() {
        let geocoder = StubGeocoder;
        assert!(geocoder.coords("Los Angeles, CA").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_place_errors() {
        let geocoder = StubGeocoder;
        assert!(geocoder.coords("Nowhere Land").await.is_err());
    }

    #[tokio::test]
    async fn route_distance_is_positive_for_distinct_points() {
        let geocoder = StubGeocoder;
        let route = geocoder.route((34.0, -118.0), (41.8, -87.6)).await.unwrap();
        assert!(route.distance_m > 0.0);
    }
}

//! Geofence evaluation (§4.6): safe corridors and risk zones as buffered
//! polygons, loaded from a geometry artifact or from built-in defaults.
//!
//! No crate in this workspace's lineage brings in a geometry library, so
//! point-in-polygon and point-to-polygon distance are hand-rolled here, in
//! the same spirit as the route processor's own hand-rolled haversine-style
//! conversion — small, self-contained numeric routines rather than a
//! general-purpose dependency pulled in for one call site.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A simple closed polygon: an ordered ring of (lat, lon) vertices. The
/// ring is implicitly closed (last vertex connects back to the first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<(f64, f64)>,
}

impl Polygon {
    /// Ray-casting point-in-polygon test.
    pub fn contains(&self, point: (f64, f64)) -> bool {
        let (px, py) = point;
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.vertices[i];
            let (xj, yj) = self.vertices[j];
            let intersects = ((yi > py) != (yj > py))
                && (px < (xj - xi) * (py - yi) / (yj - yi) + xi);
            if intersects {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Minimum distance in degrees from `point` to any edge of this
    /// polygon (0 if the point is inside).
    pub fn distance_degrees(&self, point: (f64, f64)) -> f64 {
        if self.contains(point) {
            return 0.0;
        }
        let n = self.vertices.len();
        if n == 0 {
            return f64::MAX;
        }
        if n == 1 {
            return dist(point, self.vertices[0]);
        }
        let mut min_d = f64::MAX;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            min_d = min_d.min(point_to_segment_distance(point, a, b));
        }
        min_d
    }

    /// Does `point` lie within this polygon expanded by `buffer_degrees`
    /// in every direction? Implemented as "inside, or within `buffer`
    /// degrees of an edge" rather than constructing an offset polygon.
    pub fn contains_buffered(&self, point: (f64, f64), buffer_degrees: f64) -> bool {
        self.contains(point) || self.distance_degrees(point) <= buffer_degrees
    }
}

fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

fn point_to_segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (px, py) = p;
    let (ax, ay) = a;
    let (bx, by) = b;
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return dist(p, a);
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    let proj = (ax + t * dx, ay + t * dy);
    dist(p, proj)
}

/// A named road corridor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corridor {
    pub name: String,
    pub polygon: Polygon,
}

/// A named high-theft risk zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskZone {
    pub name: String,
    pub polygon: Polygon,
}

/// Result of evaluating a single GPS fix against the geofence set.
#[derive(Debug, Clone, Copy)]
pub struct GeofenceResult<'a> {
    pub in_safe_corridor: bool,
    pub deviation_km: f64,
    pub nearest_corridor_name: Option<&'a str>,
    pub in_high_risk_zone: bool,
    pub risk_zone_name: Option<&'a str>,
}

/// The loaded (or default) corridor and risk-zone geometry for a
/// deployment (§6 "Persisted state layout").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeofenceSet {
    pub corridors: Vec<Corridor>,
    pub risk_zones: Vec<RiskZone>,
    pub buffer_degrees: f64,
    pub degrees_to_km: f64,
}

impl GeofenceSet {
    /// Built-in defaults: one broad corridor covering the continental US
    /// bounding envelope and one small risk zone, enough for the pipeline
    /// to run end to end with no configured geometry (§6).
    pub fn defaults() -> Self {
        Self {
            corridors: vec![Corridor {
                name: "default-corridor".to_string(),
                polygon: Polygon {
                    vertices: vec![
                        (24.5, -125.0),
                        (49.5, -125.0),
                        (49.5, -66.9),
                        (24.5, -66.9),
                    ],
                },
            }],
            risk_zones: vec![RiskZone {
                name: "default-risk-zone".to_string(),
                polygon: Polygon {
                    vertices: vec![
                        (33.73, -118.30),
                        (33.78, -118.30),
                        (33.78, -118.24),
                        (33.73, -118.24),
                    ],
                },
            }],
            buffer_degrees: crate::config::defaults::CORRIDOR_BUFFER_DEGREES,
            degrees_to_km: crate::config::defaults::DEGREES_TO_KM,
        }
    }

    /// Load a geometry artifact (JSON) from disk, falling back to
    /// defaults with a warning on any failure — geometry is optional
    /// (§6).
    pub fn load(path: Option<&str>) -> Self {
        let Some(path) = path else {
            info!("No route.geometry_path configured — using default geofence set");
            return Self::defaults();
        };
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(set) => {
                    info!(path, corridors = set.corridors.len(), risk_zones = set.risk_zones.len(), "Loaded geofence geometry");
                    set
                }
                Err(e) => {
                    warn!(path, error = %e, "Failed to parse geofence geometry, using defaults");
                    Self::defaults()
                }
            },
            Err(e) => {
                warn!(path, error = %e, "Failed to read geofence geometry, using defaults");
                Self::defaults()
            }
        }
    }

    /// Evaluate a GPS fix against every corridor and risk zone (§4.6).
    pub fn evaluate(&self, point: (f64, f64)) -> GeofenceResult<'_> {
        let in_safe_corridor = self
            .corridors
            .iter()
            .any(|c| c.polygon.contains_buffered(point, self.buffer_degrees));

        let (deviation_km, nearest_corridor_name) = if in_safe_corridor {
            (0.0, None)
        } else {
            self.corridors
                .iter()
                .map(|c| (c.polygon.distance_degrees(point) * self.degrees_to_km, c.name.as_str()))
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(km, name)| (km, Some(name)))
                .unwrap_or((f64::MAX, None))
        };

        let risk_hit = self.risk_zones.iter().find(|z| z.polygon.contains(point));

        GeofenceResult {
            in_safe_corridor,
            deviation_km,
            nearest_corridor_name,
            in_high_risk_zone: risk_hit.is_some(),
            risk_zone_name: risk_hit.map(|z| z.name.as_str()),
        }
    }
}

impl Default for GeofenceSet {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon { vertices: vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)] }
    }

    #[test]
    fn point_inside_square_is_contained() {
        assert!(square().contains((5.0, 5.0)));
    }

    #[test]
    fn point_far_outside_square_is_not_contained() {
        assert!(!square().contains((100.0, 100.0)));
    }

    #[test]
    fn point_just_outside_is_within_buffer() {
        let p = square();
        assert!(!p.contains((5.0, 10.002)));
        assert!(p.contains_buffered((5.0, 10.002), 0.0045));
    }

    #[test]
    fn distance_from_inside_is_zero() {
        assert_eq!(square().distance_degrees((5.0, 5.0)), 0.0);
    }

    #[test]
    fn in_safe_corridor_implies_zero_deviation() {
        let set = GeofenceSet::defaults();
        let inside = (30.0, -100.0);
        let result = set.evaluate(inside);
        if result.in_safe_corridor {
            assert_eq!(result.deviation_km, 0.0);
        }
    }

    #[test]
    fn point_in_default_risk_zone_is_flagged() {
        let set = GeofenceSet::defaults();
        let result = set.evaluate((33.75, -118.27));
        assert!(result.in_high_risk_zone);
        assert_eq!(result.risk_zone_name, Some("default-risk-zone"));
    }

    #[test]
    fn missing_geometry_path_falls_back_to_defaults() {
        let set = GeofenceSet::load(None);
        assert!(!set.corridors.is_empty());
    }
}

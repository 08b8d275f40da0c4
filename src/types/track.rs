use serde::{Deserialize, Serialize};

/// Object class recognized by the detector. Anything else is dropped at
/// the perception boundary (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackClass {
    Person,
    Car,
    Truck,
    Bus,
    Motorcycle,
    Other,
}

/// An axis-aligned bounding box in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn centroid(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let iw = (ix2 - ix1).max(0.0);
        let ih = (iy2 - iy1).max(0.0);
        let intersection = iw * ih;

        let area_a = (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0);
        let area_b = (other.x2 - other.x1).max(0.0) * (other.y2 - other.y1).max(0.0);
        let union = area_a + area_b - intersection;

        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// A persistent object track, produced by the perception processor's
/// multi-object tracker (§4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub track_id: u64,
    pub class: TrackClass,
    pub confidence: f64,
    pub bbox: BoundingBox,
    /// (dx, dy) in pixels/tick between the last two centroids.
    pub velocity: (f64, f64),
    /// Seconds since the track first appeared.
    pub dwell_seconds: f64,
}

impl Track {
    pub fn speed(&self) -> f64 {
        (self.velocity.0.powi(2) + self.velocity.1.powi(2)).sqrt()
    }
}

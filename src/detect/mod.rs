//! Object detection (§4.3): a pluggable [`Detector`] capability plus the
//! multi-object tracker that turns frame-by-frame detections into
//! persistent [`Track`]s.

pub mod tracker;

use crate::types::{BoundingBox, TrackClass};

/// A single raw detection before tracking: bounding box, confidence, and
/// class (§4.3).
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub class: TrackClass,
}

/// Object detector capability. Implementations decode a frame and return
/// raw detections above their own confidence floor; a missing/unavailable
/// model degrades to [`NullDetector`], which is never an error (§4.3
/// "Failures to decode yield an empty track list, not an error").
pub trait Detector: Send + Sync {
    fn detect(&self, frame: &[u8]) -> Vec<RawDetection>;

    /// Confidence threshold this detector expects callers to apply.
    /// Lower when no accelerator is available (§4.3).
    fn confidence_threshold(&self) -> f64;
}

/// Always-available no-op detector: every frame decodes to zero tracks.
/// Used when no detector model is configured, or as a deliberate fallback
/// under decode failure.
pub struct NullDetector {
    threshold: f64,
}

impl NullDetector {
    pub fn new(gpu_available: bool) -> Self {
        let threshold = if gpu_available {
            crate::config::defaults::DETECTOR_CONFIDENCE_THRESHOLD_GPU
        } else {
            crate::config::defaults::DETECTOR_CONFIDENCE_THRESHOLD_CPU
        };
        Self { threshold }
    }
}

impl Detector for NullDetector {
    fn detect(&self, _frame: &[u8]) -> Vec<RawDetection> {
        Vec::new()
    }

    fn confidence_threshold(&self) -> f64 {
        self.threshold
    }
}

/// Decode `frame` with `detector`, retaining only the tracked classes
/// (person/car/truck/bus/motorcycle) above its confidence threshold.
/// Decode failures (signalled by the detector returning nothing) are not
/// errors — an empty list is a perfectly valid perception output (§4.3).
pub fn detect_tracked_classes(detector: &dyn Detector, frame: &[u8]) -> Vec<RawDetection> {
    let threshold = detector.confidence_threshold();
    detector
        .detect(frame)
        .into_iter()
        .filter(|d| d.confidence >= threshold)
        .filter(|d| !matches!(d.class, TrackClass::Other))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_detector_always_returns_empty() {
        let detector = NullDetector::new(true);
        assert!(detector.detect(b"not a real frame").is_empty());
    }

    #[test]
    fn null_detector_lowers_threshold_without_accelerator() {
        let with_gpu = NullDetector::new(true);
        let without_gpu = NullDetector::new(false);
        assert!(without_gpu.confidence_threshold() < with_gpu.confidence_threshold());
    }
}

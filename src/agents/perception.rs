//! Perception Processor (§4.3): decode a frame, run detection + tracking,
//! emit tracks and scene tags.

use chrono::{DateTime, Timelike, Utc};
use std::sync::Mutex;
use tracing::warn;

use crate::detect::tracker::MultiObjectTracker;
use crate::detect::{detect_tracked_classes, Detector};
use crate::types::{PerceptionOutput, SceneTag, Track, TrackClass};

/// Per-truck perception state: each truck gets its own tracker instance
/// since tracks are not meaningfully comparable across cameras.
pub struct PerceptionProcessor {
    detector: Box<dyn Detector>,
    trackers: dashmap::DashMap<String, Mutex<MultiObjectTracker>>,
}

impl PerceptionProcessor {
    pub fn new(detector: Box<dyn Detector>) -> Self {
        Self { detector, trackers: dashmap::DashMap::new() }
    }

    /// Decode `frame` for `truck_id`, update its tracker, and build the
    /// PerceptionOutput for this frame. Decode/inference failures yield
    /// an empty track list rather than propagating an error (§4.3).
    pub fn process(&self, truck_id: &str, frame_id: u64, frame: &[u8], now: DateTime<Utc>) -> PerceptionOutput {
        let detections = detect_tracked_classes(self.detector.as_ref(), frame);
        if detections.is_empty() && !frame.is_empty() {
            warn!(truck_id, frame_id, "perception produced no detections for this frame");
        }

        let entry = self.trackers.entry(truck_id.to_string()).or_insert_with(|| Mutex::new(MultiObjectTracker::new()));
        let tracks = entry.lock().unwrap_or_else(|p| p.into_inner()).update(&detections, now);

        let scene_tags = derive_scene_tags(&tracks, now);

        PerceptionOutput { truck_id: truck_id.to_string(), frame_id, timestamp: now, tracks, scene_tags }
    }
}

/// Streaming task entry point (§5): consume `camera.frames`, publish
/// `perception.output`. Returns `Ok(())` only when the bus closes the
/// subscription (normal shutdown); any other exit is surfaced to the
/// [`crate::background::Supervisor`] as a restartable or fatal error.
pub async fn run(bus: &crate::bus::Bus, processor: &PerceptionProcessor) -> crate::error::PipelineResult<()> {
    use crate::bus::topics;

    let mut sub = bus.subscribe_bytes(topics::CAMERA_FRAMES);
    loop {
        let Some(delivery) = sub.recv().await else {
            return Ok(());
        };
        let frame: crate::types::CameraFrame = match serde_json::from_slice(&delivery.payload) {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "failed to decode camera frame, skipping");
                continue;
            }
        };
        let output = processor.process(&frame.truck_id, frame.frame_id, &frame.frame, frame.timestamp);
        if let Err(e) = bus.publish(topics::PERCEPTION_OUTPUT, &output) {
            warn!(error = %e, "failed to publish perception output");
        }
    }
}

fn derive_scene_tags(tracks: &[Track], now: DateTime<Utc>) -> Vec<SceneTag> {
    let mut tags = Vec::new();
    let hour = now.hour();
    if (22..24).contains(&hour) || (0..6).contains(&hour) {
        tags.push(SceneTag::Night);
    }
    if !tracks.iter().any(|t| t.class == TrackClass::Person) {
        tags.push(SceneTag::NoDriverPresent);
    }
    if tracks
        .iter()
        .any(|t| t.dwell_seconds > crate::config::defaults::LOITERING_DWELL_SECS)
    {
        tags.push(SceneTag::LoiteringDetected);
    }
    if tracks.len() > crate::config::defaults::CROWD_MIN_TRACK_COUNT {
        tags.push(SceneTag::CrowdDetected);
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::NullDetector;

    #[test]
    fn empty_frame_yields_no_tracks() {
        let processor = PerceptionProcessor::new(Box::new(NullDetector::new(false)));
        let output = processor.process("T1", 1, b"", Utc::now());
        assert!(output.tracks.is_empty());
    }

    #[test]
    fn night_hour_adds_night_tag() {
        let now = Utc::now().with_hour(2).unwrap();
        let tags = derive_scene_tags(&[], now);
        assert!(tags.contains(&SceneTag::Night));
    }

    #[test]
    fn no_person_track_adds_no_driver_present() {
        let tags = derive_scene_tags(&[], Utc::now().with_hour(12).unwrap());
        assert!(tags.contains(&SceneTag::NoDriverPresent));
    }
}

//! IOU-based multi-object tracker (§4.3): greedy bounding-box association
//! across frames, persistent integer ids, a bounded centroid history per
//! track, and age-based eviction.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use super::RawDetection;
use crate::types::{BoundingBox, Track, TrackClass};

struct TrackState {
    id: u64,
    class: TrackClass,
    confidence: f64,
    bbox: BoundingBox,
    centroids: VecDeque<(f64, f64)>,
    first_seen: DateTime<Utc>,
    missed_frames: u32,
}

impl TrackState {
    fn velocity(&self) -> (f64, f64) {
        if self.centroids.len() < 2 {
            return (0.0, 0.0);
        }
        let n = self.centroids.len();
        let last = self.centroids[n - 1];
        let prev = self.centroids[n - 2];
        (last.0 - prev.0, last.1 - prev.1)
    }

    fn dwell_seconds(&self, now: DateTime<Utc>) -> f64 {
        (now - self.first_seen).num_milliseconds().max(0) as f64 / 1000.0
    }

    fn to_track(&self, now: DateTime<Utc>) -> Track {
        Track {
            track_id: self.id,
            class: self.class,
            confidence: self.confidence,
            bbox: self.bbox,
            velocity: self.velocity(),
            dwell_seconds: self.dwell_seconds(now),
        }
    }
}

/// Greedy IOU tracker. Not thread-safe on its own — callers hold one
/// instance per truck and drive it from a single task.
pub struct MultiObjectTracker {
    tracks: Vec<TrackState>,
    next_id: u64,
    max_age_frames: u32,
    centroid_history: usize,
    iou_match_threshold: f64,
}

impl MultiObjectTracker {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            max_age_frames: crate::config::defaults::TRACKER_MAX_AGE_FRAMES,
            centroid_history: crate::config::defaults::TRACKER_CENTROID_HISTORY,
            iou_match_threshold: 0.3,
        }
    }

    /// Associate this frame's detections with existing tracks, create new
    /// tracks for the rest, age out tracks missed for too long, and return
    /// the confirmed tracks as of `now`.
    pub fn update(&mut self, detections: &[RawDetection], now: DateTime<Utc>) -> Vec<Track> {
        let mut matched = vec![false; detections.len()];

        for track in &mut self.tracks {
            let mut best: Option<(usize, f64)> = None;
            for (i, det) in detections.iter().enumerate() {
                if matched[i] {
                    continue;
                }
                let iou = track.bbox.iou(&det.bbox);
                if iou >= self.iou_match_threshold && best.map(|(_, b)| iou > b).unwrap_or(true) {
                    best = Some((i, iou));
                }
            }
            match best {
                Some((i, _)) => {
                    let det = &detections[i];
                    matched[i] = true;
                    track.bbox = det.bbox;
                    track.confidence = det.confidence;
                    track.missed_frames = 0;
                    let centroid = det.bbox.centroid();
                    track.centroids.push_back(centroid);
                    while track.centroids.len() > self.centroid_history {
                        track.centroids.pop_front();
                    }
                }
                None => track.missed_frames += 1,
            }
        }

        self.tracks.retain(|t| t.missed_frames <= self.max_age_frames);

        for (i, det) in detections.iter().enumerate() {
            if matched[i] {
                continue;
            }
            let mut centroids = VecDeque::with_capacity(self.centroid_history);
            centroids.push_back(det.bbox.centroid());
            self.tracks.push(TrackState {
                id: self.next_id,
                class: det.class,
                confidence: det.confidence,
                bbox: det.bbox,
                centroids,
                first_seen: now,
                missed_frames: 0,
            });
            self.next_id += 1;
        }

        self.tracks.iter().filter(|t| t.missed_frames == 0).map(|t| t.to_track(now)).collect()
    }
}

impl Default for MultiObjectTracker {
    fn default() -> Self {
        Self::new()
    }
}

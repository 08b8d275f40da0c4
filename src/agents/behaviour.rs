//! Behaviour Processor (§4.4): feature vectors per track, scored by a
//! pluggable [`Scorer`], folded into loitering/crowd/anomaly signals.

use chrono::{DateTime, Timelike, Utc};

use crate::scoring::{score_tracks, Scorer, TrackFeatures};
use crate::types::{BehaviourOutput, Track};

pub struct BehaviourProcessor {
    scorer: Box<dyn Scorer>,
}

impl BehaviourProcessor {
    pub fn new(scorer: Box<dyn Scorer>) -> Self {
        Self { scorer }
    }

    /// Score every track, then derive the aggregate behaviour signals
    /// (§4.4).
    pub fn process(&self, truck_id: &str, tracks: &[Track], now: DateTime<Utc>) -> BehaviourOutput {
        let hour = now.hour();
        let features: Vec<TrackFeatures> = tracks.iter().map(|t| TrackFeatures::from_track(t, hour)).collect();
        let scores = score_tracks(self.scorer.as_ref(), &features);

        let raw_track_scores: Vec<(u64, f64)> =
            tracks.iter().zip(scores.iter()).map(|(t, &s)| (t.track_id, s)).collect();

        let flag_threshold = crate::config::defaults::BEHAVIOUR_FLAG_THRESHOLD;
        let flagged_track_ids: Vec<u64> =
            raw_track_scores.iter().filter(|(_, s)| *s >= flag_threshold).map(|(id, _)| *id).collect();

        let anomaly_score = raw_track_scores.iter().map(|(_, s)| *s).fold(0.0_f64, f64::max);
        let is_anomaly = anomaly_score >= flag_threshold;

        let loitering_dwell_s = crate::config::defaults::LOITERING_DWELL_SECS;
        let loitering_tracks: Vec<&Track> = tracks
            .iter()
            .filter(|t| {
                t.dwell_seconds > loitering_dwell_s && flagged_track_ids.contains(&t.track_id)
            })
            .collect();
        let loitering_detected = !loitering_tracks.is_empty();
        let loitering_duration_s =
            loitering_tracks.iter().map(|t| t.dwell_seconds).fold(0.0_f64, f64::max);

        let crowd_anomaly = tracks.len() > crate::config::defaults::CROWD_MIN_TRACK_COUNT
            && anomaly_score > crate::config::defaults::CROWD_ANOMALY_SCORE_FLOOR;

        BehaviourOutput {
            truck_id: truck_id.to_string(),
            timestamp: now,
            anomaly_score,
            is_anomaly,
            flagged_track_ids,
            loitering_detected,
            loitering_duration_s,
            crowd_anomaly,
            raw_track_scores,
        }
    }
}

/// Streaming task entry point (§5): consume `perception.output`, publish
/// `behaviour.output`.
pub async fn run(bus: &crate::bus::Bus, processor: &BehaviourProcessor) -> crate::error::PipelineResult<()> {
    use crate::bus::topics;
    use crate::types::PerceptionOutput;

    let mut sub = bus.subscribe_bytes(topics::PERCEPTION_OUTPUT);
    loop {
        let Some(delivery) = sub.recv().await else {
            return Ok(());
        };
        let input: PerceptionOutput = match serde_json::from_slice(&delivery.payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode perception output, skipping");
                continue;
            }
        };
        let output = processor.process(&input.truck_id, &input.tracks, input.timestamp);
        if let Err(e) = bus.publish(topics::BEHAVIOUR_OUTPUT, &output) {
            tracing::warn!(error = %e, "failed to publish behaviour output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::HeuristicScorer;
    use crate::types::{BoundingBox, TrackClass};

    fn track(id: u64, dwell: f64, velocity: (f64, f64)) -> Track {
        Track {
            track_id: id,
            class: TrackClass::Person,
            confidence: 0.9,
            bbox: BoundingBox { x1: 0.0, y1: 0.0, x2: 1.0, y2: 1.0 },
            velocity,
            dwell_seconds: dwell,
        }
    }

    #[test]
    fn anomaly_score_is_max_across_tracks() {
        let processor = BehaviourProcessor::new(Box::new(HeuristicScorer));
        let tracks = vec![track(1, 10.0, (5.0, 5.0)), track(2, 70.0, (0.0, 0.0))];
        let out = processor.process("T1", &tracks, Utc::now().with_hour(12).unwrap());
        assert!(out.anomaly_score >= out.raw_track_scores[0].1);
        assert!(out.anomaly_score >= out.raw_track_scores[1].1);
    }

    #[test]
    fn crowd_anomaly_requires_both_count_and_score() {
        let processor = BehaviourProcessor::new(Box::new(HeuristicScorer));
        let tracks: Vec<Track> = (0..6).map(|i| track(i, 70.0, (0.0, 0.0))).collect();
        let out = processor.process("T1", &tracks, Utc::now().with_hour(2).unwrap());
        assert!(tracks.len() > crate::config::defaults::CROWD_MIN_TRACK_COUNT);
        assert_eq!(out.crowd_anomaly, out.anomaly_score > crate::config::defaults::CROWD_ANOMALY_SCORE_FLOOR);
    }

    #[test]
    fn loitering_requires_dwell_and_flag() {
        let processor = BehaviourProcessor::new(Box::new(HeuristicScorer));
        let tracks = vec![track(1, 5.0, (5.0, 5.0))];
        let out = processor.process("T1", &tracks, Utc::now().with_hour(12).unwrap());
        assert!(!out.loitering_detected);
    }
}

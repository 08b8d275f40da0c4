use super::track::Track;
use super::TruckId;
use serde::{Deserialize, Serialize};

/// Published on `camera.frames` (§3, §4.3). The spec names the topic
/// payload as bare image bytes; every other input topic carries its
/// truck id and frame/sequence number alongside the payload, so this
/// wraps the raw bytes in the same envelope shape for the streaming path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraFrame {
    pub truck_id: TruckId,
    pub frame_id: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub frame: Vec<u8>,
}

/// Scene-level tags attached to a frame (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneTag {
    Night,
    NoDriverPresent,
    LoiteringDetected,
    CrowdDetected,
}

/// Published on `perception.output` once per processed frame (§3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerceptionOutput {
    pub truck_id: TruckId,
    pub frame_id: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub tracks: Vec<Track>,
    pub scene_tags: Vec<SceneTag>,
}

impl PerceptionOutput {
    pub fn has_tag(&self, tag: SceneTag) -> bool {
        self.scene_tags.contains(&tag)
    }
}

//! Wire record types carried on the bus (§3 of the risk-pipeline design).
//!
//! Every record here is a plain, immutable-after-publication value. Each
//! processor owns its own topic's encode/decode; the bus itself only ever
//! sees opaque bytes (see [`crate::bus`]).

mod behaviour;
mod decision;
mod explanation;
mod perception;
mod risk;
mod route;
mod telemetry;
mod track;
mod twin;

pub use behaviour::BehaviourOutput;
pub use decision::{Action, DecisionOutput};
pub use explanation::ExplanationOutput;
pub use perception::{CameraFrame, PerceptionOutput, SceneTag};
pub use risk::{FusionMethod, RiskLevel, RiskOutput};
pub use route::RouteOutput;
pub use telemetry::{DoorState, IoTTelemetry};
pub use track::{TrackClass, Track};
pub use twin::{TwinBaseline, TwinOutput, TwinStatus};

/// Truck identifier. A thin newtype so truck ids can't be confused with
/// other string-ish fields (incident ids, rule ids) at call sites.
pub type TruckId = String;

/// Clip a score into the closed unit interval, per the "all scores in
/// [0,1]" invariant that applies to every output record.
pub fn clip01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

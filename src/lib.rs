//! Fleet Sentinel — a real-time cargo-theft risk assessment pipeline for
//! truck fleets.
//!
//! Perception, IoT telemetry, and route signals flow through independent
//! processors onto a named pub/sub [`bus`], converge in the Risk Fusion
//! processor, and drive rule-based decisions and natural-language
//! explanations. A synchronous HTTP [`api`] bridge exposes the same
//! processor logic for request/response use outside the streaming path.

pub mod agents;
pub mod api;
pub mod background;
pub mod bus;
pub mod config;
pub mod detect;
pub mod error;
pub mod external;
pub mod geofence;
pub mod scoring;
pub mod state;
pub mod types;

pub use error::{PipelineError, PipelineResult};

//! Pluggable external capabilities (§6): Notifier, Summarizer, Geocoder,
//! and the CRUD trip/alert store consumed by the HTTP bridge. Every trait
//! here ships a deterministic, dependency-free default implementation —
//! mirroring the teacher's pattern of a mock/logging backend standing in
//! for an unconfigured remote model (`llm::tactical_llm::TacticalLLM`'s
//! `not(feature = "llm")` path) — so the pipeline runs end to end with no
//! external credentials configured.

pub mod geocoder;
pub mod notifier;
pub mod store;
pub mod summarizer;

pub use geocoder::Geocoder;
pub use notifier::Notifier;
pub use store::{Alert, Store, Trip, TripStatus};
pub use summarizer::Summarizer;

//! The seven processors (§2, §4) that make up the pipeline. Each module
//! exposes a pure `process(...)` function used by both the bus-driven
//! streaming task and the HTTP bridge, plus a `run(...)` task entry point
//! for the streaming path.

pub mod behaviour;
pub mod decision;
pub mod digital_twin;
pub mod explainability;
pub mod perception;
pub mod risk_fusion;
pub mod route;

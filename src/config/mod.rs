//! Risk-pipeline configuration.
//!
//! Provides operator-tunable values for every threshold and weight the
//! pipeline uses, replacing hardcoded constants so a deployment can retune
//! without a rebuild.
//!
//! ## Loading order
//!
//! 1. `$FLEET_CONFIG` environment variable (path to a TOML file)
//! 2. `fleet_config.toml` in the current working directory
//! 3. Built-in defaults (matching the values named in the design doc)
//!
//! ## Usage
//!
//! ```ignore
//! config::init(RiskConfig::load());
//! let w = config::get().fusion.weights.behaviour;
//! ```

pub mod defaults;
mod risk_config;
mod validation;

pub use risk_config::*;

use std::sync::OnceLock;

static RISK_CONFIG: OnceLock<RiskConfig> = OnceLock::new();

/// Initialize the global config. Must be called exactly once before any
/// call to [`get`]. A second call is logged and ignored rather than
/// panicking — tests routinely call `init` from multiple modules.
pub fn init(config: RiskConfig) {
    if RISK_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get the global config, initializing it with defaults on first access
/// if `init()` was never called. Unlike the teacher's panic-on-missing-
/// init policy, the risk pipeline's defaults are safe to run with, so
/// tests and library consumers are not forced to call `init` first.
pub fn get() -> &'static RiskConfig {
    RISK_CONFIG.get_or_init(RiskConfig::default)
}

pub fn is_initialized() -> bool {
    RISK_CONFIG.get().is_some()
}

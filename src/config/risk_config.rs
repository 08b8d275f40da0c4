use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults as d;

/// Errors while loading/validating a [`RiskConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("could not parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
    #[error("could not serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration for a pipeline deployment.
///
/// Load with `RiskConfig::load()`, which searches:
/// 1. `$FLEET_CONFIG` env var
/// 2. `./fleet_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default)]
    pub truck: TruckConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub behaviour: BehaviourConfig,
    #[serde(default)]
    pub twin: TwinConfig,
    #[serde(default)]
    pub route: RouteConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            truck: TruckConfig::default(),
            fusion: FusionConfig::default(),
            rules: RulesConfig::default(),
            behaviour: BehaviourConfig::default(),
            twin: TwinConfig::default(),
            route: RouteConfig::default(),
            bus: BusConfig::default(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl RiskConfig {
    /// Load using the standard search order. Never fails: a missing or
    /// broken config file falls back to defaults with a warning, matching
    /// the "optional, the system must run with defaults" guarantee (§6).
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("FLEET_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded risk config from FLEET_CONFIG");
                        return config;
                    }
                    Err(e) => warn!(path = %p.display(), error = %e, "Failed to load FLEET_CONFIG, falling back"),
                }
            } else {
                warn!(path = %path, "FLEET_CONFIG points to a non-existent file, falling back");
            }
        }

        let local = PathBuf::from("fleet_config.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded risk config from ./fleet_config.toml");
                    return config;
                }
                Err(e) => warn!(error = %e, "Failed to load ./fleet_config.toml, using defaults"),
            }
        }

        info!("No fleet_config.toml found — using built-in defaults");
        Self::default()
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Sanity-check the config (§4.13): weights non-negative, thresholds
    /// monotonic, TTLs positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        super::validation::validate(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruckConfig {
    /// Default truck id for the HTTP bridge when a request omits one (§6).
    pub default_truck_id: String,
}

impl Default for TruckConfig {
    fn default() -> Self {
        Self { default_truck_id: "UNKNOWN".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionWeights {
    pub behaviour: f64,
    pub twin: f64,
    pub route: f64,
    pub temporal: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { behaviour: 0.35, twin: 0.30, route: 0.25, temporal: 0.10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default)]
    pub weights: FusionWeights,
    pub signal_staleness_s: i64,
    pub quality_decay_rate: f64,
    pub risk_score_ttl_s: u64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            weights: FusionWeights::default(),
            signal_staleness_s: d::SIGNAL_STALENESS_SECS,
            quality_decay_rate: d::QUALITY_DECAY_RATE,
            risk_score_ttl_s: d::RISK_SCORE_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    pub id: String,
    pub name: String,
    pub threshold_low: f64,
    pub threshold_high: Option<f64>,
    pub actions: Vec<String>,
    pub cooldown_s: u64,
    pub priority: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    pub table: Vec<RuleDef>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            table: vec![
                RuleDef {
                    id: "R001".into(),
                    name: "CRITICAL_THEFT_ALERT".into(),
                    threshold_low: d::RULE_R001_THRESHOLD,
                    threshold_high: None,
                    actions: vec!["sms".into(), "email".into(), "log_incident".into()],
                    cooldown_s: d::RULE_R001_COOLDOWN_SECS,
                    priority: 1,
                },
                RuleDef {
                    id: "R002".into(),
                    name: "HIGH_RISK_ALERT".into(),
                    threshold_low: d::RULE_R002_THRESHOLD,
                    threshold_high: Some(d::RULE_R001_THRESHOLD),
                    actions: vec!["email".into(), "log_incident".into()],
                    cooldown_s: d::RULE_R002_COOLDOWN_SECS,
                    priority: 2,
                },
                RuleDef {
                    id: "R003".into(),
                    name: "MEDIUM_RISK_MONITOR".into(),
                    threshold_low: d::RULE_R003_THRESHOLD,
                    threshold_high: Some(d::RULE_R002_THRESHOLD),
                    actions: vec!["log_incident".into()],
                    cooldown_s: d::RULE_R003_COOLDOWN_SECS,
                    priority: 3,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviourConfig {
    pub flag_threshold: f64,
    pub near_door_dwell_s: f64,
    pub loitering_dwell_s: f64,
    pub crowd_min_tracks: usize,
    pub crowd_score_floor: f64,
}

impl Default for BehaviourConfig {
    fn default() -> Self {
        Self {
            flag_threshold: d::BEHAVIOUR_FLAG_THRESHOLD,
            near_door_dwell_s: d::NEAR_DOOR_DWELL_SECS,
            loitering_dwell_s: d::LOITERING_DWELL_SECS,
            crowd_min_tracks: d::CROWD_MIN_TRACK_COUNT,
            crowd_score_floor: d::CROWD_ANOMALY_SCORE_FLOOR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwinConfig {
    pub weight_delta_kg: f64,
    pub weight_normalizer_kg: f64,
    pub door_no_rfid_component: f64,
    pub route_normalizer_km: f64,
    pub weak_signal_threshold: f64,
    pub weak_signal_component: f64,
    pub critical_threshold: f64,
    pub degraded_threshold: f64,
    pub freshness_s: i64,
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            weight_delta_kg: d::TWIN_WEIGHT_DELTA_KG,
            weight_normalizer_kg: d::TWIN_WEIGHT_NORMALIZER_KG,
            door_no_rfid_component: d::TWIN_DOOR_NO_RFID_COMPONENT,
            route_normalizer_km: d::TWIN_ROUTE_NORMALIZER_KM,
            weak_signal_threshold: d::TWIN_WEAK_SIGNAL_THRESHOLD,
            weak_signal_component: d::TWIN_WEAK_SIGNAL_COMPONENT,
            critical_threshold: d::TWIN_CRITICAL_THRESHOLD,
            degraded_threshold: d::TWIN_DEGRADED_THRESHOLD,
            freshness_s: d::TWIN_FRESHNESS_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub corridor_buffer_degrees: f64,
    pub degrees_to_km: f64,
    pub deviation_normalizer_km: f64,
    pub deviation_cap: f64,
    pub risk_zone_penalty: f64,
    pub night_multiplier: f64,
    pub day_multiplier: f64,
    /// Path to a corridor/risk-zone geometry artifact (TOML/JSON). Missing
    /// ⇒ built-in defaults, per §6 "Persisted state layout".
    pub geometry_path: Option<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            corridor_buffer_degrees: d::CORRIDOR_BUFFER_DEGREES,
            degrees_to_km: d::DEGREES_TO_KM,
            deviation_normalizer_km: d::ROUTE_DEVIATION_NORMALIZER_KM,
            deviation_cap: d::ROUTE_DEVIATION_CAP,
            risk_zone_penalty: d::ROUTE_RISK_ZONE_PENALTY,
            night_multiplier: d::ROUTE_NIGHT_MULTIPLIER,
            day_multiplier: d::ROUTE_DAY_MULTIPLIER,
            geometry_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Optional external broker URL (§6). `None` ⇒ in-process only.
    pub bus_url: Option<String>,
    pub subscriber_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bus_url: std::env::var("BUS_URL").ok(),
            subscriber_capacity: d::BUS_SUBSCRIBER_CAPACITY,
        }
    }
}

/// Summarizer provider selection (§6, §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Template,
    Remote,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub remote_endpoint: Option<String>,
    pub remote_deadline_s: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let provider = match std::env::var("LLM_PROVIDER").as_deref() {
            Ok("remote") => LlmProvider::Remote,
            Ok("local") => LlmProvider::Local,
            _ => LlmProvider::Template,
        };
        Self {
            provider,
            remote_endpoint: std::env::var("LLM_REMOTE_ENDPOINT").ok(),
            remote_deadline_s: d::REMOTE_CALL_DEADLINE_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:8080".to_string() }
    }
}

/// Task-supervisor restart policy (§5, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    pub restart_window_s: u64,
    pub restart_escalation_count: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_window_s: d::FATAL_RESTART_WINDOW_SECS,
            restart_escalation_count: d::FATAL_RESTART_ESCALATION_COUNT,
            initial_backoff_ms: 200,
            max_backoff_ms: 30_000,
        }
    }
}

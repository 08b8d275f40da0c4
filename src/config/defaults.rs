//! System-wide default constants, grouped by subsystem.
//!
//! These reproduce the literal values the design pins in prose, so an
//! unconfigured deployment behaves exactly as specified.

// ============================================================================
// Bus
// ============================================================================

/// Per-subscriber bounded queue depth (§4.1, §5). When full, the oldest
/// message for that subscriber is dropped.
pub const BUS_SUBSCRIBER_CAPACITY: usize = 1024;

// ============================================================================
// State Store
// ============================================================================

/// Signal buffer TTL is 10x the freshness window (§4.2).
pub const SIGNAL_TTL_MULTIPLIER: u64 = 10;

/// Max incident summaries retained per truck (§3, §4.2).
pub const MAX_INCIDENTS_PER_TRUCK: usize = 50;

/// Max entries in the incident-id -> RiskOutput LRU cache (§3, §4.9).
pub const RISK_CACHE_CAPACITY: usize = 100;

/// Explanation TTL written alongside each explanation (§4.9), in seconds.
pub const EXPLANATION_TTL_SECS: u64 = 24 * 60 * 60;

// ============================================================================
// Perception
// ============================================================================

/// Confidence threshold when an accelerator is available (§4.3).
pub const DETECTOR_CONFIDENCE_THRESHOLD_GPU: f64 = 0.5;

/// Confidence threshold when no accelerator is available (§4.3).
pub const DETECTOR_CONFIDENCE_THRESHOLD_CPU: f64 = 0.4;

/// Tracker max-age in frames before a track is dropped (§4.3).
pub const TRACKER_MAX_AGE_FRAMES: u32 = 30;

/// Centroid ring-buffer length per track (§4.3).
pub const TRACKER_CENTROID_HISTORY: usize = 10;

// ============================================================================
// Behaviour
// ============================================================================

/// Per-track anomaly flag threshold (§4.4).
pub const BEHAVIOUR_FLAG_THRESHOLD: f64 = 0.6;

/// Dwell seconds beyond which a track counts as "near door" (§4.4).
pub const NEAR_DOOR_DWELL_SECS: f64 = 20.0;

/// Minimum track count for a crowd anomaly (§4.4): count > 4.
pub const CROWD_MIN_TRACK_COUNT: usize = 4;

/// Anomaly-score floor for a crowd anomaly (§4.4).
pub const CROWD_ANOMALY_SCORE_FLOOR: f64 = 0.5;

/// Dwell threshold for loitering (§4.4): dwell > 30s.
pub const LOITERING_DWELL_SECS: f64 = 30.0;

// ============================================================================
// Digital Twin
// ============================================================================

/// Cargo weight delta above which a deviation component is added (§4.5).
pub const TWIN_WEIGHT_DELTA_KG: f64 = 50.0;

/// Weight-delta normalization divisor (§4.5): min(|delta|/500, 1).
pub const TWIN_WEIGHT_NORMALIZER_KG: f64 = 500.0;

/// Fixed component added for door-open-without-RFID (§4.5).
pub const TWIN_DOOR_NO_RFID_COMPONENT: f64 = 0.8;

/// Route-deviation normalization divisor (§4.5): min(km/5, 1).
pub const TWIN_ROUTE_NORMALIZER_KM: f64 = 5.0;

/// Signal-strength floor below which jamming is suspected (§4.5).
pub const TWIN_WEAK_SIGNAL_THRESHOLD: f64 = 0.3;

/// Fixed component added for a weak IoT signal (§4.5).
pub const TWIN_WEAK_SIGNAL_COMPONENT: f64 = 0.4;

/// Twin status classification boundaries (§4.5).
pub const TWIN_CRITICAL_THRESHOLD: f64 = 0.7;
pub const TWIN_DEGRADED_THRESHOLD: f64 = 0.4;

/// Signal is "fresh" if received within this many seconds (§4.5).
pub const TWIN_FRESHNESS_SECS: i64 = 60;

// ============================================================================
// Route / Geofence
// ============================================================================

/// Corridor buffer in degrees, ~500 m (§4.6).
pub const CORRIDOR_BUFFER_DEGREES: f64 = 0.0045;

/// Degrees-to-km conversion factor used for distance-from-corridor (§4.6).
pub const DEGREES_TO_KM: f64 = 111.0;

/// Off-corridor deviation normalization divisor (§4.6): min(km/10, 0.6).
pub const ROUTE_DEVIATION_NORMALIZER_KM: f64 = 10.0;

/// Cap on the off-corridor base-risk contribution (§4.6).
pub const ROUTE_DEVIATION_CAP: f64 = 0.6;

/// Fixed risk-zone entry penalty (§4.6).
pub const ROUTE_RISK_ZONE_PENALTY: f64 = 0.3;

/// Night-time route risk multiplier (§4.6).
pub const ROUTE_NIGHT_MULTIPLIER: f64 = 1.5;

/// Daytime route risk multiplier (§4.6).
pub const ROUTE_DAY_MULTIPLIER: f64 = 1.0;

// ============================================================================
// Risk Fusion
// ============================================================================

/// Signals older than this are considered stale and fusion waits (§4.7).
pub const SIGNAL_STALENESS_SECS: i64 = 10;

/// Quality-factor decay rate: q(age) = exp(-k * age_s) (§4.7, GLOSSARY).
pub const QUALITY_DECAY_RATE: f64 = 0.01;

/// Temporal risk score bands (§4.7).
pub const TEMPORAL_NIGHT_SCORE: f64 = 0.8;
pub const TEMPORAL_RUSH_SCORE: f64 = 0.4;
pub const TEMPORAL_DAY_SCORE: f64 = 0.1;

/// Risk-output TTL in the state store (§4.7), in seconds.
pub const RISK_SCORE_TTL_SECS: u64 = 60;

/// Bayesian discretization boundaries (§4.7).
pub const BAYES_BEHAVIOUR_SUSPICIOUS: f64 = 0.4;
pub const BAYES_BEHAVIOUR_CRITICAL: f64 = 0.7;
pub const BAYES_TWIN_DEGRADED: f64 = 0.4;
pub const BAYES_TWIN_CRITICAL: f64 = 0.7;
pub const BAYES_ROUTE_MINOR_OFF_KM: f64 = 0.5;
pub const BAYES_ROUTE_MAJOR_OFF_KM: f64 = 2.0;

// ============================================================================
// Decision (rule table)
// ============================================================================

pub const RULE_R001_THRESHOLD: f64 = 0.85;
pub const RULE_R001_COOLDOWN_SECS: u64 = 300;
pub const RULE_R002_THRESHOLD: f64 = 0.65;
pub const RULE_R002_COOLDOWN_SECS: u64 = 600;
pub const RULE_R003_THRESHOLD: f64 = 0.45;
pub const RULE_R003_COOLDOWN_SECS: u64 = 1800;

// ============================================================================
// Concurrency / deadlines (§5)
// ============================================================================

/// Default deadline for remote calls (summarizer, notifier), in seconds.
pub const REMOTE_CALL_DEADLINE_SECS: u64 = 15;

/// Default deadline for local state-store calls, in seconds.
pub const LOCAL_CALL_DEADLINE_SECS: u64 = 1;

/// Cycle-time warning threshold for a single fused risk cycle, in ms.
pub const CYCLE_TARGET_MS: u128 = 15;

/// Fatal-restart escalation window: >5 restarts within this many seconds
/// escalates to process exit (§7).
pub const FATAL_RESTART_WINDOW_SECS: u64 = 60;
pub const FATAL_RESTART_ESCALATION_COUNT: u32 = 5;

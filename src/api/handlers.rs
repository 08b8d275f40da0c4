//! HTTP bridge request handlers (§4.10, §6): one per processor plus the
//! ambient health/metrics endpoints. Each endpoint constructs the
//! appropriate input record, calls the processor's pure computation,
//! persists durable side effects, and returns the computed output — the
//! bridge itself owns no pipeline state (§4.10).

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::decision::DecisionProcessor;
use crate::agents::digital_twin::DigitalTwinProcessor;
use crate::agents::explainability::ExplainabilityProcessor;
use crate::agents::route::RouteProcessor;
use crate::error::PipelineError;
use crate::external::store::Alert;
use crate::types::{BehaviourOutput, DecisionOutput, DoorState, IoTTelemetry, RiskOutput, RouteOutput, Track, TwinOutput};

use super::envelope::{pipeline_error_response, ApiResponse};
use super::state::BridgeState;

fn trip_error(err: crate::external::store::StoreError) -> Response {
    pipeline_error_response(&PipelineError::not_found(err.to_string()))
}

// ---------------------------------------------------------------------
// POST /agents/perception
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PerceptionRequest {
    pub trip_id: String,
    pub truck_id: String,
    pub frame_b64: String,
    pub frame_id: u64,
}

#[derive(Debug, Serialize)]
pub struct PerceptionResponse {
    pub tracks: Vec<Track>,
    pub scene_tags: Vec<crate::types::SceneTag>,
    pub alert_ref: Option<Uuid>,
}

pub async fn perception(State(state): State<BridgeState>, Json(req): Json<PerceptionRequest>) -> Response {
    if req.frame_b64.is_empty() {
        return pipeline_error_response(&PipelineError::validation("frame_b64 must not be empty"));
    }
    if let Err(e) = state.store.get_trip(&req.trip_id).await {
        return trip_error(e);
    }

    let frame = match base64::engine::general_purpose::STANDARD.decode(&req.frame_b64) {
        Ok(bytes) => bytes,
        Err(e) => return pipeline_error_response(&PipelineError::model(format!("frame decode failed: {e}"))),
    };

    let now = Utc::now();
    let output = state.perception.process(&req.truck_id, req.frame_id, &frame, now);

    let alert_ref = if !output.scene_tags.is_empty() {
        let alert = Alert {
            alert_id: Uuid::new_v4(),
            trip_id: req.trip_id.clone(),
            truck_id: req.truck_id.clone(),
            risk_level: "INFO".to_string(),
            created_at: now,
        };
        let id = alert.alert_id;
        match state.store.record_alert(alert).await {
            Ok(()) => Some(id),
            Err(e) => return trip_error(e),
        }
    } else {
        None
    };

    ApiResponse::ok(PerceptionResponse { tracks: output.tracks, scene_tags: output.scene_tags, alert_ref })
}

// ---------------------------------------------------------------------
// POST /agents/behaviour-analysis
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct BehaviourRequest {
    pub trip_id: String,
    pub truck_id: String,
    pub tracks: Vec<Track>,
}

pub async fn behaviour_analysis(State(state): State<BridgeState>, Json(req): Json<BehaviourRequest>) -> Response {
    if let Err(e) = state.store.get_trip(&req.trip_id).await {
        return trip_error(e);
    }
    let output: BehaviourOutput = state.behaviour.process(&req.truck_id, &req.tracks, Utc::now());
    ApiResponse::ok(output)
}

// ---------------------------------------------------------------------
// POST /agents/digital-twin
// ---------------------------------------------------------------------

pub async fn digital_twin(State(state): State<BridgeState>, Json(telemetry): Json<IoTTelemetry>) -> Response {
    if !(0.0..=1.0).contains(&telemetry.signal_strength) {
        return pipeline_error_response(&PipelineError::validation("signal_strength must be in [0,1]"));
    }
    // The bridge has no trip_id field on IoTTelemetry (§3); it keys
    // baseline lookup by truck_id the same way the streaming path does.
    let baseline = state.state_store.get_baseline(&telemetry.truck_id);
    let output: TwinOutput = DigitalTwinProcessor::process(&telemetry, &baseline, &state.config, Utc::now());
    ApiResponse::ok(output)
}

// ---------------------------------------------------------------------
// POST /agents/route
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub trip_id: String,
    pub truck_id: String,
    pub gps_lat: f64,
    pub gps_lon: f64,
}

pub async fn route(State(state): State<BridgeState>, Json(req): Json<RouteRequest>) -> Response {
    if !(-90.0..=90.0).contains(&req.gps_lat) || !(-180.0..=180.0).contains(&req.gps_lon) {
        return pipeline_error_response(&PipelineError::validation("gps coordinates out of range"));
    }
    if let Err(e) = state.store.get_trip(&req.trip_id).await {
        return trip_error(e);
    }

    let now = Utc::now();
    let synthetic_twin = TwinOutput {
        truck_id: req.truck_id.clone(),
        timestamp: now,
        gps_lat: req.gps_lat,
        gps_lon: req.gps_lon,
        door_state: DoorState::Closed,
        cargo_weight_kg: 0.0,
        engine_on: true,
        driver_rfid_scanned: true,
        deviation_score: 0.0,
        deviation_reasons: vec![],
        status: crate::types::TwinStatus::Nominal,
        signal_fresh: true,
    };
    let output: RouteOutput = RouteProcessor::process(&synthetic_twin, &state.geofences, &state.config, now);
    ApiResponse::ok(output)
}

// ---------------------------------------------------------------------
// POST /agents/risk-fusion
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RiskFusionRequest {
    pub trip_id: String,
    pub truck_id: String,
    pub behaviour: BehaviourOutput,
    pub twin: TwinOutput,
    pub route: RouteOutput,
}

pub async fn risk_fusion(State(state): State<BridgeState>, Json(req): Json<RiskFusionRequest>) -> Response {
    if let Err(e) = state.store.get_trip(&req.trip_id).await {
        return trip_error(e);
    }
    let output: RiskOutput =
        state.risk_fusion.fuse_now(&req.truck_id, req.behaviour, req.twin, req.route, &state.config, Utc::now());
    state.state_store.cache_risk(output.clone());
    ApiResponse::ok(output)
}

// ---------------------------------------------------------------------
// POST /agents/decision
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub trip_id: String,
    #[serde(flatten)]
    pub risk: RiskOutput,
}

pub async fn decision(State(state): State<BridgeState>, Json(req): Json<DecisionRequest>) -> Response {
    if !(0.0..=1.0).contains(&req.risk.composite_risk_score) {
        return pipeline_error_response(&PipelineError::validation("composite_risk_score must be in [0,1]"));
    }
    if let Err(e) = state.store.get_trip(&req.trip_id).await {
        return trip_error(e);
    }

    let output: DecisionOutput = DecisionProcessor::process(
        &req.risk,
        &state.config,
        state.state_store.as_ref(),
        state.notifier.as_ref(),
        &state.notify_target,
    )
    .await;

    if output.rule_id.is_some() && !output.alert_suppressed {
        if let Err(e) = state.store.escalate_trip(&req.trip_id).await {
            return trip_error(e);
        }
    }

    ApiResponse::ok(output)
}

// ---------------------------------------------------------------------
// POST /agents/explain
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    pub trip_id: String,
    pub risk_payload: RiskOutput,
    pub decision_payload: DecisionOutput,
}

pub async fn explain(State(state): State<BridgeState>, Json(req): Json<ExplainRequest>) -> Response {
    let _ = req.trip_id; // the explain endpoint doesn't require an active trip lookup — both payloads are self-contained (§4.10)
    let output = ExplainabilityProcessor::explain(
        &req.risk_payload,
        &req.decision_payload,
        state.state_store.as_ref(),
        state.summarizer.as_ref(),
    )
    .await;
    ApiResponse::ok(output)
}

// ---------------------------------------------------------------------
// Ambient: health & metrics
// ---------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn metrics() -> impl IntoResponse {
    // Plain-text Prometheus exposition, matching the teacher's
    // `/metrics` convention; the pipeline's own gauges are wired in
    // `setup.rs` once the registry exists.
    (
        [("content-type", "text/plain; version=0.0.4")],
        "fleet_sentinel_up 1\n".to_string(),
    )
}

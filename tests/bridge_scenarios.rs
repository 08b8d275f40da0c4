//! End-to-end HTTP bridge scenarios (§4.10, §8): drive a full
//! perception -> ... -> decision -> explain chain through the same
//! router `main.rs` serves, exercising request/response shapes the
//! bridge's own inline tests don't cover.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

fn peer() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

use fleet_sentinel::agents::behaviour::BehaviourProcessor;
use fleet_sentinel::agents::perception::PerceptionProcessor;
use fleet_sentinel::agents::risk_fusion::RiskFusionProcessor;
use fleet_sentinel::api::{build_router, BridgeState};
use fleet_sentinel::config::RiskConfig;
use fleet_sentinel::detect::NullDetector;
use fleet_sentinel::external::geocoder::StubGeocoder;
use fleet_sentinel::external::notifier::LoggingNotifier;
use fleet_sentinel::external::store::InMemoryStore;
use fleet_sentinel::external::summarizer::TemplateSummarizer;
use fleet_sentinel::geofence::GeofenceSet;
use fleet_sentinel::scoring::HeuristicScorer;
use fleet_sentinel::state::InMemoryStateStore;
use fleet_sentinel::types::{BehaviourOutput, RouteOutput, TwinOutput, TwinStatus};

fn router_with_trip(trip_id: &str, truck_id: &str) -> axum::Router {
    let store = InMemoryStore::new();
    store.seed_trip(trip_id, truck_id);

    let state = BridgeState {
        config: Arc::new(RiskConfig::default()),
        state_store: Arc::new(InMemoryStateStore::new()),
        geofences: Arc::new(GeofenceSet::defaults()),
        store: Arc::new(store),
        notifier: Arc::new(LoggingNotifier),
        summarizer: Arc::new(TemplateSummarizer),
        geocoder: Arc::new(StubGeocoder),
        perception: Arc::new(PerceptionProcessor::new(Box::new(NullDetector::new(false)))),
        behaviour: Arc::new(BehaviourProcessor::new(Box::new(HeuristicScorer))),
        risk_fusion: Arc::new(RiskFusionProcessor::new(None)),
        notify_target: "+15551234567".to_string(),
    };
    build_router(state)
}

async fn post_json(app: &axum::Router, path: &str, body: Value) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::post(path)
                .header("content-type", "application/json")
                .extension(ConnectInfo(peer()))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let parsed: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    // Success responses are wrapped as `{"data": ..., "meta": ...}` (§4.10);
    // error responses carry `{"error": ..., "meta": ...}` instead, so only
    // unwrap when `data` is actually present.
    let body = parsed.get("data").cloned().unwrap_or(parsed);
    (status, body)
}

fn night_anomaly_behaviour(truck_id: &str) -> BehaviourOutput {
    BehaviourOutput {
        truck_id: truck_id.to_string(),
        timestamp: chrono::Utc::now(),
        anomaly_score: 1.0,
        is_anomaly: true,
        flagged_track_ids: vec![7],
        loitering_detected: true,
        loitering_duration_s: 90.0,
        crowd_anomaly: false,
        raw_track_scores: vec![(7, 1.0)],
    }
}

fn night_anomaly_twin(truck_id: &str) -> TwinOutput {
    TwinOutput {
        truck_id: truck_id.to_string(),
        timestamp: chrono::Utc::now(),
        gps_lat: 0.0,
        gps_lon: 0.0,
        door_state: fleet_sentinel::types::DoorState::Open,
        cargo_weight_kg: 1000.0,
        engine_on: false,
        driver_rfid_scanned: false,
        deviation_score: 0.8,
        deviation_reasons: vec!["Door open without RFID authorization".to_string()],
        status: TwinStatus::Critical,
        signal_fresh: true,
    }
}

fn off_corridor_route(truck_id: &str) -> RouteOutput {
    RouteOutput {
        truck_id: truck_id.to_string(),
        timestamp: chrono::Utc::now(),
        gps_lat: 0.0,
        gps_lon: 0.0,
        in_safe_corridor: false,
        deviation_km: 2700.0,
        in_high_risk_zone: false,
        risk_zone_name: None,
        route_risk_score: 0.9,
        time_multiplier: 1.5,
        nearest_corridor_name: Some("default-corridor".to_string()),
    }
}

/// The §8 "critical door/RFID at night" scenario walked through the
/// bridge's own endpoints: fuse a near-maximal composite, confirm R001
/// fires with all three actions, confirm a second identical fusion is
/// suppressed by cooldown, and confirm explain produces readable text.
#[tokio::test]
async fn critical_night_scenario_fires_r001_and_explains() {
    let app = router_with_trip("trip-critical", "T900");

    let fusion_body = json!({
        "trip_id": "trip-critical",
        "truck_id": "T900",
        "behaviour": night_anomaly_behaviour("T900"),
        "twin": night_anomaly_twin("T900"),
        "route": off_corridor_route("T900"),
    });
    let (status, risk) = post_json(&app, "/agents/risk-fusion", fusion_body).await;
    assert_eq!(status, StatusCode::OK);
    let composite = risk["composite_risk_score"].as_f64().unwrap();
    assert!(composite >= 0.85, "expected a critical composite, got {composite}");
    assert_eq!(risk["risk_level"], json!("Critical"));

    let mut decision_body: HashMap<String, Value> =
        serde_json::from_value(risk.clone()).unwrap();
    decision_body.insert("trip_id".to_string(), json!("trip-critical"));
    let (status, decision) = post_json(&app, "/agents/decision", json!(decision_body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decision["rule_id"], json!("R001"));
    assert_eq!(decision["alert_suppressed"], json!(false));
    let actions: Vec<String> =
        serde_json::from_value(decision["actions_taken"].clone()).unwrap();
    assert!(actions.contains(&"sms".to_string()) || actions.contains(&"Sms".to_string()));

    // A second identical decision immediately after must be cooldown-suppressed.
    let mut second_body = decision_body.clone();
    second_body.insert("incident_id".to_string(), risk["incident_id"].clone());
    let (_, second) = post_json(&app, "/agents/decision", json!(second_body)).await;
    assert_eq!(second["alert_suppressed"], json!(true));

    let explain_body = json!({
        "trip_id": "trip-critical",
        "risk_payload": risk,
        "decision_payload": decision,
    });
    let (status, explanation) = post_json(&app, "/agents/explain", explain_body).await;
    assert_eq!(status, StatusCode::OK);
    let text = explanation["explanation_text"].as_str().unwrap();
    assert!(text.contains("T900"));
}

/// A calm daytime reading in the safe corridor should never reach the
/// bridge's rule table.
#[tokio::test]
async fn benign_daytime_scenario_fires_no_rule() {
    let app = router_with_trip("trip-benign", "T901");

    let behaviour = BehaviourOutput {
        truck_id: "T901".to_string(),
        timestamp: chrono::Utc::now(),
        anomaly_score: 0.0,
        is_anomaly: false,
        flagged_track_ids: vec![],
        loitering_detected: false,
        loitering_duration_s: 0.0,
        crowd_anomaly: false,
        raw_track_scores: vec![],
    };
    let twin = TwinOutput {
        truck_id: "T901".to_string(),
        timestamp: chrono::Utc::now(),
        gps_lat: 30.0,
        gps_lon: -100.0,
        door_state: fleet_sentinel::types::DoorState::Closed,
        cargo_weight_kg: 1000.0,
        engine_on: true,
        driver_rfid_scanned: true,
        deviation_score: 0.0,
        deviation_reasons: vec![],
        status: TwinStatus::Nominal,
        signal_fresh: true,
    };
    let route = RouteOutput {
        truck_id: "T901".to_string(),
        timestamp: chrono::Utc::now(),
        gps_lat: 30.0,
        gps_lon: -100.0,
        in_safe_corridor: true,
        deviation_km: 0.0,
        in_high_risk_zone: false,
        risk_zone_name: None,
        route_risk_score: 0.0,
        time_multiplier: 1.0,
        nearest_corridor_name: None,
    };

    let fusion_body =
        json!({"trip_id": "trip-benign", "truck_id": "T901", "behaviour": behaviour, "twin": twin, "route": route});
    let (_, risk) = post_json(&app, "/agents/risk-fusion", fusion_body).await;
    assert_eq!(risk["risk_level"], json!("Low"));

    let mut decision_body: HashMap<String, Value> = serde_json::from_value(risk).unwrap();
    decision_body.insert("trip_id".to_string(), json!("trip-benign"));
    let (_, decision) = post_json(&app, "/agents/decision", json!(decision_body)).await;
    assert_eq!(decision["rule_id"], Value::Null);
    assert_eq!(decision["alert_suppressed"], json!(false));
}

/// §6/§4.10: every endpoint keyed off a trip_id 404s for an unseeded trip.
#[tokio::test]
async fn unknown_trip_is_404_on_every_trip_scoped_endpoint() {
    let app = router_with_trip("trip-real", "T902");

    let (status, _) = post_json(
        &app,
        "/agents/perception",
        json!({"trip_id": "nope", "truck_id": "T902", "frame_b64": "AAAA", "frame_id": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post_json(
        &app,
        "/agents/behaviour-analysis",
        json!({"trip_id": "nope", "truck_id": "T902", "tracks": []}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
        post_json(&app, "/agents/route", json!({"trip_id": "nope", "truck_id": "T902", "gps_lat": 0.0, "gps_lon": 0.0}))
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn healthz_and_metrics_are_reachable() {
    let app = router_with_trip("trip-x", "T903");
    let (status, _) = post_json(&app, "/healthz", json!({})).await;
    // /healthz is a GET-only route; POSTing it should 405, not 404/500.
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let resp = app
        .oneshot(
            Request::get("/healthz")
                .extension(ConnectInfo(peer()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

//! HTTP bridge route table (§4.10, §6).

use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use super::state::BridgeState;

pub fn bridge_routes(state: BridgeState) -> Router {
    Router::new()
        .route("/agents/perception", post(handlers::perception))
        .route("/agents/behaviour-analysis", post(handlers::behaviour_analysis))
        .route("/agents/digital-twin", post(handlers::digital_twin))
        .route("/agents/route", post(handlers::route))
        .route("/agents/risk-fusion", post(handlers::risk_fusion))
        .route("/agents/decision", post(handlers::decision))
        .route("/agents/explain", post(handlers::explain))
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

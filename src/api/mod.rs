//! HTTP Bridge (§4.10): a synchronous surface that invokes any processor's
//! core computation directly, without going through the bus.

pub mod envelope;
pub mod handlers;
mod routes;
mod state;

pub use state::BridgeState;

use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete bridge router: `/agents/*` plus `/healthz` and
/// `/metrics`, wrapped in the same rate-limit/compression/trace/CORS
/// stack the fleet hub uses (§5: "bridge requests must not corrupt shared
/// state" — the governor bounds request volume per IP rather than
/// relying on callers to behave).
pub fn build_router(state: BridgeState) -> axum::Router {
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(20)
            .burst_size(50)
            .finish()
            .expect("valid governor config"),
    );

    routes::bridge_routes(state)
        .layer(GovernorLayer { config: governor_config })
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

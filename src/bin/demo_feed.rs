//! Self-contained synthetic-data demo: wires the same Bus, State Store,
//! and processor stack as the server binary, then drives it with
//! randomly generated camera frames and IoT telemetry for a handful of
//! trucks, occasionally injecting a theft-like scenario (loitering,
//! door-open-no-RFID at night, off-corridor travel) so the pipeline has
//! something to fire a rule on.
//!
//! ```bash
//! cargo run --bin demo-feed -- --trucks 3 --ticks 60
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, TimeZone, Utc};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tokio::sync::watch;
use tracing::info;

use fleet_sentinel::agents::behaviour::BehaviourProcessor;
use fleet_sentinel::agents::perception::PerceptionProcessor;
use fleet_sentinel::agents::risk_fusion::RiskFusionProcessor;
use fleet_sentinel::agents::{decision, digital_twin, explainability, route};
use fleet_sentinel::background::Supervisor;
use fleet_sentinel::bus::{topics, Bus};
use fleet_sentinel::config::{self, RiskConfig};
use fleet_sentinel::detect::NullDetector;
use fleet_sentinel::external::notifier::LoggingNotifier;
use fleet_sentinel::external::summarizer::TemplateSummarizer;
use fleet_sentinel::geofence::GeofenceSet;
use fleet_sentinel::scoring::HeuristicScorer;
use fleet_sentinel::state::InMemoryStateStore;
use fleet_sentinel::types::{CameraFrame, DoorState, IoTTelemetry};

#[derive(Parser, Debug)]
#[command(name = "demo-feed", about = "Synthetic signal generator for Fleet Sentinel")]
struct CliArgs {
    /// Number of distinct trucks to simulate.
    #[arg(long, default_value_t = 3)]
    trucks: u32,

    /// Number of telemetry ticks to generate per truck.
    #[arg(long, default_value_t = 60)]
    ticks: u32,

    /// Delay between ticks.
    #[arg(long, default_value_t = 150)]
    interval_ms: u64,

    /// Every Nth tick, one truck gets an anomalous reading (door open,
    /// no RFID, off-corridor, at night) to exercise the rule table.
    #[arg(long, default_value_t = 10)]
    anomaly_every: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    config::init(RiskConfig::load());
    let cfg: &'static RiskConfig = config::get();

    let bus = Arc::new(Bus::new(cfg.bus.subscriber_capacity));
    let state_store = Arc::new(InMemoryStateStore::new());
    let geofences = Arc::new(GeofenceSet::defaults());
    let perception = Arc::new(PerceptionProcessor::new(Box::new(NullDetector::new(false))));
    let behaviour = Arc::new(BehaviourProcessor::new(Box::new(HeuristicScorer)));
    let risk_fusion = Arc::new(RiskFusionProcessor::new(None));
    let notifier = Arc::new(LoggingNotifier);
    let summarizer = Arc::new(TemplateSummarizer);

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut tasks = tokio::task::JoinSet::new();

    macro_rules! spawn_supervised {
        ($name:expr, $body:expr) => {{
            let stop = stop_rx.clone();
            tasks.spawn(async move {
                Supervisor::new($name, cfg.supervisor.clone()).supervise(stop, $body).await;
            });
        }};
    }

    {
        let bus = bus.clone();
        let perception = perception.clone();
        spawn_supervised!("perception", move || {
            let bus = bus.clone();
            let perception = perception.clone();
            async move { fleet_sentinel::agents::perception::run(&bus, &perception).await }
        });
    }
    {
        let bus = bus.clone();
        let behaviour = behaviour.clone();
        spawn_supervised!("behaviour", move || {
            let bus = bus.clone();
            let behaviour = behaviour.clone();
            async move { fleet_sentinel::agents::behaviour::run(&bus, &behaviour).await }
        });
    }
    {
        let bus = bus.clone();
        let state_store = state_store.clone();
        spawn_supervised!("digital_twin", move || {
            let bus = bus.clone();
            let state_store = state_store.clone();
            async move { digital_twin::run(&bus, state_store.as_ref(), cfg).await }
        });
    }
    {
        let bus = bus.clone();
        let geofences = geofences.clone();
        spawn_supervised!("route", move || {
            let bus = bus.clone();
            let geofences = geofences.clone();
            async move { route::run(&bus, &geofences, cfg).await }
        });
    }
    {
        let bus = bus.clone();
        let risk_fusion = risk_fusion.clone();
        let state_store = state_store.clone();
        spawn_supervised!("risk_fusion", move || {
            let bus = bus.clone();
            let risk_fusion = risk_fusion.clone();
            let state_store = state_store.clone();
            async move { fleet_sentinel::agents::risk_fusion::run(&bus, &risk_fusion, state_store.as_ref(), cfg).await }
        });
    }
    {
        let bus = bus.clone();
        let state_store = state_store.clone();
        let notifier = notifier.clone();
        spawn_supervised!("decision", move || {
            let bus = bus.clone();
            let state_store = state_store.clone();
            let notifier = notifier.clone();
            async move { decision::run(&bus, cfg, state_store.as_ref(), notifier.as_ref(), "+15551234567").await }
        });
    }
    {
        let bus = bus.clone();
        let state_store = state_store.clone();
        let summarizer = summarizer.clone();
        spawn_supervised!("explainability", move || {
            let bus = bus.clone();
            let state_store = state_store.clone();
            let summarizer = summarizer.clone();
            async move { explainability::run(&bus, state_store.as_ref(), summarizer.as_ref()).await }
        });
    }

    // Print every decision and explanation as they arrive, so a demo run
    // is readable without a separate log-grepping step.
    {
        let mut decision_sub = bus.subscribe_bytes(topics::DECISION_OUTPUT);
        let mut explain_sub = bus.subscribe_bytes(topics::EXPLAIN_OUTPUT);
        tasks.spawn(async move {
            loop {
                tokio::select! {
                    d = decision_sub.recv() => {
                        let Some(d) = d else { break; };
                        if let Ok(out) = serde_json::from_slice::<fleet_sentinel::types::DecisionOutput>(&d.payload) {
                            if out.rule_id.is_some() {
                                info!(truck_id = %out.truck_id, rule = ?out.rule_name, risk = out.risk_score, "decision fired");
                            }
                        }
                    }
                    e = explain_sub.recv() => {
                        let Some(e) = e else { break; };
                        if let Ok(out) = serde_json::from_slice::<fleet_sentinel::types::ExplanationOutput>(&e.payload) {
                            info!(truck_id = %out.truck_id, "{}", out.explanation_text);
                        }
                    }
                }
            }
        });
    }

    let truck_ids: Vec<String> = (0..args.trucks).map(|i| format!("T{:03}", i + 1)).collect();
    let mut rng = StdRng::from_entropy();
    let weight_jitter = Normal::new(0.0_f64, 15.0).expect("valid normal distribution");
    let gps_jitter = Normal::new(0.0_f64, 0.01).expect("valid normal distribution");

    // A point inside the default corridor, and a point inside the default
    // high-risk zone, matching `GeofenceSet::defaults()`.
    let corridor_center = (37.5, -96.0);
    let risk_zone_point = (33.75, -118.27);

    for tick in 0..args.ticks {
        for (idx, truck_id) in truck_ids.iter().enumerate() {
            let now = Utc::now();
            let anomalous = args.anomaly_every > 0 && tick % args.anomaly_every == 0 && idx == 0;

            let frame = CameraFrame {
                truck_id: truck_id.clone(),
                frame_id: u64::from(tick),
                timestamp: now,
                frame: (0..64).map(|_| rng.gen::<u8>()).collect(),
            };
            if let Err(e) = bus.publish(topics::CAMERA_FRAMES, &frame) {
                tracing::warn!(error = %e, "failed to publish demo camera frame");
            }

            let (door_state, rfid, gps_lat, gps_lon, hour_offset) = if anomalous {
                (DoorState::Open, false, risk_zone_point.0, risk_zone_point.1, 2)
            } else {
                (
                    DoorState::Closed,
                    true,
                    corridor_center.0 + gps_jitter.sample(&mut rng),
                    corridor_center.1 + gps_jitter.sample(&mut rng),
                    14,
                )
            };
            let timestamp = Utc
                .with_ymd_and_hms(now.year(), now.month(), now.day(), hour_offset, 0, 0)
                .single()
                .unwrap_or(now);

            let telemetry = IoTTelemetry {
                truck_id: truck_id.clone(),
                timestamp,
                gps_lat,
                gps_lon,
                door_state,
                cargo_weight_kg: 12_000.0 + weight_jitter.sample(&mut rng),
                engine_on: true,
                driver_rfid_scanned: rfid,
                signal_strength: rng.gen_range(0.7..=1.0),
            };
            if let Err(e) = bus.publish(topics::IOT_TELEMETRY, &telemetry) {
                tracing::warn!(error = %e, "failed to publish demo telemetry");
            }
        }
        tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
    }

    // Let the pipeline drain any in-flight messages before shutting down.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let _ = stop_tx.send(true);
    tasks.shutdown().await;
    info!("demo feed complete");
    Ok(())
}

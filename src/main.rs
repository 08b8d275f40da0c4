//! Fleet Sentinel entry point: wires the Bus, State Store, external
//! capabilities, and every processor's streaming task, then serves the
//! HTTP bridge alongside them until Ctrl+C.

use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use fleet_sentinel::agents::behaviour::BehaviourProcessor;
use fleet_sentinel::agents::perception::PerceptionProcessor;
use fleet_sentinel::agents::risk_fusion::RiskFusionProcessor;
use fleet_sentinel::agents::{decision, digital_twin, explainability, route};
use fleet_sentinel::api::{build_router, BridgeState};
use fleet_sentinel::background::Supervisor;
use fleet_sentinel::bus::Bus;
use fleet_sentinel::config::{self, LlmProvider, RiskConfig};
use fleet_sentinel::detect::NullDetector;
use fleet_sentinel::external::geocoder::StubGeocoder;
use fleet_sentinel::external::notifier::LoggingNotifier;
use fleet_sentinel::external::store::InMemoryStore;
use fleet_sentinel::external::summarizer::{RemoteSummarizer, TemplateSummarizer};
use fleet_sentinel::external::{Geocoder, Notifier, Store, Summarizer};
use fleet_sentinel::geofence::GeofenceSet;
use fleet_sentinel::scoring::HeuristicScorer;
use fleet_sentinel::state::persistence::{PersistedStateStore, PersistentStore};
use fleet_sentinel::state::StateStore;

/// Real-time cargo-theft risk assessment pipeline for truck fleets.
#[derive(Parser, Debug)]
#[command(name = "fleet-sentinel", version, about)]
struct CliArgs {
    /// Override the HTTP bridge bind address (defaults to config/env).
    #[arg(long)]
    bind: Option<String>,

    /// Directory for a sled database persisting baselines across restarts.
    /// Unset runs with in-memory baselines only.
    #[arg(long, env = "FLEET_PERSIST_PATH")]
    persist: Option<PathBuf>,

    /// Path to a JSON corridor/risk-zone geometry file. Unset uses the
    /// built-in default geofence set.
    #[arg(long, env = "FLEET_GEOMETRY_PATH")]
    geometry: Option<String>,

    /// Destination phone number / address the notifier dispatches to.
    #[arg(long, default_value = "+15551234567")]
    notify_target: String,
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
    let risk_config = Arc::new(config::get().clone());

    let bind_addr = args.bind.clone().unwrap_or_else(|| risk_config.server.bind_addr.clone());

    info!("Fleet Sentinel — real-time cargo-theft risk assessment pipeline");

    let disk = args.persist.as_ref().and_then(PersistentStore::open_or_warn);
    let state_store: Arc<dyn StateStore> = Arc::new(PersistedStateStore::new(disk));

    let geofences = Arc::new(GeofenceSet::load(args.geometry.as_deref()));
    let bus = Arc::new(Bus::new(risk_config.bus.subscriber_capacity));

    let notifier: Arc<dyn Notifier> = Arc::new(LoggingNotifier);
    let geocoder: Arc<dyn Geocoder> = Arc::new(StubGeocoder);
    let summarizer: Arc<dyn Summarizer> = match risk_config.llm.provider {
        LlmProvider::Remote => match &risk_config.llm.remote_endpoint {
            Some(endpoint) => Arc::new(RemoteSummarizer::new(
                endpoint.clone(),
                std::time::Duration::from_secs(risk_config.llm.remote_deadline_s),
            )),
            None => {
                tracing::warn!("LLM_PROVIDER=remote but no remote_endpoint configured, falling back to template");
                Arc::new(TemplateSummarizer)
            }
        },
        // No local-model crate in this workspace's lineage (§6) — local
        // falls back to the same deterministic template as the default.
        LlmProvider::Local | LlmProvider::Template => Arc::new(TemplateSummarizer),
    };

    let perception = Arc::new(PerceptionProcessor::new(Box::new(NullDetector::new(false))));
    let behaviour = Arc::new(BehaviourProcessor::new(Box::new(HeuristicScorer)));
    let risk_fusion = Arc::new(RiskFusionProcessor::new(None));
    let trip_store: Arc<dyn Store> = Arc::new(InMemoryStore::new());

    let bridge_state = BridgeState {
        config: risk_config.clone(),
        state_store: state_store.clone(),
        geofences: geofences.clone(),
        store: trip_store,
        notifier: notifier.clone(),
        summarizer: summarizer.clone(),
        geocoder,
        perception: perception.clone(),
        behaviour: behaviour.clone(),
        risk_fusion: risk_fusion.clone(),
        notify_target: args.notify_target.clone(),
    };

    let (stop_tx, stop_rx) = watch::channel(false);

    // `config::get()` is a `&'static RiskConfig` — Copy, Send, Sync — so
    // every supervised task below borrows it directly instead of cloning
    // the whole config per task.
    let cfg: &'static RiskConfig = config::get();
    let mut tasks = tokio::task::JoinSet::new();

    {
        let bus = bus.clone();
        let perception = perception.clone();
        let stop = stop_rx.clone();
        tasks.spawn(async move {
            Supervisor::new("perception", cfg.supervisor.clone())
                .supervise(stop, || {
                    let bus = bus.clone();
                    let perception = perception.clone();
                    async move { fleet_sentinel::agents::perception::run(&bus, &perception).await }
                })
                .await;
        });
    }
    {
        let bus = bus.clone();
        let behaviour = behaviour.clone();
        let stop = stop_rx.clone();
        tasks.spawn(async move {
            Supervisor::new("behaviour", cfg.supervisor.clone())
                .supervise(stop, || {
                    let bus = bus.clone();
                    let behaviour = behaviour.clone();
                    async move { fleet_sentinel::agents::behaviour::run(&bus, &behaviour).await }
                })
                .await;
        });
    }
    {
        let bus = bus.clone();
        let state_store = state_store.clone();
        let stop = stop_rx.clone();
        tasks.spawn(async move {
            Supervisor::new("digital_twin", cfg.supervisor.clone())
                .supervise(stop, || {
                    let bus = bus.clone();
                    let state_store = state_store.clone();
                    async move { digital_twin::run(&bus, state_store.as_ref(), cfg).await }
                })
                .await;
        });
    }
    {
        let bus = bus.clone();
        let geofences = geofences.clone();
        let stop = stop_rx.clone();
        tasks.spawn(async move {
            Supervisor::new("route", cfg.supervisor.clone())
                .supervise(stop, || {
                    let bus = bus.clone();
                    let geofences = geofences.clone();
                    async move { route::run(&bus, &geofences, cfg).await }
                })
                .await;
        });
    }
    {
        let bus = bus.clone();
        let risk_fusion = risk_fusion.clone();
        let state_store = state_store.clone();
        let stop = stop_rx.clone();
        tasks.spawn(async move {
            Supervisor::new("risk_fusion", cfg.supervisor.clone())
                .supervise(stop, || {
                    let bus = bus.clone();
                    let risk_fusion = risk_fusion.clone();
                    let state_store = state_store.clone();
                    async move {
                        fleet_sentinel::agents::risk_fusion::run(&bus, &risk_fusion, state_store.as_ref(), cfg).await
                    }
                })
                .await;
        });
    }
    {
        let bus = bus.clone();
        let state_store = state_store.clone();
        let notifier = notifier.clone();
        let notify_target = args.notify_target.clone();
        let stop = stop_rx.clone();
        tasks.spawn(async move {
            Supervisor::new("decision", cfg.supervisor.clone())
                .supervise(stop, || {
                    let bus = bus.clone();
                    let state_store = state_store.clone();
                    let notifier = notifier.clone();
                    let notify_target = notify_target.clone();
                    async move {
                        decision::run(&bus, cfg, state_store.as_ref(), notifier.as_ref(), &notify_target).await
                    }
                })
                .await;
        });
    }
    {
        let bus = bus.clone();
        let state_store = state_store.clone();
        let summarizer = summarizer.clone();
        let stop = stop_rx.clone();
        tasks.spawn(async move {
            Supervisor::new("explainability", cfg.supervisor.clone())
                .supervise(stop, || {
                    let bus = bus.clone();
                    let state_store = state_store.clone();
                    let summarizer = summarizer.clone();
                    async move { explainability::run(&bus, state_store.as_ref(), summarizer.as_ref()).await }
                })
                .await;
        });
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "HTTP bridge listening");
    let router = build_router(bridge_state);

    tokio::select! {
        result = axum::serve(listener, router).into_future() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP bridge server exited with an error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down");
        }
    }

    let _ = stop_tx.send(true);
    tasks.shutdown().await;

    info!("Fleet Sentinel shutdown complete");
    Ok(())
}

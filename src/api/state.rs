//! Shared application state for the HTTP bridge (§4.10).
//!
//! The bridge holds only its own bookkeeping (the trip/alert `Store`) plus
//! singleton processor instances; the State Store, GeofenceSet, and config
//! are exactly the instances the streaming path uses, so a bridge call and
//! a bus-driven call for the same truck see consistent state.

use std::sync::Arc;

use crate::agents::behaviour::BehaviourProcessor;
use crate::agents::perception::PerceptionProcessor;
use crate::agents::risk_fusion::RiskFusionProcessor;
use crate::config::RiskConfig;
use crate::external::{Geocoder, Notifier, Store, Summarizer};
use crate::geofence::GeofenceSet;
use crate::state::StateStore;

#[derive(Clone)]
pub struct BridgeState {
    pub config: Arc<RiskConfig>,
    pub state_store: Arc<dyn StateStore>,
    pub geofences: Arc<GeofenceSet>,
    pub store: Arc<dyn Store>,
    pub notifier: Arc<dyn Notifier>,
    pub summarizer: Arc<dyn Summarizer>,
    pub geocoder: Arc<dyn Geocoder>,
    pub perception: Arc<PerceptionProcessor>,
    pub behaviour: Arc<BehaviourProcessor>,
    pub risk_fusion: Arc<RiskFusionProcessor>,
    pub notify_target: String,
}

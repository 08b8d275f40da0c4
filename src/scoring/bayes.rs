//! Hand-rolled discrete Bayesian-network evaluator for risk fusion's
//! optional second scoring path (§4.7).
//!
//! No crate in this workspace's lineage offers Bayesian-network inference,
//! so the network is represented directly as its conditional probability
//! table over four discretized parents — BehaviourRisk, TwinDeviation,
//! RouteCompliance, TimeOfDay — and one child, TheftRisk. This mirrors the
//! capability-with-deterministic-fallback shape used elsewhere for
//! optional artifacts: when no table is loaded, risk fusion simply never
//! calls into this module and uses the weighted-fallback path instead.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviourBand {
    Normal,
    Suspicious,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TwinBand {
    Nominal,
    Degraded,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteBand {
    OnRoute,
    MinorOff,
    MajorOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeBand {
    Day,
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TheftRiskClass {
    Low,
    Medium,
    High,
    Critical,
}

impl TheftRiskClass {
    /// Weight used to fold a probability distribution over classes into a
    /// single composite score (§4.7).
    fn weight(self) -> f64 {
        match self {
            Self::Low => 0.0,
            Self::Medium => 0.33,
            Self::High => 0.67,
            Self::Critical => 1.0,
        }
    }
}

pub fn discretize_behaviour(anomaly_score: f64) -> BehaviourBand {
    if anomaly_score >= crate::config::defaults::BAYES_BEHAVIOUR_CRITICAL {
        BehaviourBand::Critical
    } else if anomaly_score >= crate::config::defaults::BAYES_BEHAVIOUR_SUSPICIOUS {
        BehaviourBand::Suspicious
    } else {
        BehaviourBand::Normal
    }
}

pub fn discretize_twin(deviation_score: f64) -> TwinBand {
    if deviation_score >= crate::config::defaults::BAYES_TWIN_CRITICAL {
        TwinBand::Critical
    } else if deviation_score >= crate::config::defaults::BAYES_TWIN_DEGRADED {
        TwinBand::Degraded
    } else {
        TwinBand::Nominal
    }
}

pub fn discretize_route(deviation_km: f64) -> RouteBand {
    if deviation_km >= crate::config::defaults::BAYES_ROUTE_MAJOR_OFF_KM {
        RouteBand::MajorOff
    } else if deviation_km >= crate::config::defaults::BAYES_ROUTE_MINOR_OFF_KM {
        RouteBand::MinorOff
    } else {
        RouteBand::OnRoute
    }
}

pub fn discretize_time(hour: u32) -> TimeBand {
    if (22..24).contains(&hour) || (0..6).contains(&hour) {
        TimeBand::Night
    } else {
        TimeBand::Day
    }
}

/// A discrete conditional probability table over TheftRisk given the four
/// discretized parents. Rows not present fall back to a uniform
/// distribution, so an incomplete table degrades gracefully rather than
/// panicking.
#[derive(Debug, Clone, Default)]
pub struct TheftRiskTable {
    rows: HashMap<(BehaviourBand, TwinBand, RouteBand, TimeBand), [f64; 4]>,
}

impl TheftRiskTable {
    pub fn new() -> Self {
        Self { rows: HashMap::new() }
    }

    pub fn set_row(
        &mut self,
        key: (BehaviourBand, TwinBand, RouteBand, TimeBand),
        probabilities: [f64; 4],
    ) {
        self.rows.insert(key, probabilities);
    }

    fn distribution(&self, key: (BehaviourBand, TwinBand, RouteBand, TimeBand)) -> [f64; 4] {
        self.rows.get(&key).copied().unwrap_or([0.25, 0.25, 0.25, 0.25])
    }

    /// Query P(TheftRisk | parents) and fold it into a composite score and
    /// confidence (§4.7): composite = Σ p(c)·w(c), confidence = max p(c).
    pub fn query(
        &self,
        behaviour: BehaviourBand,
        twin: TwinBand,
        route: RouteBand,
        time: TimeBand,
    ) -> (f64, f64) {
        let dist = self.distribution((behaviour, twin, route, time));
        let classes = [
            TheftRiskClass::Low,
            TheftRiskClass::Medium,
            TheftRiskClass::High,
            TheftRiskClass::Critical,
        ];
        let composite: f64 = dist.iter().zip(classes.iter()).map(|(p, c)| p * c.weight()).sum();
        let confidence = dist.iter().cloned().fold(0.0_f64, f64::max);
        (crate::types::clip01(composite), confidence)
    }

    /// A reasonable built-in table: risk increases monotonically with
    /// how many parents are in their worst band. Used only by tests and
    /// as a seed for an operator-supplied artifact.
    pub fn monotonic_default() -> Self {
        let mut table = Self::new();
        let behaviours = [BehaviourBand::Normal, BehaviourBand::Suspicious, BehaviourBand::Critical];
        let twins = [TwinBand::Nominal, TwinBand::Degraded, TwinBand::Critical];
        let routes = [RouteBand::OnRoute, RouteBand::MinorOff, RouteBand::MajorOff];
        let times = [TimeBand::Day, TimeBand::Night];

        for &b in &behaviours {
            for &t in &twins {
                for &r in &routes {
                    for &tm in &times {
                        let severity = severity_index(b) + severity_index_twin(t) + severity_index_route(r)
                            + if tm == TimeBand::Night { 1 } else { 0 };
                        table.set_row((b, t, r, tm), severity_to_distribution(severity));
                    }
                }
            }
        }
        table
    }
}

fn severity_index(b: BehaviourBand) -> u32 {
    match b {
        BehaviourBand::Normal => 0,
        BehaviourBand::Suspicious => 1,
        BehaviourBand::Critical => 2,
    }
}

fn severity_index_twin(t: TwinBand) -> u32 {
    match t {
        TwinBand::Nominal => 0,
        TwinBand::Degraded => 1,
        TwinBand::Critical => 2,
    }
}

fn severity_index_route(r: RouteBand) -> u32 {
    match r {
        RouteBand::OnRoute => 0,
        RouteBand::MinorOff => 1,
        RouteBand::MajorOff => 2,
    }
}

fn severity_to_distribution(severity: u32) -> [f64; 4] {
    match severity {
        0 => [0.85, 0.10, 0.04, 0.01],
        1 => [0.55, 0.30, 0.10, 0.05],
        2 => [0.30, 0.35, 0.25, 0.10],
        3 => [0.15, 0.30, 0.35, 0.20],
        4 => [0.05, 0.20, 0.35, 0.40],
        5 => [0.02, 0.10, 0.28, 0.60],
        _ => [0.01, 0.04, 0.15, 0.80],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discretize_behaviour_bands_match_thresholds() {
        assert_eq!(discretize_behaviour(0.1), BehaviourBand::Normal);
        assert_eq!(discretize_behaviour(0.5), BehaviourBand::Suspicious);
        assert_eq!(discretize_behaviour(0.9), BehaviourBand::Critical);
    }

    #[test]
    fn discretize_route_bands_match_thresholds() {
        assert_eq!(discretize_route(0.1), RouteBand::OnRoute);
        assert_eq!(discretize_route(1.0), RouteBand::MinorOff);
        assert_eq!(discretize_route(5.0), RouteBand::MajorOff);
    }

    #[test]
    fn worst_case_row_has_highest_composite() {
        let table = TheftRiskTable::monotonic_default();
        let (best, _) = table.query(BehaviourBand::Normal, TwinBand::Nominal, RouteBand::OnRoute, TimeBand::Day);
        let (worst, _) =
            table.query(BehaviourBand::Critical, TwinBand::Critical, RouteBand::MajorOff, TimeBand::Night);
        assert!(worst > best);
    }

    #[test]
    fn missing_row_falls_back_to_uniform() {
        let table = TheftRiskTable::new();
        let (composite, confidence) =
            table.query(BehaviourBand::Normal, TwinBand::Nominal, RouteBand::OnRoute, TimeBand::Day);
        assert!((confidence - 0.25).abs() < 1e-9);
        assert!(composite > 0.0);
    }
}

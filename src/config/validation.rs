use super::risk_config::{ConfigError, RiskConfig};

/// Validate a loaded config for internal consistency. Mirrors the
/// teacher's config-validation discipline: catch operator mistakes at
/// load time rather than at the first anomalous request.
pub fn validate(config: &RiskConfig) -> Result<(), ConfigError> {
    let w = &config.fusion.weights;
    for (name, value) in [
        ("behaviour", w.behaviour),
        ("twin", w.twin),
        ("route", w.route),
        ("temporal", w.temporal),
    ] {
        if value < 0.0 {
            return Err(ConfigError::Invalid(format!("fusion.weights.{name} must be >= 0")));
        }
    }

    if config.fusion.signal_staleness_s <= 0 {
        return Err(ConfigError::Invalid("fusion.signal_staleness_s must be positive".into()));
    }

    if config.fusion.quality_decay_rate < 0.0 {
        return Err(ConfigError::Invalid("fusion.quality_decay_rate must be >= 0".into()));
    }

    let mut rules = config.rules.table.clone();
    rules.sort_by_key(|r| r.priority);
    for r in &rules {
        if !(0.0..=1.0).contains(&r.threshold_low) {
            return Err(ConfigError::Invalid(format!("rule {} threshold_low out of [0,1]", r.id)));
        }
        if r.cooldown_s == 0 {
            return Err(ConfigError::Invalid(format!("rule {} cooldown_s must be > 0", r.id)));
        }
    }

    if config.route.corridor_buffer_degrees < 0.0 {
        return Err(ConfigError::Invalid("route.corridor_buffer_degrees must be >= 0".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RiskConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut cfg = RiskConfig::default();
        cfg.fusion.weights.behaviour = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_cooldown_is_rejected() {
        let mut cfg = RiskConfig::default();
        cfg.rules.table[0].cooldown_s = 0;
        assert!(cfg.validate().is_err());
    }
}

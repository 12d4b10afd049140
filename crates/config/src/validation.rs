//! Configuration bound checks

use crate::{ConfigError, EngineConfig, Result};

/// Validation failure detail
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate an engine configuration, collecting every violation
pub fn validate_config(config: &EngineConfig) -> Result<()> {
    let mut issues = Vec::new();

    // Hop bounds are configurable policy with a sane ceiling; liquidity
    // degrades sharply past a couple of hops.
    if config.discovery.max_swap_hops > 4 {
        issues.push(ValidationIssue::new(
            "discovery.max_swap_hops",
            "must be <= 4",
        ));
    }
    if config.discovery.max_bridge_hops > 3 {
        issues.push(ValidationIssue::new(
            "discovery.max_bridge_hops",
            "must be <= 3",
        ));
    }
    if config.discovery.max_swap_hops == 0 && config.discovery.max_bridge_hops == 0 {
        issues.push(ValidationIssue::new(
            "discovery",
            "at least one of max_swap_hops/max_bridge_hops must be nonzero",
        ));
    }
    if config.discovery.max_concurrent_sources == 0 {
        issues.push(ValidationIssue::new(
            "discovery.max_concurrent_sources",
            "must be greater than 0",
        ));
    }
    if config.discovery.discovery_timeout_ms == 0 {
        issues.push(ValidationIssue::new(
            "discovery.discovery_timeout_ms",
            "must be greater than 0",
        ));
    }
    if config.discovery.balance_timeout_ms == 0 {
        issues.push(ValidationIssue::new(
            "discovery.balance_timeout_ms",
            "must be greater than 0",
        ));
    }

    if config.scoring.slippage_bps >= 10_000 {
        issues.push(ValidationIssue::new(
            "scoring.slippage_bps",
            "must be < 10000 (100%)",
        ));
    }
    for (field, value) in [
        ("scoring.time_weight", &config.scoring.time_weight),
        ("scoring.impact_threshold", &config.scoring.impact_threshold),
        ("scoring.impact_penalty", &config.scoring.impact_penalty),
        (
            "scoring.bridge_estimate_penalty",
            &config.scoring.bridge_estimate_penalty,
        ),
    ] {
        match value.parse::<f64>() {
            Ok(parsed) if parsed >= 0.0 => {}
            _ => issues.push(ValidationIssue::new(
                field,
                "must be a non-negative decimal",
            )),
        }
    }

    if config.execution.max_attempts == 0 {
        issues.push(ValidationIssue::new(
            "execution.max_attempts",
            "must be greater than 0",
        ));
    }
    if config.execution.max_attempts > 10 {
        issues.push(ValidationIssue::new(
            "execution.max_attempts",
            "must be <= 10",
        ));
    }
    if config.execution.backoff_base_ms == 0 {
        issues.push(ValidationIssue::new(
            "execution.backoff_base_ms",
            "must be greater than 0",
        ));
    }
    if config.execution.backoff_cap_ms < config.execution.backoff_base_ms {
        issues.push(ValidationIssue::new(
            "execution.backoff_cap_ms",
            "must be >= backoff_base_ms",
        ));
    }
    if config.execution.quote_max_age_secs == 0 {
        issues.push(ValidationIssue::new(
            "execution.quote_max_age_secs",
            "must be greater than 0",
        ));
    }
    if config.execution.confirm_timeout_secs == 0 {
        issues.push(ValidationIssue::new(
            "execution.confirm_timeout_secs",
            "must be greater than 0",
        ));
    }
    if config.execution.bridge_poll_interval_ms == 0 {
        issues.push(ValidationIssue::new(
            "execution.bridge_poll_interval_ms",
            "must be greater than 0",
        ));
    }
    if config.execution.bridge_timeout_secs == 0 {
        issues.push(ValidationIssue::new(
            "execution.bridge_timeout_secs",
            "must be greater than 0",
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        let joined = issues
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::ValidationError(joined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_excess_slippage_rejected() {
        let mut config = EngineConfig::default();
        config.scoring.slippage_bps = 10_000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_hop_bounds_ceiling() {
        let mut config = EngineConfig::default();
        config.discovery.max_swap_hops = 5;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_swap_hops"));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let mut config = EngineConfig::default();
        config.execution.max_attempts = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_bad_decimal_weight_rejected() {
        let mut config = EngineConfig::default();
        config.scoring.time_weight = "not-a-number".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_multiple_issues_collected() {
        let mut config = EngineConfig::default();
        config.execution.max_attempts = 0;
        config.discovery.max_concurrent_sources = 0;
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("max_attempts"));
        assert!(err.contains("max_concurrent_sources"));
    }
}

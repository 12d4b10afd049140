//! Engine configuration sections

use serde::{Deserialize, Serialize};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Route discovery tunables
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Scoring weights and penalties
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Execution retry/confirmation tunables
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Graph search and source fan-out settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Maximum swap edges per candidate path
    #[serde(default = "default_max_swap_hops")]
    pub max_swap_hops: u32,

    /// Maximum bridge edges per candidate path
    #[serde(default = "default_max_bridge_hops")]
    pub max_bridge_hops: u32,

    /// Candidate sources explored concurrently
    #[serde(default = "default_max_concurrent_sources")]
    pub max_concurrent_sources: usize,

    /// Overall discovery deadline; slower sources are abandoned
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,

    /// Per-balance-read timeout
    #[serde(default = "default_balance_timeout_ms")]
    pub balance_timeout_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_swap_hops: default_max_swap_hops(),
            max_bridge_hops: default_max_bridge_hops(),
            max_concurrent_sources: default_max_concurrent_sources(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
            balance_timeout_ms: default_balance_timeout_ms(),
        }
    }
}

/// Cost model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Slippage tolerance applied to swap output floors, in basis points
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u32,

    /// Cost added per estimated second of route latency
    #[serde(default = "default_time_weight")]
    pub time_weight: String,

    /// Price impact above this fraction draws the impact penalty
    #[serde(default = "default_impact_threshold")]
    pub impact_threshold: String,

    /// Penalty for any swap whose price impact exceeds the threshold
    #[serde(default = "default_impact_penalty")]
    pub impact_penalty: String,

    /// Penalty per bridge hop quoted without a finalized route
    #[serde(default = "default_bridge_estimate_penalty")]
    pub bridge_estimate_penalty: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            slippage_bps: default_slippage_bps(),
            time_weight: default_time_weight(),
            impact_threshold: default_impact_threshold(),
            impact_penalty: default_impact_penalty(),
            bridge_estimate_penalty: default_bridge_estimate_penalty(),
        }
    }
}

/// Execution tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Submission attempts per step (first try included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// Swap quotes older than this are re-quoted before submission
    #[serde(default = "default_quote_max_age_secs")]
    pub quote_max_age_secs: u64,

    /// Per-step confirmation deadline
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    /// Interval between bridge status polls
    #[serde(default = "default_bridge_poll_interval_ms")]
    pub bridge_poll_interval_ms: u64,

    /// Overall deadline for a bridge transfer to confirm
    #[serde(default = "default_bridge_timeout_secs")]
    pub bridge_timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            quote_max_age_secs: default_quote_max_age_secs(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            bridge_poll_interval_ms: default_bridge_poll_interval_ms(),
            bridge_timeout_secs: default_bridge_timeout_secs(),
        }
    }
}

fn default_max_swap_hops() -> u32 {
    2
}

fn default_max_bridge_hops() -> u32 {
    2
}

fn default_max_concurrent_sources() -> usize {
    8
}

fn default_discovery_timeout_ms() -> u64 {
    15_000
}

fn default_balance_timeout_ms() -> u64 {
    3_000
}

fn default_slippage_bps() -> u32 {
    100
}

fn default_time_weight() -> String {
    "0.0005".to_string()
}

fn default_impact_threshold() -> String {
    "0.03".to_string()
}

fn default_impact_penalty() -> String {
    "0.5".to_string()
}

fn default_bridge_estimate_penalty() -> String {
    "0.25".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    200
}

fn default_backoff_cap_ms() -> u64 {
    5_000
}

fn default_quote_max_age_secs() -> u64 {
    30
}

fn default_confirm_timeout_secs() -> u64 {
    120
}

fn default_bridge_poll_interval_ms() -> u64 {
    5_000
}

fn default_bridge_timeout_secs() -> u64 {
    1_800
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_design_contract() {
        let config = EngineConfig::default();
        assert_eq!(config.discovery.max_swap_hops, 2);
        assert_eq!(config.discovery.max_bridge_hops, 2);
        assert_eq!(config.scoring.slippage_bps, 100);
        assert_eq!(config.execution.max_attempts, 3);
        assert_eq!(config.execution.quote_max_age_secs, 30);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [discovery]
            max_concurrent_sources = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.discovery.max_concurrent_sources, 4);
        assert_eq!(config.discovery.max_swap_hops, 2);
        assert_eq!(config.execution.max_attempts, 3);
    }
}

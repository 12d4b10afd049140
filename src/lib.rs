//! Cross-chain payment routing engine.
//!
//! Discovery takes a [`PaymentRequest`] naming candidate funding addresses
//! and acceptable destination (chain, token, receiver) tuples, expands a
//! bounded swap/bridge/transfer graph per funded source, and returns ranked
//! [`PaymentRoute`]s. Execution runs a chosen route's steps strictly in
//! order with per-step confirmation and partial-failure transparency.
//!
//! All external collaborators (balances, quotes, per-chain providers) are
//! injected as trait objects; see [`crosspay_gateway`] for the contracts
//! and the exported mocks.

pub use crosspay_config as config;
pub use crosspay_executor as executor;
pub use crosspay_gateway as gateway;
pub use crosspay_router as router;
pub use crosspay_types as types;

pub use crosspay_config::{ConfigLoader, EngineConfig};
pub use crosspay_executor::{
    CancelToken, ExecutionOutcome, ExecutionReport, ExecutorConfig, RouteExecutor, StepOutcome,
    StepState,
};
pub use crosspay_gateway::{
    BalanceGateway, ProviderAdapter, ProviderRegistry, QuoteGateway, TokenCatalog,
};
pub use crosspay_router::{
    FinderConfig, RouteError, RouteFinder, RouteScorer, ScoreWeights, SearchPolicy,
};
pub use crosspay_types::{
    AcceptTarget, ChainId, PaymentRequest, PaymentRoute, RouteStep, StepKind, TokenInfo, Units,
};

use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Discovery and execution wired together from one [`EngineConfig`].
///
/// Gateways are injected rather than constructed here, so the same engine
/// runs against production adapters or the exported mocks.
pub struct PaymentEngine {
    finder: RouteFinder,
    executor: RouteExecutor,
}

impl PaymentEngine {
    pub fn new(
        config: &EngineConfig,
        catalog: Arc<TokenCatalog>,
        quotes: Arc<dyn QuoteGateway>,
        balances: Arc<dyn BalanceGateway>,
        providers: ProviderRegistry,
    ) -> Self {
        let policy = SearchPolicy {
            max_swap_hops: config.discovery.max_swap_hops,
            max_bridge_hops: config.discovery.max_bridge_hops,
        };

        let defaults = ScoreWeights::default();
        let weights = ScoreWeights {
            slippage_bps: config.scoring.slippage_bps,
            time_weight: parse_decimal(&config.scoring.time_weight, defaults.time_weight),
            impact_threshold: parse_decimal(
                &config.scoring.impact_threshold,
                defaults.impact_threshold,
            ),
            impact_penalty: parse_decimal(&config.scoring.impact_penalty, defaults.impact_penalty),
            bridge_estimate_penalty: parse_decimal(
                &config.scoring.bridge_estimate_penalty,
                defaults.bridge_estimate_penalty,
            ),
        };

        let finder_config = FinderConfig {
            max_concurrent_sources: config.discovery.max_concurrent_sources,
            discovery_timeout: Duration::from_millis(config.discovery.discovery_timeout_ms),
            balance_timeout: Duration::from_millis(config.discovery.balance_timeout_ms),
        };

        let executor_config = ExecutorConfig {
            retry: crosspay_retry::RetryPolicy::new(
                config.execution.max_attempts,
                Duration::from_millis(config.execution.backoff_base_ms),
                Duration::from_millis(config.execution.backoff_cap_ms),
            ),
            slippage_bps: config.scoring.slippage_bps,
            quote_max_age: Duration::from_secs(config.execution.quote_max_age_secs),
            confirm_timeout: Duration::from_secs(config.execution.confirm_timeout_secs),
            bridge_poll_interval: Duration::from_millis(config.execution.bridge_poll_interval_ms),
            bridge_timeout: Duration::from_secs(config.execution.bridge_timeout_secs),
        };

        let finder = RouteFinder::new(
            Arc::clone(&catalog),
            Arc::clone(&quotes),
            balances,
            policy,
            RouteScorer::new(weights),
            finder_config,
        );
        let executor = RouteExecutor::new(providers, quotes, catalog, executor_config);

        Self { finder, executor }
    }

    pub async fn find_all_routes(
        &self,
        request: &PaymentRequest,
    ) -> Result<Vec<PaymentRoute>, RouteError> {
        self.finder.find_all_routes(request).await
    }

    pub async fn find_best_route(
        &self,
        request: &PaymentRequest,
    ) -> Result<Option<PaymentRoute>, RouteError> {
        self.finder.find_best_route(request).await
    }

    pub async fn execute_route(&self, route: &PaymentRoute) -> ExecutionReport {
        self.executor.execute_route(route).await
    }

    pub async fn execute_route_with_cancel(
        &self,
        route: &PaymentRoute,
        cancel: &CancelToken,
    ) -> ExecutionReport {
        self.executor
            .execute_route_with_cancel(route, cancel)
            .await
    }

    pub fn finder(&self) -> &RouteFinder {
        &self.finder
    }

    pub fn executor(&self) -> &RouteExecutor {
        &self.executor
    }
}

fn parse_decimal(value: &str, fallback: Decimal) -> Decimal {
    Decimal::from_str(value).unwrap_or(fallback)
}

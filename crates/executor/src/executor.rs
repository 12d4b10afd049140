use chrono::Utc;
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

use crosspay_gateway::{
    BridgeTxState, ProviderError, ProviderRegistry, QuoteGateway, TokenCatalog, TxRequest,
};
use crosspay_retry::{RetryOutcome, RetryPolicy};
use crosspay_types::{PaymentRoute, RouteStep, StepKind};

use crate::{ExecutionOutcome, ExecutionReport, StepOutcome, StepState};

/// Execution tunables
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Retry bound and backoff window for transient submission errors
    pub retry: RetryPolicy,

    /// Slippage tolerance used when a stale swap is re-quoted, basis points
    pub slippage_bps: u32,

    /// Swap quotes older than this are re-quoted before submission
    pub quote_max_age: Duration,

    /// Per-step confirmation deadline for same-chain steps
    pub confirm_timeout: Duration,

    pub bridge_poll_interval: Duration,

    /// Overall deadline for a bridge transfer to reach a terminal state
    pub bridge_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            slippage_bps: 100,
            quote_max_age: Duration::from_secs(30),
            confirm_timeout: Duration::from_secs(120),
            bridge_poll_interval: Duration::from_secs(5),
            bridge_timeout: Duration::from_secs(1_800),
        }
    }
}

/// Cooperative cancellation for route execution.
///
/// Checked before each step's submission; a step already submitted always
/// runs to its terminal state, since a broadcast transaction cannot be
/// recalled.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Executes a route's steps strictly in order against the per-chain
/// providers, with per-step confirmation before the next step starts.
///
/// On any step failure execution halts immediately; confirmed steps are
/// never rolled back and the report names exactly how far funds moved.
pub struct RouteExecutor {
    providers: ProviderRegistry,
    quotes: Arc<dyn QuoteGateway>,
    catalog: Arc<TokenCatalog>,
    config: ExecutorConfig,
}

impl RouteExecutor {
    pub fn new(
        providers: ProviderRegistry,
        quotes: Arc<dyn QuoteGateway>,
        catalog: Arc<TokenCatalog>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            providers,
            quotes,
            catalog,
            config,
        }
    }

    pub async fn execute_route(&self, route: &PaymentRoute) -> ExecutionReport {
        self.execute_route_with_cancel(route, &CancelToken::new())
            .await
    }

    pub async fn execute_route_with_cancel(
        &self,
        route: &PaymentRoute,
        cancel: &CancelToken,
    ) -> ExecutionReport {
        let route_id = route.fingerprint();
        let started_at = Utc::now();

        let mut steps: Vec<StepOutcome> = route
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| StepOutcome {
                index,
                kind: step.kind(),
                description: step.description().to_string(),
                state: StepState::Pending,
                tx_hash: None,
                attempts: 0,
                error: None,
            })
            .collect();

        let finish = |outcome: ExecutionOutcome, steps: Vec<StepOutcome>| ExecutionReport {
            route_id: route_id.clone(),
            outcome,
            steps,
            started_at,
            finished_at: Utc::now(),
        };

        if route.steps.is_empty() {
            return finish(
                ExecutionOutcome::NotStarted {
                    reason: "route has no steps".to_string(),
                },
                steps,
            );
        }

        // Pre-flight: every step must have a provider before anything moves
        for step in &route.steps {
            let chain = step.submission_chain();
            if !self.providers.supports(chain) {
                warn!(%route_id, %chain, "no provider for chain, refusing to start");
                return finish(
                    ExecutionOutcome::NotStarted {
                        reason: format!("no provider registered for chain {}", chain),
                    },
                    steps,
                );
            }
        }

        info!(%route_id, steps = route.steps.len(), "starting route execution");

        let mut completed = 0usize;
        let mut last_hash: Option<String> = None;
        let mut failed_step: Option<usize> = None;
        let mut cancelled_at: Option<usize> = None;

        for (index, step) in route.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                steps[index].error = Some("cancelled before submission".to_string());
                cancelled_at = Some(index);
                break;
            }

            match self.run_step(&route_id, index, step, &mut steps[index]).await {
                Ok(tx_hash) => {
                    completed += 1;
                    last_hash = Some(tx_hash);
                }
                Err(()) => {
                    failed_step = Some(index);
                    break;
                }
            }
        }

        let outcome = if let Some(index) = failed_step {
            warn!(
                %route_id,
                failed_step = index,
                completed,
                "execution halted on step failure"
            );
            ExecutionOutcome::PartiallyExecuted {
                completed_steps: completed,
                failed_step: index,
            }
        } else if let Some(index) = cancelled_at {
            info!(%route_id, cancelled_step = index, completed, "execution cancelled");
            if completed == 0 {
                ExecutionOutcome::NotStarted {
                    reason: "cancelled before first submission".to_string(),
                }
            } else {
                ExecutionOutcome::PartiallyExecuted {
                    completed_steps: completed,
                    failed_step: index,
                }
            }
        } else {
            match last_hash {
                Some(settlement_hash) => {
                    info!(%route_id, %settlement_hash, "route fully executed");
                    ExecutionOutcome::Completed { settlement_hash }
                }
                // unreachable given the empty-steps guard; kept total
                None => ExecutionOutcome::NotStarted {
                    reason: "route has no steps".to_string(),
                },
            }
        };

        finish(outcome, steps)
    }

    /// Drive one step through the submission/confirmation state machine.
    /// On failure the outcome slot carries the detail and `Err(())` halts
    /// the route.
    async fn run_step(
        &self,
        route_id: &str,
        index: usize,
        step: &RouteStep,
        outcome: &mut StepOutcome,
    ) -> Result<String, ()> {
        let step = match self.refresh_if_stale(step).await {
            Ok(step) => step,
            Err(reason) => {
                outcome.state = StepState::Failed;
                outcome.error = Some(reason);
                return Err(());
            }
        };

        let chain = step.submission_chain().clone();
        let provider = match self.providers.get(&chain) {
            Ok(p) => Arc::clone(p),
            Err(e) => {
                outcome.state = StepState::Failed;
                outcome.error = Some(e.to_string());
                return Err(());
            }
        };

        let tx = TxRequest::for_step(&step);

        match provider.estimate_gas(&tx).await {
            Ok(gas) => {
                tracing::debug!(%route_id, step = index, %gas, "gas estimate");
            }
            Err(e) => {
                tracing::debug!(%route_id, step = index, error = %e, "gas estimate unavailable");
            }
        }

        let attempts = AtomicU32::new(0);

        let submitted = self
            .config
            .retry
            .run(
                "send_transaction",
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    let provider = Arc::clone(&provider);
                    let tx = tx.clone();
                    async move { provider.send_transaction(&tx).await }
                },
                ProviderError::is_transient,
            )
            .await;

        outcome.attempts = attempts.load(Ordering::SeqCst);

        let tx_hash = match submitted {
            RetryOutcome::Ok(hash) => hash,
            RetryOutcome::Fatal(e) => {
                outcome.state = StepState::Failed;
                outcome.error = Some(e.to_string());
                warn!(%route_id, step = index, error = %e, "deterministic submission failure");
                return Err(());
            }
            RetryOutcome::Exhausted {
                last_error,
                attempts: tried,
            } => {
                outcome.state = StepState::Failed;
                outcome.error = Some(format!(
                    "transient submission errors exhausted {} attempts: {}",
                    tried, last_error
                ));
                warn!(%route_id, step = index, attempts = tried, "submission retries exhausted");
                return Err(());
            }
        };

        outcome.state = StepState::Submitted;
        outcome.tx_hash = Some(tx_hash.clone());
        info!(
            %route_id,
            step = index,
            kind = %step.kind(),
            %tx_hash,
            "step submitted"
        );

        outcome.state = StepState::Confirming;
        let confirmation = match step.kind() {
            StepKind::Bridge => self.await_bridge(&tx_hash).await,
            _ => self.await_confirmation(&provider, &tx_hash).await,
        };

        match confirmation {
            Ok(()) => {
                outcome.state = StepState::Confirmed;
                info!(%route_id, step = index, %tx_hash, "step confirmed");
                Ok(tx_hash)
            }
            Err(reason) => {
                outcome.state = StepState::Failed;
                outcome.error = Some(reason.clone());
                warn!(%route_id, step = index, %tx_hash, %reason, "step failed in confirmation");
                Err(())
            }
        }
    }

    /// Re-quote a swap whose quote has aged past the configured bound,
    /// exactly once, rather than submitting a stale trade. Non-swap steps
    /// and fresh quotes pass through untouched.
    async fn refresh_if_stale<'a>(
        &self,
        step: &'a RouteStep,
    ) -> Result<Cow<'a, RouteStep>, String> {
        let RouteStep::Swap {
            chain,
            from_token,
            to_token,
            amount_in,
            exchange,
            quoted_at,
            description,
            ..
        } = step
        else {
            return Ok(Cow::Borrowed(step));
        };

        let now = now_unix();
        if now.saturating_sub(*quoted_at) <= self.config.quote_max_age.as_secs() {
            return Ok(Cow::Borrowed(step));
        }

        let from = self
            .catalog
            .resolve(from_token, chain)
            .ok_or_else(|| format!("swap input token no longer resolves: {}", from_token))?;
        let to = self
            .catalog
            .resolve(to_token, chain)
            .ok_or_else(|| format!("swap output token no longer resolves: {}", to_token))?;

        let quote = self
            .quotes
            .swap_quote(chain, &from, &to, *amount_in)
            .await
            .map_err(|e| format!("stale quote refresh failed: {}", e))?;

        let minimum_out = quote
            .expected_output
            .mul_bps(10_000 - self.config.slippage_bps);

        info!(
            %chain,
            %exchange,
            age_secs = now.saturating_sub(*quoted_at),
            new_minimum = %minimum_out,
            "stale swap quote refreshed before submission"
        );

        Ok(Cow::Owned(RouteStep::Swap {
            chain: chain.clone(),
            from_token: from_token.clone(),
            to_token: to_token.clone(),
            amount_in: *amount_in,
            minimum_out,
            exchange: quote.exchange,
            quoted_at: now,
            description: description.clone(),
        }))
    }

    /// Same-chain confirmation with a bounded deadline
    async fn await_confirmation(
        &self,
        provider: &Arc<dyn crosspay_gateway::ProviderAdapter>,
        tx_hash: &str,
    ) -> Result<(), String> {
        match tokio::time::timeout(self.config.confirm_timeout, provider.confirm(tx_hash)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "confirmation timed out after {}s",
                self.config.confirm_timeout.as_secs()
            )),
        }
    }

    /// Bridges are asynchronous and materially slower than same-chain
    /// steps: poll the bridge's status contract until terminal or timeout.
    /// Status read errors are tolerated inside the deadline.
    async fn await_bridge(&self, tx_hash: &str) -> Result<(), String> {
        let deadline = tokio::time::Instant::now() + self.config.bridge_timeout;

        loop {
            match self.quotes.bridge_status(tx_hash).await {
                Ok(status) => match status.state {
                    BridgeTxState::Confirmed => return Ok(()),
                    BridgeTxState::Failed => {
                        return Err("bridge transfer failed".to_string());
                    }
                    BridgeTxState::Pending => {}
                },
                Err(e) => {
                    warn!(%tx_hash, error = %e, "bridge status poll failed, retrying");
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(format!(
                    "bridge confirmation timed out after {}s",
                    self.config.bridge_timeout.as_secs()
                ));
            }
            tokio::time::sleep(self.config.bridge_poll_interval).await;
        }
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

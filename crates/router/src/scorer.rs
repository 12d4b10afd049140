use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::trace;

use crosspay_types::{
    format_units, ExchangeRoute, PaymentRoute, RouteStep, StepKind, Units,
};

use crate::{CandidatePath, PlannedHop};

/// Seconds a same-chain step is assumed to take; bridges use their quote.
const SAME_CHAIN_STEP_SECONDS: u64 = 15;

/// Gas heuristics per step kind, summed over EVM-chain steps. Precise gas
/// estimation belongs to the provider adapter at execution time.
const GAS_TRANSFER: u128 = 21_000;
const GAS_APPROVE: u128 = 48_000;
const GAS_SWAP: u128 = 160_000;
const GAS_BRIDGE: u128 = 250_000;

/// Cost model weights
#[derive(Clone, Debug)]
pub struct ScoreWeights {
    /// Slippage tolerance for swap output floors, basis points
    pub slippage_bps: u32,

    /// Cost per estimated second of route latency
    pub time_weight: Decimal,

    /// Price impact above this fraction draws `impact_penalty`
    pub impact_threshold: Decimal,

    pub impact_penalty: Decimal,

    /// Penalty per bridge quoted without a finalized route
    pub bridge_estimate_penalty: Decimal,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            slippage_bps: 100,
            time_weight: Decimal::from_str("0.0005").unwrap(),
            impact_threshold: Decimal::from_str("0.03").unwrap(),
            impact_penalty: Decimal::from_str("0.5").unwrap(),
            bridge_estimate_penalty: Decimal::from_str("0.25").unwrap(),
        }
    }
}

/// A payment route with its ranking cost.
///
/// `cost` never leaves the engine; callers only see the sorted order.
#[derive(Clone, Debug)]
pub struct ScoredRoute {
    pub route: PaymentRoute,
    pub cost: Decimal,
    pub discovery_order: usize,
}

impl ScoredRoute {
    /// Deterministic ranking: cost, then fewer steps (simpler routes fail
    /// less often), then fewer bridges, then discovery order.
    pub fn ranking_key(&self) -> (Decimal, usize, usize, usize) {
        (
            self.cost,
            self.route.steps.len(),
            self.route.bridge_count(),
            self.discovery_order,
        )
    }
}

/// Converts priced candidate paths into ranked `PaymentRoute`s
#[derive(Clone, Debug, Default)]
pub struct RouteScorer {
    weights: ScoreWeights,
}

impl RouteScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, path: &CandidatePath) -> ScoredRoute {
        let mut steps: Vec<RouteStep> = Vec::new();
        let mut exchange_routes: Vec<ExchangeRoute> = Vec::new();

        let mut fee_fraction = Decimal::ZERO;
        let mut estimated_seconds: u64 = 0;
        let mut risk_penalty = Decimal::ZERO;
        let mut impact_exceeded = false;
        let mut bridge_fees = Units::zero();
        let mut bridge_fee_decimals: Option<u8> = None;

        for hop in &path.hops {
            match hop {
                PlannedHop::Swap {
                    chain,
                    from,
                    to,
                    amount_in,
                    quote,
                    quoted_at,
                } => {
                    // An unconfirmed approval must never precede a dependent
                    // swap, so the approve is its own ordered step.
                    if chain.is_evm() && !from.is_native() {
                        steps.push(RouteStep::Approve {
                            chain: chain.clone(),
                            token: from.address.clone(),
                            spender: quote.exchange.clone(),
                            amount: *amount_in,
                            description: format!(
                                "approve {} to spend {} {}",
                                quote.exchange,
                                format_units(*amount_in, from.decimals),
                                from.symbol
                            ),
                        });
                    }

                    let minimum_out = quote
                        .expected_output
                        .mul_bps(10_000 - self.weights.slippage_bps);

                    steps.push(RouteStep::Swap {
                        chain: chain.clone(),
                        from_token: from.address.clone(),
                        to_token: to.address.clone(),
                        amount_in: *amount_in,
                        minimum_out,
                        exchange: quote.exchange.clone(),
                        quoted_at: *quoted_at,
                        description: format!(
                            "swap {} {} for {} on {}",
                            format_units(*amount_in, from.decimals),
                            from.symbol,
                            to.symbol,
                            quote.exchange
                        ),
                    });

                    exchange_routes.push(ExchangeRoute {
                        exchange: quote.exchange.clone(),
                        path: quote.path.clone(),
                        expected_output: quote.expected_output,
                        minimum_output: minimum_out,
                        price_impact: quote.price_impact,
                    });

                    fee_fraction += quote.price_impact;
                    estimated_seconds += SAME_CHAIN_STEP_SECONDS;
                    if quote.price_impact > self.weights.impact_threshold {
                        impact_exceeded = true;
                    }
                }

                PlannedHop::Bridge {
                    from_chain,
                    to_chain,
                    from_token,
                    amount_in,
                    quote,
                    ..
                } => {
                    steps.push(RouteStep::Bridge {
                        from_chain: from_chain.clone(),
                        to_chain: to_chain.clone(),
                        token: from_token.address.clone(),
                        amount: *amount_in,
                        fee: quote.fee,
                        provider: quote
                            .route
                            .clone()
                            .unwrap_or_else(|| "bridge-estimate".to_string()),
                        description: format!(
                            "bridge {} {} from {} to {}",
                            format_units(*amount_in, from_token.decimals),
                            from_token.symbol,
                            from_chain,
                            to_chain
                        ),
                    });

                    fee_fraction += fraction(quote.fee, *amount_in);
                    estimated_seconds += quote.estimated_seconds;
                    if quote.route.is_none() {
                        risk_penalty += self.weights.bridge_estimate_penalty;
                    }
                    bridge_fees = bridge_fees
                        .checked_add(quote.fee)
                        .unwrap_or(bridge_fees);
                    bridge_fee_decimals = Some(from_token.decimals);
                }

                PlannedHop::Transfer {
                    chain,
                    token,
                    to,
                    amount,
                } => {
                    steps.push(RouteStep::Transfer {
                        chain: chain.clone(),
                        token: token.address.clone(),
                        to: to.clone(),
                        amount: *amount,
                        description: format!(
                            "transfer {} {} to {}",
                            format_units(*amount, token.decimals),
                            token.symbol,
                            to
                        ),
                    });
                    estimated_seconds += SAME_CHAIN_STEP_SECONDS;
                }
            }
        }

        if impact_exceeded {
            risk_penalty += self.weights.impact_penalty;
        }

        let cost = fee_fraction
            + self.weights.time_weight * Decimal::from(estimated_seconds)
            + risk_penalty;

        let estimated_gas = evm_gas_estimate(&steps);
        let approval_required = steps
            .iter()
            .any(|s| s.kind() == StepKind::Approve)
            .then_some(true);
        let estimated_fee = bridge_fee_decimals
            .map(|decimals| format_units(bridge_fees, decimals));

        let route = PaymentRoute {
            blockchain: path.target.chain.clone(),
            from_address: path.source.address.clone(),
            from_token: path.source.token.symbol.clone(),
            from_amount: format_units(path.source.amount_in, path.source.token.decimals),
            from_decimals: path.source.token.decimals,
            to_token: path.target.token.symbol.clone(),
            to_amount: format_units(path.amount_out, path.target.token.decimals),
            to_decimals: path.target.token.decimals,
            to_address: path.target.receiver.clone(),
            exchange_routes,
            steps,
            estimated_gas,
            estimated_fee,
            approval_required,
        };

        trace!(
            fingerprint = %route.fingerprint(),
            %cost,
            steps = route.steps.len(),
            "scored route"
        );

        ScoredRoute {
            route,
            cost,
            discovery_order: path.discovery_order,
        }
    }
}

/// Gas heuristic over EVM-chain steps; `None` when no step runs on an EVM
/// chain (the field is omitted from the serialized route).
fn evm_gas_estimate(steps: &[RouteStep]) -> Option<Units> {
    let total: u128 = steps
        .iter()
        .filter(|s| s.submission_chain().is_evm())
        .map(|s| match s.kind() {
            StepKind::Transfer => GAS_TRANSFER,
            StepKind::Approve => GAS_APPROVE,
            StepKind::Swap => GAS_SWAP,
            StepKind::Bridge => GAS_BRIDGE,
        })
        .sum();

    (total > 0).then_some(Units::new(total))
}

/// `numerator / denominator` as a Decimal fraction, saturating on values
/// beyond Decimal's mantissa
fn fraction(numerator: Units, denominator: Units) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    let n = Decimal::from_str(&numerator.to_string()).unwrap_or(Decimal::MAX);
    let d = Decimal::from_str(&denominator.to_string()).unwrap_or(Decimal::MAX);
    if d.is_zero() {
        Decimal::ZERO
    } else {
        n / d
    }
}

//! In-memory gateway doubles used across the engine's test suites.
//!
//! Exported from the crate proper so integration tests and downstream
//! consumers can wire a fully scripted engine without touching a network.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crosspay_types::{ChainId, TokenInfo, Units};

use crate::{
    BalanceGateway, BridgeQuote, BridgeStatus, BridgeTxState, GatewayError, ProviderAdapter,
    ProviderError, QuoteGateway, SwapQuote, TxRequest,
};

fn token_key(token: &TokenInfo) -> (ChainId, String) {
    (token.chain_id.clone(), token.address_key())
}

/// Balance gateway backed by a settable map
#[derive(Clone, Default)]
pub struct MockBalanceGateway {
    balances: Arc<Mutex<HashMap<(String, (ChainId, String)), Units>>>,
    failing_addresses: Arc<Mutex<Vec<String>>>,
}

impl MockBalanceGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, address: &str, token: &TokenInfo, amount: Units) {
        self.balances
            .lock()
            .unwrap()
            .insert((address.to_ascii_lowercase(), token_key(token)), amount);
    }

    /// Every read for this address fails with a network error
    pub fn fail_for(&self, address: &str) {
        self.failing_addresses
            .lock()
            .unwrap()
            .push(address.to_ascii_lowercase());
    }
}

#[async_trait]
impl BalanceGateway for MockBalanceGateway {
    async fn balance(&self, address: &str, token: &TokenInfo) -> Result<Units, GatewayError> {
        let addr = address.to_ascii_lowercase();
        if self.failing_addresses.lock().unwrap().contains(&addr) {
            return Err(GatewayError::Network("simulated balance failure".into()));
        }

        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&(addr, token_key(token)))
            .copied()
            .unwrap_or(Units::zero()))
    }
}

#[derive(Clone, Debug)]
struct SwapRate {
    numerator: u128,
    denominator: u128,
    price_impact: Decimal,
}

#[derive(Clone, Debug)]
struct BridgeLane {
    fee: Units,
    estimated_seconds: u64,
    finalized: bool,
}

/// Quote gateway with pinned rates per pair/lane.
///
/// Rates are fixed at configuration time, so identical inputs always yield
/// identical quotes; discovery idempotence tests rely on that.
#[derive(Clone, Default)]
pub struct MockQuoteGateway {
    swap_rates: Arc<Mutex<HashMap<(ChainId, String, String), SwapRate>>>,
    bridge_lanes: Arc<Mutex<HashMap<(ChainId, ChainId, String), BridgeLane>>>,
    bridge_statuses: Arc<Mutex<HashMap<String, VecDeque<BridgeStatus>>>>,
    fail_all: Arc<Mutex<bool>>,
    swap_calls: Arc<AtomicU32>,
    bridge_calls: Arc<AtomicU32>,
}

impl MockQuoteGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a swap rate: `amount_out = amount_in * numerator / denominator`.
    ///
    /// The ratio is applied to base units, so it must fold in any decimals
    /// difference between the two tokens.
    pub fn set_swap_rate(
        &self,
        from: &TokenInfo,
        to: &TokenInfo,
        numerator: u128,
        denominator: u128,
        price_impact: Decimal,
    ) {
        assert!(denominator > 0, "swap rate denominator must be nonzero");
        self.swap_rates.lock().unwrap().insert(
            (from.chain_id.clone(), from.address_key(), to.address_key()),
            SwapRate {
                numerator,
                denominator,
                price_impact,
            },
        );
    }

    pub fn set_bridge_lane(
        &self,
        from_chain: &ChainId,
        to_chain: &ChainId,
        token: &TokenInfo,
        fee: Units,
        estimated_seconds: u64,
        finalized: bool,
    ) {
        self.bridge_lanes.lock().unwrap().insert(
            (from_chain.clone(), to_chain.clone(), token.address_key()),
            BridgeLane {
                fee,
                estimated_seconds,
                finalized,
            },
        );
    }

    /// Queue the statuses a bridge transfer reports, in poll order. Once the
    /// queue drains, polling keeps returning the last scripted status.
    pub fn script_bridge_status(&self, tx_hash: &str, statuses: Vec<BridgeStatus>) {
        self.bridge_statuses
            .lock()
            .unwrap()
            .insert(tx_hash.to_string(), statuses.into());
    }

    pub fn set_fail_all(&self, fail: bool) {
        *self.fail_all.lock().unwrap() = fail;
    }

    pub fn swap_calls(&self) -> u32 {
        self.swap_calls.load(Ordering::Relaxed)
    }

    pub fn bridge_calls(&self) -> u32 {
        self.bridge_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl QuoteGateway for MockQuoteGateway {
    async fn swap_quote(
        &self,
        chain: &ChainId,
        from: &TokenInfo,
        to: &TokenInfo,
        amount: Units,
    ) -> Result<SwapQuote, GatewayError> {
        self.swap_calls.fetch_add(1, Ordering::Relaxed);
        if *self.fail_all.lock().unwrap() {
            return Err(GatewayError::Network("simulated quote failure".into()));
        }

        let rates = self.swap_rates.lock().unwrap();
        let rate = rates
            .get(&(chain.clone(), from.address_key(), to.address_key()))
            .ok_or_else(|| GatewayError::UnsupportedPair {
                chain: chain.clone(),
                from: from.symbol.clone(),
                to: to.symbol.clone(),
            })?;

        let expected = amount
            .value()
            .checked_mul(rate.numerator)
            .map(|v| v / rate.denominator)
            .ok_or_else(|| GatewayError::QuoteUnavailable {
                reason: "amount too large".into(),
            })?;
        let expected = Units::new(expected);

        Ok(SwapQuote {
            exchange: "mockswap".into(),
            path: vec![from.address.clone(), to.address.clone()],
            expected_output: expected,
            minimum_output: expected.mul_bps(9_900),
            price_impact: rate.price_impact,
        })
    }

    async fn bridge_quote(
        &self,
        from_chain: &ChainId,
        to_chain: &ChainId,
        token: &TokenInfo,
        amount: Units,
    ) -> Result<BridgeQuote, GatewayError> {
        self.bridge_calls.fetch_add(1, Ordering::Relaxed);
        if *self.fail_all.lock().unwrap() {
            return Err(GatewayError::Network("simulated quote failure".into()));
        }

        let lanes = self.bridge_lanes.lock().unwrap();
        let lane = lanes
            .get(&(from_chain.clone(), to_chain.clone(), token.address_key()))
            .ok_or_else(|| GatewayError::UnsupportedLane {
                from_chain: from_chain.clone(),
                to_chain: to_chain.clone(),
            })?;

        if lane.fee >= amount {
            return Err(GatewayError::QuoteUnavailable {
                reason: "amount below bridge fee".into(),
            });
        }

        Ok(BridgeQuote {
            fee: lane.fee,
            estimated_seconds: lane.estimated_seconds,
            route: lane
                .finalized
                .then(|| format!("mockbridge:{}-{}", from_chain, to_chain)),
        })
    }

    async fn bridge_status(&self, tx_hash: &str) -> Result<BridgeStatus, GatewayError> {
        let mut statuses = self.bridge_statuses.lock().unwrap();
        match statuses.get_mut(tx_hash) {
            Some(queue) => {
                let status = if queue.len() > 1 {
                    queue.pop_front().unwrap()
                } else {
                    queue.front().cloned().unwrap_or(BridgeStatus {
                        state: BridgeTxState::Confirmed,
                        confirmations: 1,
                        estimated_seconds_remaining: 0,
                    })
                };
                Ok(status)
            }
            None => Ok(BridgeStatus {
                state: BridgeTxState::Confirmed,
                confirmations: 1,
                estimated_seconds_remaining: 0,
            }),
        }
    }
}

/// Provider adapter with a scripted submission queue.
///
/// Each `send_transaction` pops the next scripted result; an empty queue
/// succeeds with a generated hash. Submissions are recorded for assertions.
#[derive(Debug)]
pub struct MockProviderAdapter {
    submissions: Arc<Mutex<Vec<TxRequest>>>,
    scripted: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    confirm_failures: Arc<Mutex<Vec<String>>>,
    next_hash: Arc<AtomicU64>,
}

impl MockProviderAdapter {
    pub fn new() -> Self {
        Self {
            submissions: Arc::new(Mutex::new(Vec::new())),
            scripted: Arc::new(Mutex::new(VecDeque::new())),
            confirm_failures: Arc::new(Mutex::new(Vec::new())),
            next_hash: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn script_submission(&self, result: Result<String, ProviderError>) {
        self.scripted.lock().unwrap().push_back(result);
    }

    /// Confirmation of this hash fails with a revert
    pub fn fail_confirmation(&self, tx_hash: &str) {
        self.confirm_failures.lock().unwrap().push(tx_hash.to_string());
    }

    pub fn submissions(&self) -> Vec<TxRequest> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

impl Default for MockProviderAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for MockProviderAdapter {
    async fn send_transaction(&self, tx: &TxRequest) -> Result<String, ProviderError> {
        self.submissions.lock().unwrap().push(tx.clone());

        if let Some(result) = self.scripted.lock().unwrap().pop_front() {
            return result;
        }

        let n = self.next_hash.fetch_add(1, Ordering::Relaxed);
        Ok(format!("0xtx{:04x}", n))
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<Units, ProviderError> {
        let gas = match tx.step.kind() {
            crosspay_types::StepKind::Transfer => 21_000,
            crosspay_types::StepKind::Approve => 48_000,
            crosspay_types::StepKind::Swap => 160_000,
            crosspay_types::StepKind::Bridge => 250_000,
        };
        Ok(Units::new(gas))
    }

    async fn confirm(&self, tx_hash: &str) -> Result<(), ProviderError> {
        if self
            .confirm_failures
            .lock()
            .unwrap()
            .contains(&tx_hash.to_string())
        {
            return Err(ProviderError::Reverted {
                reason: "simulated revert at confirmation".into(),
            });
        }
        Ok(())
    }
}

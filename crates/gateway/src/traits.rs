use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crosspay_types::{ChainId, RouteStep, TokenInfo, Units};

use crate::{GatewayError, ProviderError};

/// Read-only spendable balance source
#[async_trait]
pub trait BalanceGateway: Send + Sync {
    /// Spendable balance of `token` held by `address`, in base units.
    ///
    /// A network failure means "unknown"; callers skip the source rather
    /// than treating the holding as zero.
    async fn balance(&self, address: &str, token: &TokenInfo) -> Result<Units, GatewayError>;
}

/// Quote for a same-chain swap
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub exchange: String,

    /// Token address hop list inside the venue
    pub path: Vec<String>,

    pub expected_output: Units,

    /// Output floor after the venue's own slippage model
    pub minimum_output: Units,

    /// Fraction of value lost to trade size (0.01 = 1%)
    pub price_impact: Decimal,
}

/// Quote for moving a token between chains
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeQuote {
    /// Fee in base units of the bridged token
    pub fee: Units,

    pub estimated_seconds: u64,

    /// Finalized route identifier from the bridge. `None` marks an
    /// estimate-only quote, which the scorer risk-penalizes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeTxState {
    Pending,
    Confirmed,
    Failed,
}

/// Status of an in-flight bridge transfer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStatus {
    pub state: BridgeTxState,
    pub confirmations: u32,
    pub estimated_seconds_remaining: u64,
}

/// Uniform interface to DEX swap quotes and bridge quotes/status
#[async_trait]
pub trait QuoteGateway: Send + Sync {
    async fn swap_quote(
        &self,
        chain: &ChainId,
        from: &TokenInfo,
        to: &TokenInfo,
        amount: Units,
    ) -> Result<SwapQuote, GatewayError>;

    async fn bridge_quote(
        &self,
        from_chain: &ChainId,
        to_chain: &ChainId,
        token: &TokenInfo,
        amount: Units,
    ) -> Result<BridgeQuote, GatewayError>;

    async fn bridge_status(&self, tx_hash: &str) -> Result<BridgeStatus, GatewayError>;
}

/// An unsigned transaction request handed to a chain's provider.
///
/// Signing happens behind the adapter (keyring collaborator); this engine
/// only describes the operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequest {
    pub chain: ChainId,
    pub step: RouteStep,
}

impl TxRequest {
    pub fn for_step(step: &RouteStep) -> Self {
        Self {
            chain: step.submission_chain().clone(),
            step: step.clone(),
        }
    }
}

/// Per-chain transaction submission and confirmation.
///
/// One implementation per supported chain. Nonce/sequence management is the
/// adapter's serialization point; the engine never touches it.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    /// Sign (via the keyring collaborator) and broadcast. Returns the tx hash.
    async fn send_transaction(&self, tx: &TxRequest) -> Result<String, ProviderError>;

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<Units, ProviderError>;

    /// Block until the transaction reaches a terminal state on-chain.
    async fn confirm(&self, tx_hash: &str) -> Result<(), ProviderError>;
}

/// Registry of provider adapters keyed by chain
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ChainId, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, chain: impl Into<ChainId>, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.providers.insert(chain.into(), provider);
        self
    }

    pub fn get(&self, chain: &ChainId) -> Result<&Arc<dyn ProviderAdapter>, ProviderError> {
        self.providers
            .get(chain)
            .ok_or_else(|| ProviderError::UnsupportedChain {
                chain: chain.clone(),
            })
    }

    pub fn supports(&self, chain: &ChainId) -> bool {
        self.providers.contains_key(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_quote_estimate_only_omits_route() {
        let quote = BridgeQuote {
            fee: Units::new(100),
            estimated_seconds: 300,
            route: None,
        };
        let json = serde_json::to_value(&quote).unwrap();
        assert!(!json.as_object().unwrap().contains_key("route"));

        let finalized = BridgeQuote {
            route: Some("wormhole:eth-sol:42".into()),
            ..quote
        };
        let json = serde_json::to_value(&finalized).unwrap();
        assert_eq!(json["route"], "wormhole:eth-sol:42");
    }

    #[test]
    fn test_registry_missing_chain() {
        let registry = ProviderRegistry::new();
        let err = registry.get(&ChainId::numeric(1)).unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedChain { .. }));
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ChainId, Units};

/// One executable operation in a route, in execution order.
///
/// Ordering invariants: an `approve` for a token always precedes the step
/// that spends it, and a `bridge` separates the last source-chain step from
/// the first destination-chain step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RouteStep {
    #[serde(rename_all = "camelCase")]
    Approve {
        chain: ChainId,
        /// Token contract being approved
        token: String,
        /// Contract allowed to spend it
        spender: String,
        amount: Units,
        description: String,
    },

    #[serde(rename_all = "camelCase")]
    Swap {
        chain: ChainId,
        from_token: String,
        to_token: String,
        amount_in: Units,
        /// On-chain enforced output floor
        minimum_out: Units,
        exchange: String,
        /// Unix seconds the quote was taken; drives the staleness re-quote
        quoted_at: u64,
        description: String,
    },

    #[serde(rename_all = "camelCase")]
    Bridge {
        from_chain: ChainId,
        to_chain: ChainId,
        token: String,
        amount: Units,
        fee: Units,
        provider: String,
        description: String,
    },

    #[serde(rename_all = "camelCase")]
    Transfer {
        chain: ChainId,
        token: String,
        to: String,
        amount: Units,
        description: String,
    },
}

/// Discriminant for reporting without the payload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Approve,
    Swap,
    Bridge,
    Transfer,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepKind::Approve => "approve",
            StepKind::Swap => "swap",
            StepKind::Bridge => "bridge",
            StepKind::Transfer => "transfer",
        };
        write!(f, "{}", s)
    }
}

impl RouteStep {
    pub fn kind(&self) -> StepKind {
        match self {
            RouteStep::Approve { .. } => StepKind::Approve,
            RouteStep::Swap { .. } => StepKind::Swap,
            RouteStep::Bridge { .. } => StepKind::Bridge,
            RouteStep::Transfer { .. } => StepKind::Transfer,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            RouteStep::Approve { description, .. }
            | RouteStep::Swap { description, .. }
            | RouteStep::Bridge { description, .. }
            | RouteStep::Transfer { description, .. } => description,
        }
    }

    /// Chain the step is submitted on (a bridge submits on its source chain)
    pub fn submission_chain(&self) -> &ChainId {
        match self {
            RouteStep::Approve { chain, .. }
            | RouteStep::Swap { chain, .. }
            | RouteStep::Transfer { chain, .. } => chain,
            RouteStep::Bridge { from_chain, .. } => from_chain,
        }
    }

    /// Chain the step's output lands on
    pub fn destination_chain(&self) -> &ChainId {
        match self {
            RouteStep::Bridge { to_chain, .. } => to_chain,
            other => other.submission_chain(),
        }
    }

    fn digest_into(&self, hasher: &mut Sha256) {
        hasher.update(self.kind().to_string().as_bytes());
        hasher.update(self.submission_chain().to_string().as_bytes());
        hasher.update(self.destination_chain().to_string().as_bytes());
        match self {
            RouteStep::Approve { token, spender, amount, .. } => {
                hasher.update(token.as_bytes());
                hasher.update(spender.as_bytes());
                hasher.update(amount.value().to_le_bytes());
            }
            RouteStep::Swap { from_token, to_token, amount_in, minimum_out, exchange, .. } => {
                hasher.update(from_token.as_bytes());
                hasher.update(to_token.as_bytes());
                hasher.update(amount_in.value().to_le_bytes());
                hasher.update(minimum_out.value().to_le_bytes());
                hasher.update(exchange.as_bytes());
            }
            RouteStep::Bridge { token, amount, fee, provider, .. } => {
                hasher.update(token.as_bytes());
                hasher.update(amount.value().to_le_bytes());
                hasher.update(fee.value().to_le_bytes());
                hasher.update(provider.as_bytes());
            }
            RouteStep::Transfer { token, to, amount, .. } => {
                hasher.update(token.as_bytes());
                hasher.update(to.as_bytes());
                hasher.update(amount.value().to_le_bytes());
            }
        }
    }
}

/// Metadata describing one swap inside a route
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRoute {
    /// Exchange/venue name
    pub exchange: String,

    /// Token address hop list inside the venue
    pub path: Vec<String>,

    pub expected_output: Units,

    /// `expected_output` reduced by the slippage tolerance; the on-chain floor
    pub minimum_output: Units,

    /// Fraction of value lost to the trade's own size (0.01 = 1%)
    pub price_impact: Decimal,
}

/// A complete, ordered plan converting a source holding into an accepted
/// destination asset.
///
/// Created in memory by the route finder, immutable once returned, consumed
/// at most once by the executor. Optional fields are omitted from the
/// serialized form when absent, never emitted as `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRoute {
    /// Destination chain
    pub blockchain: ChainId,

    pub from_address: String,
    pub from_token: String,
    /// Human-readable decimal amount leaving the source
    pub from_amount: String,
    pub from_decimals: u8,

    pub to_token: String,
    /// Human-readable decimal amount arriving at the destination
    pub to_amount: String,
    pub to_decimals: u8,
    pub to_address: String,

    /// Unordered metadata describing any swap steps present
    pub exchange_routes: Vec<ExchangeRoute>,

    /// Steps in strict execution order
    pub steps: Vec<RouteStep>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_gas: Option<Units>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_fee: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_required: Option<bool>,
}

impl PaymentRoute {
    pub fn bridge_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.kind() == StepKind::Bridge)
            .count()
    }

    pub fn swap_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.kind() == StepKind::Swap)
            .count()
    }

    /// Stable identifier over the step sequence, used in logs and reports
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.from_address.as_bytes());
        hasher.update(self.to_address.as_bytes());
        for step in &self.steps {
            step.digest_into(&mut hasher);
        }
        let hash: [u8; 32] = hasher.finalize().into();
        hex::encode(&hash[..16])
    }
}

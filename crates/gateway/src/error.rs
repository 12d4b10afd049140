use thiserror::Error;

use crosspay_types::ChainId;

/// Failures from read-only gateways (balances, quotes, bridge status).
///
/// These are always localized: a failed quote drops one edge, a failed
/// balance read skips one source. None of them abort a discovery pass.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("no quote available: {reason}")]
    QuoteUnavailable { reason: String },

    #[error("unsupported pair on chain {chain}: {from} -> {to}")]
    UnsupportedPair {
        chain: ChainId,
        from: String,
        to: String,
    },

    #[error("unsupported bridge lane: {from_chain} -> {to_chain}")]
    UnsupportedLane {
        from_chain: ChainId,
        to_chain: ChainId,
    },

    #[error("unknown transaction: {tx_hash}")]
    UnknownTransaction { tx_hash: String },
}

/// Failures from transaction submission and confirmation.
///
/// The transient/deterministic split decides retry behavior: transient
/// errors are retried with backoff up to the configured bound, deterministic
/// failures surface immediately.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Nonce races, gas underpricing, RPC blips. Safe to retry.
    #[error("transient submission failure: {0}")]
    Transient(String),

    #[error("transaction reverted: {reason}")]
    Reverted { reason: String },

    #[error("insufficient funds on {chain}")]
    InsufficientFunds { chain: ChainId },

    #[error("slippage floor violated: received below minimum output")]
    SlippageExceeded,

    #[error("confirmation timed out for {tx_hash}")]
    ConfirmationTimeout { tx_hash: String },

    #[error("no provider registered for chain {chain}")]
    UnsupportedChain { chain: ChainId },
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

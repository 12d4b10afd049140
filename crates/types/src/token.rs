use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel address used for a chain's native coin (ETH, SOL, ...).
pub const NATIVE_ADDRESS: &str = "native";

/// Chain identifier
///
/// EVM networks use numeric ids, other ecosystems (Solana clusters, Cosmos
/// zones) use string identifiers. The two forms are distinct values and are
/// only ever compared by equality, never coerced into one another.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainId {
    /// Numeric network id (e.g., 1 for Ethereum mainnet)
    Numeric(u64),

    /// String identifier (e.g., "mainnet-beta")
    Named(String),
}

impl ChainId {
    pub fn numeric(id: u64) -> Self {
        ChainId::Numeric(id)
    }

    pub fn named(id: impl Into<String>) -> Self {
        ChainId::Named(id.into())
    }

    /// Whether this chain follows the EVM account/approval model
    pub fn is_evm(&self) -> bool {
        matches!(self, ChainId::Numeric(_))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainId::Numeric(id) => write!(f, "{}", id),
            ChainId::Named(id) => write!(f, "{}", id),
        }
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        ChainId::Numeric(id)
    }
}

impl From<&str> for ChainId {
    fn from(id: &str) -> Self {
        ChainId::Named(id.to_string())
    }
}

/// Token metadata on a specific chain
///
/// `address` + `chain_id` uniquely identify an asset; two `TokenInfo` values
/// with the same address on the same chain are the same asset regardless of
/// the rest of the record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    /// Contract address, or `native` for the chain's native coin
    pub address: String,

    /// Ticker symbol (e.g., "USDC")
    pub symbol: String,

    /// Human-readable name
    pub name: String,

    /// Number of decimal places in the base unit
    pub decimals: u8,

    /// Chain this record is valid on
    pub chain_id: ChainId,
}

impl TokenInfo {
    pub fn new(
        address: impl Into<String>,
        symbol: impl Into<String>,
        name: impl Into<String>,
        decimals: u8,
        chain_id: impl Into<ChainId>,
    ) -> Self {
        Self {
            address: address.into(),
            symbol: symbol.into(),
            name: name.into(),
            decimals,
            chain_id: chain_id.into(),
        }
    }

    pub fn is_native(&self) -> bool {
        self.address == NATIVE_ADDRESS
    }

    /// Case-insensitive address key (EVM addresses vary in checksum casing)
    pub fn address_key(&self) -> String {
        self.address.to_ascii_lowercase()
    }

    /// Same asset check: address + chain, nothing else
    pub fn same_asset(&self, other: &TokenInfo) -> bool {
        self.chain_id == other.chain_id && self.address_key() == other.address_key()
    }
}

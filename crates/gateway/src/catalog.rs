use std::collections::HashMap;

use crosspay_types::{ChainId, TokenInfo, NATIVE_ADDRESS};

/// Resolves token symbols/addresses to `TokenInfo` records and carries the
/// per-chain allow-list of bridging-liquid intermediates that bounds swap
/// branching during graph construction.
#[derive(Clone, Debug, Default)]
pub struct TokenCatalog {
    /// Keyed by (chain, lowercase symbol) and (chain, lowercase address)
    tokens: HashMap<(ChainId, String), TokenInfo>,
    /// Lowercase intermediate symbols per chain
    intermediates: HashMap<ChainId, Vec<String>>,
}

impl TokenCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the common mainnet assets and the
    /// stable/native intermediates used for multi-hop swaps.
    pub fn with_default_tokens() -> Self {
        let mut catalog = Self::new();

        let ethereum = ChainId::numeric(1);
        let polygon = ChainId::numeric(137);
        let solana = ChainId::named("mainnet-beta");

        catalog.register(TokenInfo::new(NATIVE_ADDRESS, "ETH", "Ether", 18, ethereum.clone()));
        catalog.register(TokenInfo::new(
            "0xA0b86991c6218b36c1d19D4a2e9eb0cE3606eB48",
            "USDC",
            "USD Coin",
            6,
            ethereum.clone(),
        ));
        catalog.register(TokenInfo::new(
            "0xdAC17F958D2ee523a2206206994597C13D831ec7",
            "USDT",
            "Tether USD",
            6,
            ethereum.clone(),
        ));
        catalog.register(TokenInfo::new(
            "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
            "WETH",
            "Wrapped Ether",
            18,
            ethereum.clone(),
        ));

        catalog.register(TokenInfo::new(NATIVE_ADDRESS, "POL", "Polygon", 18, polygon.clone()));
        catalog.register(TokenInfo::new(
            "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359",
            "USDC",
            "USD Coin",
            6,
            polygon.clone(),
        ));
        catalog.register(TokenInfo::new(
            "0xc2132D05D31c914a87C6611C10748AEb04B58e8F",
            "USDT",
            "Tether USD",
            6,
            polygon.clone(),
        ));

        catalog.register(TokenInfo::new(NATIVE_ADDRESS, "SOL", "Solana", 9, solana.clone()));
        catalog.register(TokenInfo::new(
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "USDC",
            "USD Coin",
            6,
            solana.clone(),
        ));
        catalog.register(TokenInfo::new(
            "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
            "USDT",
            "Tether USD",
            6,
            solana.clone(),
        ));

        for symbol in ["USDC", "USDT", "WETH"] {
            catalog.register_intermediate(ethereum.clone(), symbol);
        }
        for symbol in ["USDC", "USDT", "POL"] {
            catalog.register_intermediate(polygon.clone(), symbol);
        }
        for symbol in ["USDC", "USDT", "SOL"] {
            catalog.register_intermediate(solana.clone(), symbol);
        }

        catalog
    }

    pub fn register(&mut self, token: TokenInfo) {
        let chain = token.chain_id.clone();
        self.tokens
            .insert((chain.clone(), token.symbol.to_ascii_lowercase()), token.clone());
        self.tokens.insert((chain, token.address_key()), token);
    }

    pub fn register_intermediate(&mut self, chain: ChainId, symbol: &str) {
        self.intermediates
            .entry(chain)
            .or_default()
            .push(symbol.to_ascii_lowercase());
    }

    /// Resolve a symbol or address on a chain. Case-insensitive on both.
    pub fn resolve(&self, symbol_or_address: &str, chain: &ChainId) -> Option<TokenInfo> {
        let key = (chain.clone(), symbol_or_address.to_ascii_lowercase());
        self.tokens.get(&key).cloned()
    }

    /// Chains on which `symbol` resolves
    pub fn chains_with(&self, symbol: &str) -> Vec<ChainId> {
        let needle = symbol.to_ascii_lowercase();
        let mut chains: Vec<ChainId> = self
            .tokens
            .iter()
            .filter(|((_, key), token)| *key == needle && token.symbol.eq_ignore_ascii_case(symbol))
            .map(|((chain, _), _)| chain.clone())
            .collect();
        chains.sort_by_key(|c| c.to_string());
        chains.dedup();
        chains
    }

    /// The swap-branching allow-list for a chain
    pub fn bridge_intermediates(&self, chain: &ChainId) -> Vec<TokenInfo> {
        self.intermediates
            .get(chain)
            .map(|symbols| {
                symbols
                    .iter()
                    .filter_map(|s| self.resolve(s, chain))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_symbol_case_insensitive() {
        let catalog = TokenCatalog::with_default_tokens();
        let usdc = catalog.resolve("usdc", &ChainId::numeric(1)).unwrap();
        assert_eq!(usdc.symbol, "USDC");
        assert_eq!(usdc.decimals, 6);
    }

    #[test]
    fn test_resolve_by_address() {
        let catalog = TokenCatalog::with_default_tokens();
        let usdc = catalog
            .resolve(
                "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
                &ChainId::numeric(1),
            )
            .unwrap();
        assert_eq!(usdc.symbol, "USDC");
    }

    #[test]
    fn test_resolve_unknown_is_none() {
        let catalog = TokenCatalog::with_default_tokens();
        assert!(catalog.resolve("DOGE", &ChainId::numeric(1)).is_none());
        assert!(catalog.resolve("USDC", &ChainId::numeric(99999)).is_none());
    }

    #[test]
    fn test_chains_with_symbol() {
        let catalog = TokenCatalog::with_default_tokens();
        let chains = catalog.chains_with("USDC");
        assert!(chains.contains(&ChainId::numeric(1)));
        assert!(chains.contains(&ChainId::numeric(137)));
        assert!(chains.contains(&ChainId::named("mainnet-beta")));
    }

    #[test]
    fn test_bridge_intermediates_bound_branching() {
        let catalog = TokenCatalog::with_default_tokens();
        let intermediates = catalog.bridge_intermediates(&ChainId::numeric(1));
        assert_eq!(intermediates.len(), 3);
        assert!(catalog
            .bridge_intermediates(&ChainId::numeric(42161))
            .is_empty());
    }
}

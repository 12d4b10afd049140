use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use crate::ChainId;

/// An alternate destination the receiver is willing to accept
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptTarget {
    /// Destination chain
    pub blockchain: ChainId,

    /// Token symbol or address acceptable on that chain
    pub token: String,

    /// Receiver address on that chain
    pub receiver: String,
}

impl AcceptTarget {
    pub fn new(
        blockchain: impl Into<ChainId>,
        token: impl Into<String>,
        receiver: impl Into<String>,
    ) -> Self {
        Self {
            blockchain: blockchain.into(),
            token: token.into(),
            receiver: receiver.into(),
        }
    }
}

/// A payment request as submitted by the caller
///
/// `from` lists candidate funding addresses; `accept` lists the destination
/// (chain, token, receiver) tuples the payee can absorb. When `accept` is
/// empty the engine derives targets from `token` and `to`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    #[serde(default)]
    pub from: Vec<String>,

    pub to: String,

    /// Human-readable decimal amount, denominated in `token`
    pub amount: String,

    /// Requested token symbol
    pub token: String,

    #[serde(default)]
    pub accept: Vec<AcceptTarget>,
}

impl PaymentRequest {
    pub fn new(
        from: Vec<String>,
        to: impl Into<String>,
        amount: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to: to.into(),
            amount: amount.into(),
            token: token.into(),
            accept: Vec::new(),
        }
    }

    pub fn with_accept(mut self, target: AcceptTarget) -> Self {
        self.accept.push(target);
        self
    }
}

/// Request rejected before discovery could be attempted
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("unparseable amount: {value}")]
    InvalidAmount { value: String },

    #[error("amount must be positive: {value}")]
    NonPositiveAmount { value: String },

    #[error("missing token symbol")]
    MissingToken,
}

/// A request that passed the single central validation pass
///
/// Malformed source addresses are filtered here, once, so downstream code
/// never re-checks them. An empty `sources` list is a valid outcome and
/// simply discovers no routes.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedRequest {
    pub sources: Vec<String>,
    pub to: String,
    pub amount: Decimal,
    pub token: String,
    pub accept: Vec<AcceptTarget>,
}

impl ValidatedRequest {
    pub fn from_request(request: &PaymentRequest) -> Result<Self, RequestError> {
        let token = request.token.trim();
        if token.is_empty() {
            return Err(RequestError::MissingToken);
        }

        let amount = Decimal::from_str(request.amount.trim()).map_err(|_| {
            RequestError::InvalidAmount {
                value: request.amount.clone(),
            }
        })?;
        if amount <= Decimal::ZERO {
            return Err(RequestError::NonPositiveAmount {
                value: request.amount.clone(),
            });
        }

        let mut seen = HashSet::new();
        let sources = request
            .from
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| is_plausible_address(a))
            .filter(|a| seen.insert(a.to_ascii_lowercase()))
            .collect();

        let accept = request
            .accept
            .iter()
            .filter(|t| !t.token.trim().is_empty() && is_plausible_address(t.receiver.trim()))
            .cloned()
            .collect();

        Ok(Self {
            sources,
            to: request.to.trim().to_string(),
            amount,
            token: token.to_string(),
            accept,
        })
    }
}

/// Shape check only; chain-specific encoding is the provider's concern
fn is_plausible_address(address: &str) -> bool {
    !address.is_empty()
        && address.len() >= 8
        && address.len() <= 128
        && address.chars().all(|c| c.is_ascii_alphanumeric() || c == ':' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(from: Vec<&str>) -> PaymentRequest {
        PaymentRequest::new(
            from.into_iter().map(String::from).collect(),
            "0xB0000000000000000000000000000000000000bb",
            "100",
            "USDC",
        )
    }

    #[test]
    fn test_validation_filters_malformed_addresses() {
        let validated = ValidatedRequest::from_request(&request(vec![
            "0xA0000000000000000000000000000000000000aa",
            "",
            "   ",
            "bad addr with spaces",
            "short",
        ]))
        .unwrap();

        assert_eq!(validated.sources.len(), 1);
        assert_eq!(
            validated.sources[0],
            "0xA0000000000000000000000000000000000000aa"
        );
    }

    #[test]
    fn test_validation_dedupes_preserving_order() {
        let validated = ValidatedRequest::from_request(&request(vec![
            "0xA0000000000000000000000000000000000000aa",
            "0xC0000000000000000000000000000000000000cc",
            "0xa0000000000000000000000000000000000000AA",
        ]))
        .unwrap();

        assert_eq!(validated.sources.len(), 2);
        assert!(validated.sources[0].starts_with("0xA"));
        assert!(validated.sources[1].starts_with("0xC"));
    }

    #[test]
    fn test_validation_empty_from_is_not_an_error() {
        let validated = ValidatedRequest::from_request(&request(vec![])).unwrap();
        assert!(validated.sources.is_empty());
    }

    #[test]
    fn test_validation_rejects_bad_amount() {
        let mut req = request(vec!["0xA0000000000000000000000000000000000000aa"]);
        req.amount = "not-a-number".to_string();
        assert!(matches!(
            ValidatedRequest::from_request(&req),
            Err(RequestError::InvalidAmount { .. })
        ));

        req.amount = "0".to_string();
        assert!(matches!(
            ValidatedRequest::from_request(&req),
            Err(RequestError::NonPositiveAmount { .. })
        ));

        req.amount = "-5".to_string();
        assert!(matches!(
            ValidatedRequest::from_request(&req),
            Err(RequestError::NonPositiveAmount { .. })
        ));
    }

    #[test]
    fn test_validation_drops_invalid_accept_entries() {
        let req = request(vec!["0xA0000000000000000000000000000000000000aa"])
            .with_accept(AcceptTarget::new(1u64, "USDC", "0xB0000000000000000000000000000000000000bb"))
            .with_accept(AcceptTarget::new(137u64, "", "0xB0000000000000000000000000000000000000bb"))
            .with_accept(AcceptTarget::new(137u64, "USDT", ""));

        let validated = ValidatedRequest::from_request(&req).unwrap();
        assert_eq!(validated.accept.len(), 1);
        assert_eq!(validated.accept[0].blockchain, ChainId::numeric(1));
    }
}

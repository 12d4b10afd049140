use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Basis points in one whole unit
pub const BPS_DENOMINATOR: u128 = 10_000;

/// An amount in a token's smallest unit
///
/// All arithmetic on amounts happens in base units; decimal strings only
/// appear at the request boundary (`parse_units`) and in the serialized
/// route (`format_units`). Serialized as a string so callers never lose
/// precision to JSON number handling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Units(u128);

impl Units {
    pub const fn new(value: u128) -> Self {
        Units(value)
    }

    pub const fn zero() -> Self {
        Units(0)
    }

    pub const fn value(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Units) -> Option<Units> {
        self.0.checked_add(other.0).map(Units)
    }

    pub fn checked_sub(self, other: Units) -> Option<Units> {
        self.0.checked_sub(other.0).map(Units)
    }

    pub fn saturating_sub(self, other: Units) -> Units {
        Units(self.0.saturating_sub(other.0))
    }

    /// Scale by `keep_bps / 10_000` without intermediate overflow.
    ///
    /// Used for slippage floors: `expected.mul_bps(10_000 - slippage_bps)`.
    pub fn mul_bps(self, keep_bps: u32) -> Units {
        let keep = keep_bps as u128;
        match self.0.checked_mul(keep) {
            Some(product) => Units(product / BPS_DENOMINATOR),
            None => {
                let whole = (self.0 / BPS_DENOMINATOR) * keep;
                let rem = (self.0 % BPS_DENOMINATOR) * keep / BPS_DENOMINATOR;
                Units(whole + rem)
            }
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Units {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u128>()
            .map(Units)
            .map_err(|_| AmountError::InvalidAmount {
                value: s.to_string(),
            })
    }
}

impl Serialize for Units {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Units {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AmountError {
    #[error("invalid amount: {value}")]
    InvalidAmount { value: String },

    #[error("amount must be positive: {value}")]
    NotPositive { value: String },

    #[error("too many decimal places: {value} exceeds {decimals} decimals")]
    TooPrecise { value: String, decimals: u8 },

    #[error("amount overflows base units: {value}")]
    Overflow { value: String },
}

/// Parse a human-readable decimal string into base units.
///
/// `"1.5"` with 6 decimals is 1_500_000. Rejects negatives, precision
/// beyond `decimals`, and values that do not fit in u128.
pub fn parse_units(value: &str, decimals: u8) -> Result<Units, AmountError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') || trimmed.starts_with('+') {
        return Err(AmountError::InvalidAmount {
            value: value.to_string(),
        });
    }

    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(AmountError::InvalidAmount {
            value: value.to_string(),
        });
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(AmountError::InvalidAmount {
            value: value.to_string(),
        });
    }

    let frac = frac.trim_end_matches('0');
    if frac.len() > decimals as usize {
        return Err(AmountError::TooPrecise {
            value: value.to_string(),
            decimals,
        });
    }

    let scale = 10u128
        .checked_pow(decimals as u32)
        .ok_or_else(|| AmountError::Overflow {
            value: value.to_string(),
        })?;

    let whole_part: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountError::Overflow {
            value: value.to_string(),
        })?
    };

    let frac_part: u128 = if frac.is_empty() {
        0
    } else {
        let parsed: u128 = frac.parse().map_err(|_| AmountError::Overflow {
            value: value.to_string(),
        })?;
        parsed * 10u128.pow((decimals as usize - frac.len()) as u32)
    };

    whole_part
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_part))
        .map(Units)
        .ok_or_else(|| AmountError::Overflow {
            value: value.to_string(),
        })
}

/// Format base units back into a human-readable decimal string.
///
/// Trailing fractional zeros are trimmed: 100_000_000 base units of a
/// 6-decimal token formats as `"100"`, not `"100.000000"`.
pub fn format_units(amount: Units, decimals: u8) -> String {
    if decimals == 0 {
        return amount.value().to_string();
    }

    let scale = 10u128.pow(decimals as u32);
    let whole = amount.value() / scale;
    let frac = amount.value() % scale;

    if frac == 0 {
        return whole.to_string();
    }

    let frac_str = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}

//! Asset amounts in integer minor units.
//!
//! All balance arithmetic is checked: overflow or a negative result is a
//! precondition violation surfaced to the caller, never a silent wrap.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;
use thiserror::Error;

/// Integer amount in an asset's minor units.
pub type Share = i64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("asset symbol mismatch: {left} vs {right}")]
    SymbolMismatch { left: AssetSymbol, right: AssetSymbol },

    #[error("amount overflow in asset arithmetic")]
    Overflow,

    #[error("asset amount would become negative")]
    Negative,
}

/// Ticker symbol of an asset, e.g. the native `MRD`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetSymbol(pub String);

impl AssetSymbol {
    pub fn new(sym: impl Into<String>) -> Self {
        Self(sym.into())
    }

    /// Symbols are 3..=7 uppercase ASCII letters.
    pub fn is_valid(&self) -> bool {
        (3..=7).contains(&self.0.len()) && self.0.chars().all(|c| c.is_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An amount of a specific asset.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Asset {
    pub amount: Share,
    pub symbol: AssetSymbol,
}

impl Asset {
    pub fn new(amount: Share, symbol: AssetSymbol) -> Self {
        Self { amount, symbol }
    }

    /// Amount of the chain's native asset.
    pub fn native(amount: Share) -> Self {
        Self::new(amount, crate::config::native_symbol())
    }

    pub fn is_native(&self) -> bool {
        self.symbol == crate::config::native_symbol()
    }

    pub fn checked_add(&self, other: &Asset) -> Result<Asset, AssetError> {
        self.same_symbol(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(AssetError::Overflow)?;
        Ok(Asset::new(amount, self.symbol.clone()))
    }

    pub fn checked_sub(&self, other: &Asset) -> Result<Asset, AssetError> {
        self.same_symbol(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(AssetError::Overflow)?;
        Ok(Asset::new(amount, self.symbol.clone()))
    }

    fn same_symbol(&self, other: &Asset) -> Result<(), AssetError> {
        if self.symbol != other.symbol {
            return Err(AssetError::SymbolMismatch {
                left: self.symbol.clone(),
                right: other.symbol.clone(),
            });
        }
        Ok(())
    }
}

impl Neg for Asset {
    type Output = Asset;

    fn neg(self) -> Asset {
        Asset::new(-self.amount, self.symbol)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_arithmetic_guards_symbol_and_overflow() {
        let a = Asset::native(100);
        let b = Asset::native(30);
        assert_eq!(a.checked_sub(&b).unwrap().amount, 70);

        let other = Asset::new(1, AssetSymbol::new("USD"));
        assert!(matches!(
            a.checked_add(&other),
            Err(AssetError::SymbolMismatch { .. })
        ));

        let max = Asset::native(Share::MAX);
        assert_eq!(max.checked_add(&Asset::native(1)), Err(AssetError::Overflow));
    }

    #[test]
    fn symbol_validation() {
        assert!(AssetSymbol::new("MRD").is_valid());
        assert!(!AssetSymbol::new("mrd").is_valid());
        assert!(!AssetSymbol::new("AB").is_valid());
    }
}

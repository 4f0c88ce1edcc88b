//! Fungible asset metadata and fee exchange rates.

use crate::{AssetId, Balance};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Native asset of the RegionX chain.
pub const REGX_ASSET_ID: AssetId = 0;

/// The relay chain token as registered on RegionX.
pub const RELAY_ASSET_ID: AssetId = 1;

/// Registry metadata for a fungible asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Decimal places.
    pub decimals: u8,
    /// Display name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Minimum balance an account may hold.
    pub existential_deposit: Balance,
}

impl AssetMetadata {
    /// Metadata of the relay chain token.
    pub fn relay_token() -> Self {
        Self {
            decimals: 12,
            name: "ROC".to_string(),
            symbol: "ROC".to_string(),
            existential_deposit: 1_000,
        }
    }
}

/// Price of the native fee currency in units of some other asset.
///
/// Fixed point with 18 decimal places, so `ExchangeRate::ONE` means the two
/// assets trade one to one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeRate(u128);

impl ExchangeRate {
    /// Fixed-point scale.
    pub const ACCURACY: u128 = 1_000_000_000_000_000_000;

    /// A one to one rate.
    pub const ONE: Self = Self(Self::ACCURACY);

    /// Rate from its raw fixed-point representation.
    pub fn from_inner(inner: u128) -> Self {
        Self(inner)
    }

    /// `numerator / denominator`. Returns `None` when not representable.
    pub fn from_rational(numerator: u128, denominator: u128) -> Option<Self> {
        numerator
            .checked_mul(Self::ACCURACY)?
            .checked_div(denominator)
            .map(Self)
    }

    /// Raw fixed-point value.
    pub fn into_inner(self) -> u128 {
        self.0
    }

    /// Convert a native amount into this asset, rounding down.
    ///
    /// Returns `None` for a zero rate or on overflow.
    pub fn to_asset_balance(&self, native: Balance) -> Option<Balance> {
        if self.0 == 0 {
            return None;
        }
        native.checked_mul(Self::ACCURACY)?.checked_div(self.0)
    }
}

impl fmt::Debug for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExchangeRate({}.{:018})",
            self.0 / Self::ACCURACY,
            self.0 % Self::ACCURACY
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_to_one_conversion() {
        assert_eq!(ExchangeRate::ONE.to_asset_balance(12_345), Some(12_345));
    }

    #[test]
    fn test_conversion_rounds_down() {
        // Two native units per asset unit: fees halve.
        let rate = ExchangeRate::from_rational(2, 1).unwrap();
        assert_eq!(rate.to_asset_balance(7), Some(3));

        let rate = ExchangeRate::from_rational(1, 4).unwrap();
        assert_eq!(rate.to_asset_balance(7), Some(28));
    }

    #[test]
    fn test_zero_rate_and_overflow() {
        assert_eq!(ExchangeRate::from_inner(0).to_asset_balance(1), None);
        assert_eq!(ExchangeRate::ONE.to_asset_balance(u128::MAX), None);
        assert_eq!(ExchangeRate::from_rational(1, 0), None);
    }
}

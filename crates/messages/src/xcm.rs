//! Cross-chain message programs.
//!
//! Only the instructions needed to move the relay token and coretime
//! regions, and to make a remote call, are modelled. A program is executed
//! by the receiving chain against a holding register seeded by the
//! asset-introducing instruction at its head.

use crate::Call;
use serde::{Deserialize, Serialize};
use xregion_types::{AccountId, Balance, BlockHeight, Hash, Location, RegionId, CORETIME_PARA_ID};

/// Asset classes that can cross chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetClass {
    /// The relay chain token. Its reserve is the relay chain.
    RelayToken,
    /// Coretime regions. Their reserve is the coretime chain.
    Region,
}

/// Amount or instance of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fungibility {
    Fungible(Balance),
    NonFungible(u128),
}

/// An asset together with its amount or instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiAsset {
    pub class: AssetClass,
    pub fun: Fungibility,
}

impl MultiAsset {
    /// An amount of relay token.
    pub fn relay_token(amount: Balance) -> Self {
        Self {
            class: AssetClass::RelayToken,
            fun: Fungibility::Fungible(amount),
        }
    }

    /// A coretime region.
    pub fn region(region_id: RegionId) -> Self {
        Self {
            class: AssetClass::Region,
            fun: Fungibility::NonFungible(region_id.to_index()),
        }
    }

    /// Fungible amount, if fungible.
    pub fn amount(&self) -> Option<Balance> {
        match self.fun {
            Fungibility::Fungible(amount) => Some(amount),
            Fungibility::NonFungible(_) => None,
        }
    }

    /// Region carried, if this is a region.
    pub fn region_id(&self) -> Option<RegionId> {
        match (self.class, self.fun) {
            (AssetClass::Region, Fungibility::NonFungible(index)) => {
                Some(RegionId::from_index(index))
            }
            _ => None,
        }
    }
}

impl AssetClass {
    /// Whether `location` may back this asset for other chains.
    ///
    /// The relay token is backed by the relay chain and by every system
    /// chain, since they trust each other fully. Regions are only ever backed
    /// by the coretime chain that issued them.
    pub fn is_reserve(&self, location: Location) -> bool {
        match self {
            AssetClass::RelayToken => location.is_system(),
            AssetClass::Region => location == Location::Para(CORETIME_PARA_ID),
        }
    }
}

/// One instruction of a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Take assets from the sender's sovereign account into holding.
    WithdrawAsset(Vec<MultiAsset>),
    /// Mint assets the sender holds in reserve for us into holding.
    ReserveAssetDeposited(Vec<MultiAsset>),
    /// Mint assets the sender burnt into holding.
    ReceiveTeleportedAsset(Vec<MultiAsset>),
    /// Drop the sender's authority for the rest of the program.
    ClearOrigin,
    /// Pay for execution out of holding.
    BuyExecution { fees: MultiAsset },
    /// Dispatch a call with the sender's sovereign authority.
    Transact { call: Call },
    /// Return unused fees to holding.
    RefundSurplus,
    /// Deposit everything in holding to an account.
    DepositAsset { beneficiary: AccountId },
}

/// A program sent from one chain to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xcm(pub Vec<Instruction>);

impl Xcm {
    /// Identifier for logs and events.
    pub fn hash(&self) -> Hash {
        Hash::of(self)
    }

    /// Instructions in order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.0
    }
}

/// A program in flight, with where and when it was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XcmEnvelope {
    /// Sending chain.
    pub origin: Location,
    /// Height of the sending chain's block that emitted the program.
    pub sent_at: BlockHeight,
    /// The program.
    pub message: Xcm,
}

#[cfg(test)]
mod tests {
    use super::*;
    use xregion_types::CoreMask;

    #[test]
    fn test_region_asset_carries_region_id() {
        let region_id = RegionId {
            begin: 34,
            core: 0,
            mask: CoreMask::complete(),
        };
        let asset = MultiAsset::region(region_id);
        assert_eq!(asset.region_id(), Some(region_id));
        assert_eq!(asset.amount(), None);
        assert_eq!(MultiAsset::relay_token(5).region_id(), None);
        assert_eq!(MultiAsset::relay_token(5).amount(), Some(5));
    }

    #[test]
    fn test_reserves() {
        assert!(AssetClass::RelayToken.is_reserve(Location::Relay));
        assert!(AssetClass::RelayToken.is_reserve(Location::Para(CORETIME_PARA_ID)));
        assert!(!AssetClass::RelayToken.is_reserve(Location::Para(xregion_types::REGIONX_PARA_ID)));
        assert!(AssetClass::Region.is_reserve(Location::Para(CORETIME_PARA_ID)));
        assert!(!AssetClass::Region.is_reserve(Location::Relay));
    }
}

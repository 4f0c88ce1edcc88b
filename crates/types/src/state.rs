//! Typed storage keys and values shared by every chain.
//!
//! Each chain's ledger is a single ordered map from [`StorageKey`] to
//! [`StorageValue`]. The canonical encoding of an entry is what the state
//! root commits to, so the same types are used for reads, proofs and
//! cross-chain state requests.

use crate::{
    AccountId, AssetId, AssetMetadata, Balance, BlockHeight, CoreIndex, ExchangeRate, Hash, Order,
    OrderId, ParaId, Region, RegionId, RegionRecord, Request, ScheduleItem, Timeslice,
};
use serde::{Deserialize, Serialize};

/// Key of a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StorageKey {
    // ═══════════════════════════════════════════════════════════════════════
    // Fungibles
    // ═══════════════════════════════════════════════════════════════════════
    /// Native balance of an account.
    Account(AccountId),
    /// Balance of a registered asset.
    Token {
        /// Asset.
        asset: AssetId,
        /// Holder.
        who: AccountId,
    },
    /// Registry metadata.
    AssetMetadata(AssetId),
    /// Fee exchange rate.
    AssetRate(AssetId),

    // ═══════════════════════════════════════════════════════════════════════
    // Coretime broker
    // ═══════════════════════════════════════════════════════════════════════
    /// Current sale.
    SaleInfo,
    /// Region owned by a local account.
    BrokerRegion(RegionId),
    /// Region held in reserve for another chain.
    ReservedRegion(RegionId),
    /// Workplan entry for a core starting at a timeslice.
    Workplan {
        /// First timeslice.
        begin: Timeslice,
        /// Core.
        core: CoreIndex,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Regions, orders and fulfillment
    // ═══════════════════════════════════════════════════════════════════════
    /// Region hosted on this chain.
    Region(RegionId),
    /// Order by id.
    Order(OrderId),
    /// Next order id to allocate.
    NextOrderId,
    /// Amount contributed to an order by one account.
    Contribution {
        /// Order.
        order: OrderId,
        /// Contributor.
        who: AccountId,
    },
    /// Total contributed to an order.
    TotalContribution(OrderId),
    /// Parachain a consumed region was assigned to.
    RegionAssignment(RegionId),

    // ═══════════════════════════════════════════════════════════════════════
    // State-read requests
    // ═══════════════════════════════════════════════════════════════════════
    /// Outstanding request by commitment.
    Request(Hash),
    /// Trusted state root of another chain at a height.
    StateCommitment {
        /// Chain.
        para: ParaId,
        /// Height.
        height: BlockHeight,
    },
    /// Highest height of another chain with a trusted state root.
    LatestStateHeight(ParaId),
    /// Chains whose state roots this chain tracks.
    TrackedChain(ParaId),
    /// Request sequence number.
    RequestNonce,
}

/// Prefix identifying one map of the ledger, for enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoragePrefix {
    Accounts,
    Tokens,
    AssetMetadata,
    AssetRates,
    SaleInfo,
    BrokerRegions,
    ReservedRegions,
    Workplan,
    Regions,
    Orders,
    NextOrderId,
    Contributions,
    TotalContributions,
    RegionAssignments,
    Requests,
    StateCommitments,
    LatestStateHeights,
    TrackedChains,
    RequestNonce,
}

impl StorageKey {
    /// The map this key belongs to.
    pub fn prefix(&self) -> StoragePrefix {
        match self {
            StorageKey::Account(_) => StoragePrefix::Accounts,
            StorageKey::Token { .. } => StoragePrefix::Tokens,
            StorageKey::AssetMetadata(_) => StoragePrefix::AssetMetadata,
            StorageKey::AssetRate(_) => StoragePrefix::AssetRates,
            StorageKey::SaleInfo => StoragePrefix::SaleInfo,
            StorageKey::BrokerRegion(_) => StoragePrefix::BrokerRegions,
            StorageKey::ReservedRegion(_) => StoragePrefix::ReservedRegions,
            StorageKey::Workplan { .. } => StoragePrefix::Workplan,
            StorageKey::Region(_) => StoragePrefix::Regions,
            StorageKey::Order(_) => StoragePrefix::Orders,
            StorageKey::NextOrderId => StoragePrefix::NextOrderId,
            StorageKey::Contribution { .. } => StoragePrefix::Contributions,
            StorageKey::TotalContribution(_) => StoragePrefix::TotalContributions,
            StorageKey::RegionAssignment(_) => StoragePrefix::RegionAssignments,
            StorageKey::Request(_) => StoragePrefix::Requests,
            StorageKey::StateCommitment { .. } => StoragePrefix::StateCommitments,
            StorageKey::LatestStateHeight(_) => StoragePrefix::LatestStateHeights,
            StorageKey::TrackedChain(_) => StoragePrefix::TrackedChains,
            StorageKey::RequestNonce => StoragePrefix::RequestNonce,
        }
    }
}

/// Current coretime sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleInfo {
    /// Price of one core.
    pub price: Balance,
    /// First timeslice of regions sold.
    pub region_begin: Timeslice,
    /// End timeslice of regions sold.
    pub region_end: Timeslice,
    /// Cores on offer.
    pub cores_offered: CoreIndex,
    /// Cores sold so far.
    pub cores_sold: CoreIndex,
}

/// Value of a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageValue {
    Balance(Balance),
    AssetMetadata(AssetMetadata),
    ExchangeRate(ExchangeRate),
    Sale(SaleInfo),
    RegionRecord(RegionRecord),
    Workplan(Vec<ScheduleItem>),
    Region(Region),
    Order(Order),
    OrderId(OrderId),
    Para(ParaId),
    Request(Request),
    StateRoot(Hash),
    Nonce(u64),
    Flag,
    Height(BlockHeight),
}

impl StorageValue {
    /// Canonical encoding, as committed to by the state root.
    pub fn encode(&self) -> Vec<u8> {
        crate::encode(self)
    }

    pub fn as_balance(&self) -> Option<Balance> {
        match self {
            StorageValue::Balance(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_region(&self) -> Option<&Region> {
        match self {
            StorageValue::Region(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_region_record(&self) -> Option<&RegionRecord> {
        match self {
            StorageValue::RegionRecord(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_order(&self) -> Option<&Order> {
        match self {
            StorageValue::Order(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_workplan(&self) -> Option<&[ScheduleItem]> {
        match self {
            StorageValue::Workplan(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_request(&self) -> Option<&Request> {
        match self {
            StorageValue::Request(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_state_root(&self) -> Option<Hash> {
        match self {
            StorageValue::StateRoot(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_height(&self) -> Option<BlockHeight> {
        match self {
            StorageValue::Height(h) => Some(*h),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_matches_variant() {
        let alice = AccountId::from_seed("//Alice");
        assert_eq!(StorageKey::Account(alice).prefix(), StoragePrefix::Accounts);
        assert_eq!(
            StorageKey::Contribution {
                order: OrderId(1),
                who: alice
            }
            .prefix(),
            StoragePrefix::Contributions
        );
        assert_eq!(
            StorageKey::Workplan { begin: 4, core: 0 }.prefix(),
            StoragePrefix::Workplan
        );
    }

    #[test]
    fn test_value_accessors_reject_other_variants() {
        assert_eq!(StorageValue::Balance(5).as_balance(), Some(5));
        assert_eq!(StorageValue::Flag.as_balance(), None);
        assert!(StorageValue::Balance(5).as_region().is_none());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let value = StorageValue::Nonce(9);
        assert_eq!(value.encode(), StorageValue::Nonce(9).encode());
        assert_ne!(value.encode(), StorageValue::Nonce(10).encode());
    }
}

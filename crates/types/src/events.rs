//! Events deposited by chains while producing blocks.

use crate::{
    AccountId, AssetId, Balance, BlockHeight, DispatchError, Hash, Location, OrderId, ParaId,
    RegionId, XcmError,
};
use serde::{Deserialize, Serialize};

/// When during block production an event was deposited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Block initialization: inbound messages, headers, request timeouts.
    Initialization,
    /// While applying the extrinsic at this index.
    ApplyExtrinsic(u32),
}

/// An event with the phase it was deposited in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Phase.
    pub phase: Phase,
    /// Event.
    pub event: RuntimeEvent,
}

/// Everything a chain may report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeEvent {
    // ═══════════════════════════════════════════════════════════════════════
    // System
    // ═══════════════════════════════════════════════════════════════════════
    ExtrinsicSuccess,
    ExtrinsicFailed { error: DispatchError },
    Remarked { who: AccountId },

    // ═══════════════════════════════════════════════════════════════════════
    // Fungibles
    // ═══════════════════════════════════════════════════════════════════════
    Transfer { asset: Option<AssetId>, from: AccountId, to: AccountId, amount: Balance },
    BalanceSet { asset: Option<AssetId>, who: AccountId, free: Balance },
    Minted { asset: Option<AssetId>, who: AccountId, amount: Balance },
    Burned { asset: Option<AssetId>, who: AccountId, amount: Balance },
    FeePaid { who: AccountId, asset: Option<AssetId>, fee: Balance, tip: Balance },
    AssetRegistered { asset: AssetId },
    AssetRateCreated { asset: AssetId },
    AssetRateUpdated { asset: AssetId },

    // ═══════════════════════════════════════════════════════════════════════
    // Coretime broker
    // ═══════════════════════════════════════════════════════════════════════
    SaleStarted { price: Balance, cores: u16 },
    Purchased { who: AccountId, region_id: RegionId, price: Balance },
    BrokerRegionTransferred { region_id: RegionId, old_owner: AccountId, new_owner: AccountId },
    RegionReserved { region_id: RegionId, holder: Location },
    RegionReleased { region_id: RegionId, owner: AccountId },
    Assigned { region_id: RegionId, task: ParaId },

    // ═══════════════════════════════════════════════════════════════════════
    // Regions
    // ═══════════════════════════════════════════════════════════════════════
    RegionMinted { region_id: RegionId, owner: AccountId },
    RegionBurnt { region_id: RegionId },
    RegionTransferred { region_id: RegionId, old_owner: AccountId, new_owner: AccountId },
    RegionRecordRequested { region_id: RegionId, commitment: Hash },
    RecordSet { region_id: RegionId },
    RecordUnavailable { region_id: RegionId, commitment: Hash },

    // ═══════════════════════════════════════════════════════════════════════
    // Orders and fulfillment
    // ═══════════════════════════════════════════════════════════════════════
    OrderCreated { order_id: OrderId },
    Contributed { order_id: OrderId, who: AccountId, amount: Balance },
    OrderProcessed { order_id: OrderId, region_id: RegionId, seller: AccountId },
    RegionAssigned { region_id: RegionId, para_id: ParaId },

    // ═══════════════════════════════════════════════════════════════════════
    // State-read requests
    // ═══════════════════════════════════════════════════════════════════════
    StateCommitmentUpdated { para: ParaId, height: BlockHeight },
    GetRequestHandled { commitment: Hash },
    GetRequestTimedOut { commitment: Hash },

    // ═══════════════════════════════════════════════════════════════════════
    // Cross-chain messages
    // ═══════════════════════════════════════════════════════════════════════
    XcmSent { dest: Location, hash: Hash },
    XcmExecuted { origin: Location, hash: Hash },
    XcmFailed { origin: Location, hash: Hash, error: XcmError },
    Sudid,
}

//! Core types shared by every chain and by the custody protocol.
//!
//! Everything that crosses a crate boundary lives here: identifiers,
//! regions and orders, the typed ledger keys and values, Merkle storage
//! proofs, runtime events and dispatch errors.

mod asset;
mod dispatch;
mod events;
mod hash;
mod identifiers;
mod ismp;
mod merkle;
mod order;
mod region;
mod state;
mod topology;

pub use asset::{AssetMetadata, ExchangeRate, REGX_ASSET_ID, RELAY_ASSET_ID};
pub use dispatch::{
    AssetsError, BrokerError, DispatchError, InvalidTransaction, IsmpError, OrdersError,
    ProcessorError, RegionsError, XcmError,
};
pub use events::{EventRecord, Phase, RuntimeEvent};
pub use hash::Hash;
pub use identifiers::{
    AccountId, AssetId, Balance, BlockHeight, BlockRef, CoreIndex, Location, OrderId, ParaId,
    Timeslice, TIMESLICE_PERIOD,
};
pub use ismp::{GetRequest, Request};
pub use merkle::{
    state_root, storage_leaf_hash, MerkleProof, MerkleTree, ProofError, ProvenEntry,
    StorageProof,
};
pub use order::{check_requirements, Order, Requirements, RequirementsMismatch};
pub use region::{
    CoreAssignment, CoreMask, Region, RegionId, RegionRecord, RegionState, ScheduleItem,
    CORE_MASK_BITS, MAX_CORE_OCCUPANCY, OCCUPANCY_PER_PART,
};
pub use state::{SaleInfo, StorageKey, StoragePrefix, StorageValue};
pub use topology::{
    TransferMode, CORETIME_PARA_ID, REGIONX_PARA_ID, SYSTEM_CHAIN_THRESHOLD,
};

use serde::{de::DeserializeOwned, Serialize};

/// Canonical encoding used for hashing, state roots and proofs.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    bincode::serialize(value).expect("canonical encoding should never fail")
}

/// Decode a canonically encoded value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Option<T> {
    bincode::deserialize(bytes).ok()
}

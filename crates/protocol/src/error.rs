//! Errors surfaced to callers of protocol operations.

use crate::ChainError;
use thiserror::Error;
use xregion_types::{
    AssetId, AssetsError, DispatchError, Hash, InvalidTransaction, IsmpError, Location,
    OrdersError, ProcessorError, RegionId, RequirementsMismatch,
};

/// Why a protocol operation did not complete.
///
/// Nothing is retried: every variant is returned to the caller of the
/// operation that hit it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The extrinsic failed validation and was never included.
    #[error("transaction rejected: {0}")]
    TransactionRejected(InvalidTransaction),

    /// The extrinsic was included but its dispatch failed. No state change
    /// was kept apart from the fee.
    #[error("transaction failed: {0}")]
    TransactionFailed(DispatchError),

    /// A state-read response did not verify.
    #[error("invalid proof: {0}")]
    InvalidProof(IsmpError),

    /// No outstanding request has this commitment.
    #[error("unknown commitment {0}")]
    UnknownCommitment(Hash),

    /// The region is absent, or its record is not available.
    #[error("region not available")]
    RegionNotAvailable,

    /// The region's record already resolved; nothing to request.
    #[error("record of {0} is already available")]
    RecordAlreadyAvailable(RegionId),

    /// The region does not satisfy the order.
    #[error("requirements mismatch: {0}")]
    RequirementsMismatch(RequirementsMismatch),

    #[error("unknown order")]
    UnknownOrder,

    #[error("asset {0} is not registered")]
    AssetNotRegistered(AssetId),

    #[error("insufficient funds")]
    InsufficientFunds,

    /// More than one chain holds a settled entry for the region.
    #[error("{region_id} held by {holders:?}")]
    CustodyViolation {
        region_id: RegionId,
        holders: Vec<Location>,
    },

    /// No connection to this chain.
    #[error("no connection to {0}")]
    UnknownChain(Location),

    /// The chain reported success but not the event the operation relies on.
    #[error("expected event missing: {0}")]
    MissingEvent(&'static str),

    /// The observed state did not reach the expected transition within the
    /// configured number of finalized blocks.
    #[error("{what} not observed within {blocks} finalized blocks")]
    NotSettled { what: &'static str, blocks: u64 },

    /// The chain stopped reporting before a terminal status.
    #[error("status subscription closed")]
    SubscriptionClosed,

    #[error(transparent)]
    Chain(ChainError),
}

impl ProtocolError {
    /// Map a post-inclusion dispatch failure to the most specific variant.
    pub fn from_dispatch(error: DispatchError) -> Self {
        if error.is_region_not_available() {
            return ProtocolError::RegionNotAvailable;
        }
        match error {
            DispatchError::Processor(ProcessorError::Requirements(mismatch)) => {
                ProtocolError::RequirementsMismatch(mismatch)
            }
            DispatchError::Processor(ProcessorError::UnknownOrder)
            | DispatchError::Orders(OrdersError::UnknownOrder) => ProtocolError::UnknownOrder,
            DispatchError::Assets(AssetsError::AssetNotRegistered(asset)) => {
                ProtocolError::AssetNotRegistered(asset)
            }
            DispatchError::InsufficientBalance => ProtocolError::InsufficientFunds,
            DispatchError::Ismp(ismp) => ProtocolError::InvalidProof(ismp),
            other => ProtocolError::TransactionFailed(other),
        }
    }

    /// Map a pool rejection.
    pub fn from_invalid(invalid: InvalidTransaction) -> Self {
        match invalid {
            InvalidTransaction::BadResponse(ismp) => ProtocolError::InvalidProof(ismp),
            other => ProtocolError::TransactionRejected(other),
        }
    }

    /// Whether the error is about the region's state rather than the call.
    pub fn is_region_not_available(&self) -> bool {
        matches!(self, ProtocolError::RegionNotAvailable)
    }
}

impl From<ChainError> for ProtocolError {
    fn from(error: ChainError) -> Self {
        match error {
            ChainError::Rejected(invalid) => ProtocolError::from_invalid(invalid),
            other => ProtocolError::Chain(other),
        }
    }
}

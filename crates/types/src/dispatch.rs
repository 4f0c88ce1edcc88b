//! Errors produced by chains when validating or dispatching calls.
//!
//! Validation errors ([`InvalidTransaction`]) reject an extrinsic before it
//! is included. Dispatch errors ([`DispatchError`]) are reported after
//! inclusion; the extrinsic's state changes are discarded but its fee is
//! still charged.

use crate::{AssetId, ParaId, RequirementsMismatch};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an extrinsic was refused by the transaction pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum InvalidTransaction {
    /// The signer cannot pay the fee.
    #[error("insufficient balance to pay the fee")]
    Payment,

    /// The fee asset is not in the asset registry.
    #[error("fee asset {0} is not registered")]
    UnknownFeeAsset(AssetId),

    /// The fee asset has no exchange rate against the native currency.
    #[error("fee asset {0} has no exchange rate")]
    NoExchangeRate(AssetId),

    /// The chain does not accept fees in non-native assets.
    #[error("chain does not support paying fees in other assets")]
    FeeAssetNotSupported,

    /// An unsigned extrinsic carried a call that must be signed.
    #[error("call must be signed")]
    UnsignedNotAllowed,

    /// An unsigned state-read response failed verification.
    #[error("invalid state response: {0}")]
    BadResponse(IsmpError),
}

/// Failure of a call after inclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum DispatchError {
    /// The origin may not make this call.
    #[error("bad origin")]
    BadOrigin,

    /// An account's free balance is too low.
    #[error("insufficient balance")]
    InsufficientBalance,

    /// An arithmetic operation overflowed.
    #[error("arithmetic overflow")]
    Overflow,

    /// The call's pallet does not exist on this chain.
    #[error("call not available on this chain")]
    CallUnavailable,

    #[error(transparent)]
    Assets(#[from] AssetsError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Regions(#[from] RegionsError),

    #[error(transparent)]
    Orders(#[from] OrdersError),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error(transparent)]
    Ismp(#[from] IsmpError),

    #[error(transparent)]
    Xcm(#[from] XcmError),
}

/// Asset registry, rate and token errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum AssetsError {
    #[error("asset {0} is already registered")]
    AssetAlreadyRegistered(AssetId),
    #[error("asset {0} is not registered")]
    AssetNotRegistered(AssetId),
    #[error("asset {0} has no exchange rate")]
    UnknownRate(AssetId),
    #[error("asset {0} already has an exchange rate")]
    RateAlreadyExists(AssetId),
}

/// Coretime broker errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum BrokerError {
    #[error("no sale is active")]
    NoSales,
    #[error("sold out")]
    SoldOut,
    #[error("price exceeds limit")]
    Overpriced,
    #[error("unknown region")]
    UnknownRegion,
    #[error("not the region owner")]
    NotOwner,
}

/// Errors of the region ledger on a non-coretime chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum RegionsError {
    #[error("unknown region")]
    UnknownRegion,
    #[error("not the region owner")]
    NotOwner,
    #[error("region record is not unavailable")]
    NotUnavailable,
    #[error("region record already set")]
    RecordAlreadySet,
    #[error("region record is not available")]
    RegionNotAvailable,
    #[error("region already exists")]
    AlreadyExists,
}

/// Order errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum OrdersError {
    #[error("unknown order")]
    UnknownOrder,
    #[error("order expired")]
    OrderExpired,
    #[error("contribution below minimum")]
    InvalidAmount,
    #[error("order ids exhausted")]
    OrderIdOverflow,
}

/// Fulfillment errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ProcessorError {
    #[error("unknown region")]
    UnknownRegion,
    #[error("not the region owner")]
    NotOwner,
    #[error("region record unavailable")]
    RecordUnavailable,
    #[error("unknown order")]
    UnknownOrder,
    #[error("requirements not met: {0}")]
    Requirements(RequirementsMismatch),
    #[error("region has no recorded assignment")]
    UnknownAssignment,
}

/// State-read request and response errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum IsmpError {
    #[error("no outstanding request with this commitment")]
    UnknownRequest,
    #[error("request is not a state read")]
    NotGetRequest,
    #[error("no trusted state root for {para} at height {height}")]
    UnknownStateCommitment { para: ParaId, height: u64 },
    #[error("storage proof does not verify")]
    InvalidProof,
    #[error("proven value is missing or of the wrong type")]
    ValueNotFound,
    #[error("chain is not tracked")]
    UntrackedChain,
}

/// Cross-chain message execution errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum XcmError {
    #[error("sender is not a trusted teleporter")]
    UntrustedTeleporter,
    #[error("sender is not the reserve of the asset")]
    UntrustedReserve,
    #[error("asset not found in holding")]
    AssetNotFound,
    #[error("fee too low to buy execution")]
    TooExpensive,
    #[error("asset is not registered locally")]
    AssetNotRegistered,
    #[error("destination is not reachable")]
    Unroutable,
    #[error("failed to transact asset: {0}")]
    FailedToTransactAsset(String),
    #[error("origin was cleared")]
    BadOrigin,
    #[error("transact failed: {0}")]
    Transact(String),
}

impl DispatchError {
    /// True for errors that indicate the region is not in a transferable or
    /// consumable state.
    pub fn is_region_not_available(&self) -> bool {
        matches!(
            self,
            DispatchError::Regions(RegionsError::RegionNotAvailable)
                | DispatchError::Regions(RegionsError::UnknownRegion)
                | DispatchError::Processor(ProcessorError::UnknownRegion)
                | DispatchError::Processor(ProcessorError::RecordUnavailable)
        )
    }
}

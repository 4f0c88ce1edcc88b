//! Extrinsics submitted to a chain's transaction pool.

use crate::Call;
use serde::{Deserialize, Serialize};
use xregion_types::{AccountId, AssetId, Balance, Hash};

/// Fee options attached to a signed extrinsic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOptions {
    /// Extra amount paid on top of the fee.
    pub tip: Balance,
    /// Pay the fee in this registered asset instead of the native currency.
    pub fee_asset: Option<AssetId>,
}

impl SubmitOptions {
    /// Pay fees in `asset`.
    pub fn with_fee_asset(mut self, asset: AssetId) -> Self {
        self.fee_asset = Some(asset);
        self
    }

    /// Add a tip.
    pub fn with_tip(mut self, tip: Balance) -> Self {
        self.tip = tip;
        self
    }
}

/// The signer and fee options of a signed extrinsic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedExtra {
    pub signer: AccountId,
    pub options: SubmitOptions,
}

/// A call as submitted to a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extrinsic {
    /// Absent for unsigned extrinsics.
    pub signed: Option<SignedExtra>,
    pub call: Call,
}

impl Extrinsic {
    /// A signed extrinsic.
    pub fn signed(signer: AccountId, call: Call, options: SubmitOptions) -> Self {
        Self {
            signed: Some(SignedExtra { signer, options }),
            call,
        }
    }

    /// An unsigned extrinsic.
    pub fn unsigned(call: Call) -> Self {
        Self { signed: None, call }
    }

    /// Signer, if signed.
    pub fn signer(&self) -> Option<AccountId> {
        self.signed.as_ref().map(|s| s.signer)
    }

    /// Hash of the extrinsic.
    pub fn hash(&self) -> Hash {
        Hash::of(self)
    }
}

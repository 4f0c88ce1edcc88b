//! Transaction pool validation and fee payment.
//!
//! Signed extrinsics pay `base_fee + tip` in the native currency, or the
//! equivalent in a registered asset converted at its exchange rate. Unsigned
//! extrinsics are only accepted for state-read responses, which must verify
//! before they reach a block.

use crate::pallets::{assets, fungibles, ismp};
use crate::{ChainConfig, Context, Ledger, Pallet};
use xregion_messages::{Call, Datagram, Extrinsic, IsmpCall, SignedExtra};
use xregion_types::{
    AccountId, AssetId, Balance, InvalidTransaction, RuntimeEvent, StorageKey,
};

/// Fee a validated signed extrinsic will be charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeCharge {
    /// Payer.
    pub who: AccountId,
    /// Currency the fee is paid in. `None` is native.
    pub asset: Option<AssetId>,
    /// Amount debited, in `asset`.
    pub amount: Balance,
    /// Tip included in the native fee.
    pub tip: Balance,
}

/// Work out the fee of a signed extrinsic and check it can be paid.
pub fn compute_fee(
    ledger: &Ledger,
    config: &ChainConfig,
    extra: &SignedExtra,
) -> Result<FeeCharge, InvalidTransaction> {
    let tip = extra.options.tip;
    let native = config
        .base_fee
        .checked_add(tip)
        .ok_or(InvalidTransaction::Payment)?;

    let amount = match extra.options.fee_asset {
        None => native,
        Some(asset) => {
            if !config.fee_asset_payment {
                return Err(InvalidTransaction::FeeAssetNotSupported);
            }
            if !ledger.contains(&StorageKey::AssetMetadata(asset)) {
                return Err(InvalidTransaction::UnknownFeeAsset(asset));
            }
            let rate =
                assets::rate(ledger, asset).ok_or(InvalidTransaction::NoExchangeRate(asset))?;
            rate.to_asset_balance(native)
                .ok_or(InvalidTransaction::Payment)?
        }
    };

    let asset = extra.options.fee_asset;
    if fungibles::balance(ledger, asset, &extra.signer) < amount {
        return Err(InvalidTransaction::Payment);
    }
    Ok(FeeCharge {
        who: extra.signer,
        asset,
        amount,
        tip,
    })
}

/// Check an extrinsic against `ledger`, returning the fee it will pay.
pub fn validate(
    ledger: &Ledger,
    config: &ChainConfig,
    extrinsic: &Extrinsic,
) -> Result<Option<FeeCharge>, InvalidTransaction> {
    if let Some(extra) = &extrinsic.signed {
        return compute_fee(ledger, config, extra).map(Some);
    }
    match &extrinsic.call {
        Call::Ismp(IsmpCall::HandleUnsigned { messages }) if config.kind.has(Pallet::Ismp) => {
            for Datagram::Response(message) in messages {
                ismp::validate_response(ledger, message).map_err(InvalidTransaction::BadResponse)?;
            }
            Ok(None)
        }
        _ => Err(InvalidTransaction::UnsignedNotAllowed),
    }
}

/// Debit a fee computed by [`compute_fee`].
pub fn charge(ctx: &mut Context, fee: &FeeCharge) -> Result<(), InvalidTransaction> {
    fungibles::withdraw(ctx, fee.asset, fee.who, fee.amount)
        .map_err(|_| InvalidTransaction::Payment)?;
    ctx.deposit_event(RuntimeEvent::FeePaid {
        who: fee.who,
        asset: fee.asset,
        fee: fee.amount,
        tip: fee.tip,
    });
    Ok(())
}

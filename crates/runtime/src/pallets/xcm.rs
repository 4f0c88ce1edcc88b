//! Cross-chain transfers: the sending calls and the executor for inbound
//! programs.
//!
//! Sending side:
//!
//! ```text
//!   teleport          burn here         ──► ReceiveTeleportedAsset
//!   reserve (here)    lock for dest     ──► ReserveAssetDeposited
//!   reserve (dest)    burn derivative   ──► WithdrawAsset
//! ```
//!
//! Each program continues with `ClearOrigin, BuyExecution, DepositAsset`.
//! The receiving chain executes it against a holding register. A failing
//! program leaves no trace beyond an `XcmFailed` event.

use crate::pallets::{broker, fungibles, regions};
use crate::{dispatch, ChainKind, Context, Origin};
use tracing::{debug, warn};
use xregion_messages::{AssetClass, Instruction, MultiAsset, Xcm, XcmCall, XcmEnvelope};
use xregion_types::{
    AccountId, AssetsError, Balance, BlockHeight, DispatchError, Location, RegionId, RegionRecord,
    RuntimeEvent, XcmError,
};

// ═══════════════════════════════════════════════════════════════════════════
// Sending
// ═══════════════════════════════════════════════════════════════════════════

fn relay_amount(assets: &[MultiAsset]) -> Result<Balance, DispatchError> {
    assets
        .iter()
        .filter(|asset| asset.class == AssetClass::RelayToken)
        .try_fold(0u128, |total, asset| {
            let amount = asset.amount().ok_or(XcmError::AssetNotFound)?;
            total.checked_add(amount).ok_or(DispatchError::Overflow)
        })
}

fn fee_asset(assets: &[MultiAsset]) -> MultiAsset {
    assets
        .iter()
        .find(|asset| asset.class == AssetClass::RelayToken)
        .copied()
        .unwrap_or(MultiAsset::relay_token(0))
}

fn program(head: Instruction, fees: MultiAsset, beneficiary: AccountId) -> Xcm {
    Xcm(vec![
        head,
        Instruction::ClearOrigin,
        Instruction::BuyExecution { fees },
        Instruction::DepositAsset { beneficiary },
    ])
}

/// Teleport relay token to another system chain.
pub fn teleport_assets(
    ctx: &mut Context,
    who: AccountId,
    dest: Location,
    beneficiary: AccountId,
    assets: Vec<MultiAsset>,
) -> Result<(), DispatchError> {
    if !ctx.here().is_system() || !dest.is_system() {
        return Err(XcmError::UntrustedTeleporter.into());
    }
    if assets.iter().any(|asset| asset.class != AssetClass::RelayToken) {
        return Err(XcmError::UntrustedTeleporter.into());
    }
    let amount = relay_amount(&assets)?;
    let currency = ctx.config.relay_token;
    fungibles::withdraw(ctx, currency, who, amount)?;

    let fees = fee_asset(&assets);
    debug!(%dest, amount, "Teleporting");
    ctx.send_xcm(
        dest,
        program(Instruction::ReceiveTeleportedAsset(assets), fees, beneficiary),
    );
    Ok(())
}

/// Reserve-transfer assets to `dest`.
///
/// Either this chain is the reserve of every asset (they are locked for
/// `dest`) or `dest` is (our derivatives are burnt). Mixed transfers are
/// not routable.
pub fn reserve_transfer_assets(
    ctx: &mut Context,
    who: AccountId,
    dest: Location,
    beneficiary: AccountId,
    assets: Vec<MultiAsset>,
) -> Result<(), DispatchError> {
    let here = ctx.here();
    let currency = ctx.config.relay_token;
    let fees = fee_asset(&assets);

    let head = if assets.iter().all(|asset| asset.class.is_reserve(here)) {
        for asset in &assets {
            match asset.class {
                AssetClass::RelayToken => {
                    let amount = asset.amount().ok_or(XcmError::AssetNotFound)?;
                    fungibles::transfer(ctx, currency, who, dest.sovereign_account(), amount)?;
                }
                AssetClass::Region => {
                    let region_id = asset.region_id().ok_or(XcmError::AssetNotFound)?;
                    if ctx.config.kind != ChainKind::Coretime {
                        return Err(XcmError::Unroutable.into());
                    }
                    broker::reserve(ctx, region_id, who, dest)?;
                }
            }
        }
        Instruction::ReserveAssetDeposited(assets)
    } else if assets.iter().all(|asset| asset.class.is_reserve(dest)) {
        for asset in &assets {
            match asset.class {
                AssetClass::RelayToken => {
                    let amount = asset.amount().ok_or(XcmError::AssetNotFound)?;
                    fungibles::withdraw(ctx, currency, who, amount)?;
                }
                AssetClass::Region => {
                    let region_id = asset.region_id().ok_or(XcmError::AssetNotFound)?;
                    if ctx.config.kind != ChainKind::RegionX {
                        return Err(XcmError::Unroutable.into());
                    }
                    regions::burn(ctx, region_id, who)?;
                }
            }
        }
        Instruction::WithdrawAsset(assets)
    } else {
        return Err(XcmError::Unroutable.into());
    };

    debug!(%dest, "Reserve transfer sent");
    ctx.send_xcm(dest, program(head, fees, beneficiary));
    Ok(())
}

pub(crate) fn dispatch_call(
    ctx: &mut Context,
    origin: Origin,
    call: XcmCall,
) -> Result<(), DispatchError> {
    let who = origin.ensure_signed()?;
    match call {
        XcmCall::TeleportAssets {
            dest,
            beneficiary,
            assets,
        } => teleport_assets(ctx, who, dest, beneficiary, assets),
        XcmCall::ReserveTransferAssets {
            dest,
            beneficiary,
            assets,
        } => reserve_transfer_assets(ctx, who, dest, beneficiary, assets),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Executing
// ═══════════════════════════════════════════════════════════════════════════

/// Assets held while a program runs.
#[derive(Debug, Default)]
struct Holding {
    relay: Balance,
    /// Regions with their record, when the record travelled with them.
    regions: Vec<(RegionId, Option<RegionRecord>)>,
}

fn asset_error(err: DispatchError) -> XcmError {
    match err {
        DispatchError::Xcm(err) => err,
        DispatchError::Assets(AssetsError::AssetNotRegistered(_)) => {
            XcmError::AssetNotRegistered
        }
        other => XcmError::FailedToTransactAsset(other.to_string()),
    }
}

fn take_into_holding(
    ctx: &mut Context,
    holding: &mut Holding,
    origin: Location,
    assets: &[MultiAsset],
) -> Result<(), XcmError> {
    let currency = ctx.config.relay_token;
    for asset in assets {
        match asset.class {
            AssetClass::RelayToken => {
                let amount = asset.amount().ok_or(XcmError::AssetNotFound)?;
                fungibles::withdraw(ctx, currency, origin.sovereign_account(), amount)
                    .map_err(asset_error)?;
                holding.relay += amount;
            }
            AssetClass::Region => {
                let region_id = asset.region_id().ok_or(XcmError::AssetNotFound)?;
                if ctx.config.kind != ChainKind::Coretime {
                    return Err(XcmError::AssetNotFound);
                }
                let record =
                    broker::take_reserved(ctx, region_id, origin).map_err(asset_error)?;
                holding.regions.push((region_id, Some(record)));
            }
        }
    }
    Ok(())
}

fn mint_into_holding(holding: &mut Holding, assets: &[MultiAsset]) -> Result<(), XcmError> {
    for asset in assets {
        match asset.class {
            AssetClass::RelayToken => {
                holding.relay += asset.amount().ok_or(XcmError::AssetNotFound)?;
            }
            AssetClass::Region => {
                let region_id = asset.region_id().ok_or(XcmError::AssetNotFound)?;
                holding.regions.push((region_id, None));
            }
        }
    }
    Ok(())
}

fn deposit_holding(
    ctx: &mut Context,
    holding: &mut Holding,
    beneficiary: AccountId,
    sent_at: BlockHeight,
) -> Result<(), XcmError> {
    if holding.relay > 0 {
        let currency = ctx.config.relay_token;
        fungibles::deposit(ctx, currency, beneficiary, holding.relay).map_err(asset_error)?;
        holding.relay = 0;
    }
    for (region_id, record) in std::mem::take(&mut holding.regions) {
        match (ctx.config.kind, record) {
            (ChainKind::Coretime, Some(record)) => {
                broker::release(ctx, region_id, record, beneficiary);
            }
            (ChainKind::RegionX, None) => {
                regions::mint_into(ctx, region_id, beneficiary, sent_at).map_err(asset_error)?;
            }
            _ => return Err(XcmError::AssetNotFound),
        }
    }
    Ok(())
}

fn run(ctx: &mut Context, envelope: &XcmEnvelope) -> Result<(), XcmError> {
    let here = ctx.here();
    let mut origin = Some(envelope.origin);
    let mut holding = Holding::default();

    for instruction in envelope.message.instructions() {
        match instruction {
            Instruction::WithdrawAsset(assets) => {
                let origin = origin.ok_or(XcmError::BadOrigin)?;
                take_into_holding(ctx, &mut holding, origin, assets)?;
            }
            Instruction::ReserveAssetDeposited(assets) => {
                let origin = origin.ok_or(XcmError::BadOrigin)?;
                if !assets.iter().all(|asset| asset.class.is_reserve(origin)) {
                    return Err(XcmError::UntrustedReserve);
                }
                mint_into_holding(&mut holding, assets)?;
            }
            Instruction::ReceiveTeleportedAsset(assets) => {
                let origin = origin.ok_or(XcmError::BadOrigin)?;
                if !origin.is_system() || !here.is_system() {
                    return Err(XcmError::UntrustedTeleporter);
                }
                if assets.iter().any(|asset| asset.class != AssetClass::RelayToken) {
                    return Err(XcmError::UntrustedTeleporter);
                }
                mint_into_holding(&mut holding, assets)?;
            }
            Instruction::ClearOrigin => origin = None,
            Instruction::BuyExecution { fees } => {
                // Execution is priced flat; the fee is burnt from holding.
                let price = ctx.config.xcm_execution_fee;
                let offered = fees.amount().unwrap_or(0);
                if offered < price || holding.relay < price {
                    return Err(XcmError::TooExpensive);
                }
                holding.relay -= price;
            }
            Instruction::Transact { call } => {
                let origin = origin.ok_or(XcmError::BadOrigin)?;
                dispatch(ctx, Origin::Xcm(origin), call.clone())
                    .map_err(|err| XcmError::Transact(err.to_string()))?;
            }
            Instruction::RefundSurplus => {}
            Instruction::DepositAsset { beneficiary } => {
                deposit_holding(ctx, &mut holding, *beneficiary, envelope.sent_at)?;
            }
        }
    }
    Ok(())
}

/// Execute an inbound program atomically.
pub fn execute(ctx: &mut Context, envelope: XcmEnvelope) {
    let hash = envelope.message.hash();
    let origin = envelope.origin;
    match ctx.with_transaction(|ctx| run(ctx, &envelope)) {
        Ok(()) => {
            debug!(%origin, hash = %hash, "Xcm executed");
            ctx.deposit_event(RuntimeEvent::XcmExecuted { origin, hash });
        }
        Err(error) => {
            warn!(%origin, hash = %hash, %error, "Xcm failed");
            ctx.deposit_event(RuntimeEvent::XcmFailed {
                origin,
                hash,
                error,
            });
        }
    }
}

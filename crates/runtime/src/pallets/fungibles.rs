//! Native balances and registered-asset balances.
//!
//! `asset: None` addresses the chain's native currency; `Some(id)` a token
//! from the asset registry. Zero balances are removed from the ledger.

use crate::{Context, Ledger, Origin};
use xregion_messages::{BalancesCall, TokensCall};
use xregion_types::{
    AccountId, AssetId, AssetsError, Balance, DispatchError, RuntimeEvent, StorageKey,
    StorageValue,
};

fn key(asset: Option<AssetId>, who: AccountId) -> StorageKey {
    match asset {
        None => StorageKey::Account(who),
        Some(asset) => StorageKey::Token { asset, who },
    }
}

/// Free balance of `who`.
pub fn balance(ledger: &Ledger, asset: Option<AssetId>, who: &AccountId) -> Balance {
    ledger
        .get(&key(asset, *who))
        .and_then(StorageValue::as_balance)
        .unwrap_or(0)
}

/// Fail unless `asset` is native or registered.
pub fn ensure_known(ledger: &Ledger, asset: Option<AssetId>) -> Result<(), DispatchError> {
    match asset {
        Some(id) if !ledger.contains(&StorageKey::AssetMetadata(id)) => {
            Err(AssetsError::AssetNotRegistered(id).into())
        }
        _ => Ok(()),
    }
}

fn write(ledger: &mut Ledger, asset: Option<AssetId>, who: AccountId, free: Balance) {
    if free == 0 {
        ledger.remove(&key(asset, who));
    } else {
        ledger.insert(key(asset, who), StorageValue::Balance(free));
    }
}

fn increase(
    ctx: &mut Context,
    asset: Option<AssetId>,
    who: AccountId,
    amount: Balance,
) -> Result<(), DispatchError> {
    ensure_known(&ctx.ledger, asset)?;
    let free = balance(&ctx.ledger, asset, &who)
        .checked_add(amount)
        .ok_or(DispatchError::Overflow)?;
    write(&mut ctx.ledger, asset, who, free);
    Ok(())
}

fn decrease(
    ctx: &mut Context,
    asset: Option<AssetId>,
    who: AccountId,
    amount: Balance,
) -> Result<(), DispatchError> {
    ensure_known(&ctx.ledger, asset)?;
    let free = balance(&ctx.ledger, asset, &who)
        .checked_sub(amount)
        .ok_or(DispatchError::InsufficientBalance)?;
    write(&mut ctx.ledger, asset, who, free);
    Ok(())
}

/// Mint `amount` into `who`.
pub fn deposit(
    ctx: &mut Context,
    asset: Option<AssetId>,
    who: AccountId,
    amount: Balance,
) -> Result<(), DispatchError> {
    increase(ctx, asset, who, amount)?;
    ctx.deposit_event(RuntimeEvent::Minted { asset, who, amount });
    Ok(())
}

/// Burn `amount` from `who`.
pub fn withdraw(
    ctx: &mut Context,
    asset: Option<AssetId>,
    who: AccountId,
    amount: Balance,
) -> Result<(), DispatchError> {
    decrease(ctx, asset, who, amount)?;
    ctx.deposit_event(RuntimeEvent::Burned { asset, who, amount });
    Ok(())
}

/// Move `amount` from `from` to `to`.
pub fn transfer(
    ctx: &mut Context,
    asset: Option<AssetId>,
    from: AccountId,
    to: AccountId,
    amount: Balance,
) -> Result<(), DispatchError> {
    decrease(ctx, asset, from, amount)?;
    increase(ctx, asset, to, amount)?;
    ctx.deposit_event(RuntimeEvent::Transfer {
        asset,
        from,
        to,
        amount,
    });
    Ok(())
}

/// Overwrite the free balance of `who`.
pub fn set_balance(
    ctx: &mut Context,
    asset: Option<AssetId>,
    who: AccountId,
    free: Balance,
) -> Result<(), DispatchError> {
    ensure_known(&ctx.ledger, asset)?;
    write(&mut ctx.ledger, asset, who, free);
    ctx.deposit_event(RuntimeEvent::BalanceSet { asset, who, free });
    Ok(())
}

pub(crate) fn dispatch_balances(
    ctx: &mut Context,
    origin: Origin,
    call: BalancesCall,
) -> Result<(), DispatchError> {
    match call {
        BalancesCall::TransferKeepAlive { dest, value } => {
            let who = origin.ensure_signed()?;
            transfer(ctx, None, who, dest, value)
        }
        BalancesCall::ForceSetBalance { who, new_free } => {
            origin.ensure_root()?;
            set_balance(ctx, None, who, new_free)
        }
    }
}

pub(crate) fn dispatch_tokens(
    ctx: &mut Context,
    origin: Origin,
    call: TokensCall,
) -> Result<(), DispatchError> {
    match call {
        TokensCall::Transfer { dest, asset, amount } => {
            let who = origin.ensure_signed()?;
            transfer(ctx, Some(asset), who, dest, amount)
        }
        TokensCall::SetBalance { who, asset, free } => {
            origin.ensure_root()?;
            set_balance(ctx, Some(asset), who, free)
        }
    }
}

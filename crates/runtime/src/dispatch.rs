//! Call routing.

use crate::pallets::{assets, broker, fungibles, ismp, orders, processor, regions, xcm};
use crate::{Context, Origin, Pallet};
use xregion_messages::{Call, SudoCall, SystemCall, UtilityCall};
use xregion_types::{DispatchError, RuntimeEvent};

fn ensure_pallet(ctx: &Context, pallet: Pallet) -> Result<(), DispatchError> {
    if ctx.config.kind.has(pallet) {
        Ok(())
    } else {
        Err(DispatchError::CallUnavailable)
    }
}

/// Dispatch `call` with `origin`.
///
/// Not transactional by itself; callers wrap it in
/// [`Context::with_transaction`] where a failure must leave no trace.
pub fn dispatch(ctx: &mut Context, origin: Origin, call: Call) -> Result<(), DispatchError> {
    match call {
        Call::System(SystemCall::Remark { .. }) => {
            let who = origin.ensure_signed()?;
            ctx.deposit_event(RuntimeEvent::Remarked { who });
            Ok(())
        }
        Call::Balances(call) => fungibles::dispatch_balances(ctx, origin, call),
        Call::Tokens(call) => {
            ensure_pallet(ctx, Pallet::Tokens)?;
            fungibles::dispatch_tokens(ctx, origin, call)
        }
        Call::AssetRegistry(call) => {
            ensure_pallet(ctx, Pallet::AssetRegistry)?;
            assets::dispatch_registry(ctx, origin, call)
        }
        Call::AssetRate(call) => {
            ensure_pallet(ctx, Pallet::AssetRate)?;
            assets::dispatch_rate(ctx, origin, call)
        }
        Call::Broker(call) => {
            ensure_pallet(ctx, Pallet::Broker)?;
            broker::dispatch(ctx, origin, call)
        }
        Call::Regions(call) => {
            ensure_pallet(ctx, Pallet::Regions)?;
            regions::dispatch(ctx, origin, call)
        }
        Call::Orders(call) => {
            ensure_pallet(ctx, Pallet::Orders)?;
            orders::dispatch(ctx, origin, call)
        }
        Call::Processor(call) => {
            ensure_pallet(ctx, Pallet::Processor)?;
            processor::dispatch(ctx, origin, call)
        }
        Call::Ismp(call) => {
            ensure_pallet(ctx, Pallet::Ismp)?;
            ismp::dispatch(ctx, origin, call)
        }
        Call::Xcm(call) => xcm::dispatch_call(ctx, origin, call),
        Call::Sudo(SudoCall::Sudo { call }) => {
            let allowed = match &origin {
                Origin::Root => true,
                Origin::Signed(who) => ctx.config.sudo_key == Some(*who),
                Origin::Xcm(_) | Origin::None => false,
            };
            if !allowed {
                return Err(DispatchError::BadOrigin);
            }
            dispatch(ctx, Origin::Root, *call)?;
            ctx.deposit_event(RuntimeEvent::Sudid);
            Ok(())
        }
        Call::Utility(UtilityCall::BatchAll { calls }) => ctx.with_transaction(|ctx| {
            for call in calls {
                dispatch(ctx, origin.clone(), call)?;
            }
            Ok(())
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChainConfig, Ledger};
    use std::time::Duration;
    use xregion_messages::{BalancesCall, BrokerCall, RegionsCall};
    use xregion_types::{AccountId, BlockHeight, CoreMask, RegionId};

    fn region_id() -> RegionId {
        RegionId {
            begin: 0,
            core: 0,
            mask: CoreMask::complete(),
        }
    }

    #[test]
    fn test_pallets_are_per_chain() {
        let alice = AccountId::from_seed("//Alice");
        let config = ChainConfig::coretime();
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        let call = Call::Regions(RegionsCall::RequestRegionRecord {
            region_id: region_id(),
        });
        assert_eq!(
            dispatch(&mut ctx, Origin::Signed(alice), call),
            Err(DispatchError::CallUnavailable)
        );

        let config = ChainConfig::regionx();
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        let call = Call::Broker(BrokerCall::Purchase { price_limit: 1 });
        assert_eq!(
            dispatch(&mut ctx, Origin::Signed(alice), call),
            Err(DispatchError::CallUnavailable)
        );
    }

    #[test]
    fn test_sudo_requires_key() {
        let alice = AccountId::from_seed("//Alice");
        let bob = AccountId::from_seed("//Bob");
        let config = ChainConfig::relay().with_sudo(alice);
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        let call = Call::Balances(BalancesCall::ForceSetBalance {
            who: bob,
            new_free: 50,
        })
        .sudo();

        assert_eq!(
            dispatch(&mut ctx, Origin::Signed(bob), call.clone()),
            Err(DispatchError::BadOrigin)
        );
        dispatch(&mut ctx, Origin::Signed(alice), call).unwrap();
        assert_eq!(fungibles::balance(&ctx.ledger, None, &bob), 50);
        assert_eq!(ctx.take_events().last(), Some(&RuntimeEvent::Sudid));
    }

    #[test]
    fn test_batch_all_is_atomic() {
        let alice = AccountId::from_seed("//Alice");
        let bob = AccountId::from_seed("//Bob");
        let config = ChainConfig::relay();
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        fungibles::deposit(&mut ctx, None, alice, 100).unwrap();

        let transfer = |value| {
            Call::Balances(BalancesCall::TransferKeepAlive { dest: bob, value })
        };
        let batch = Call::Utility(UtilityCall::BatchAll {
            calls: vec![transfer(60), transfer(60)],
        });
        assert_eq!(
            dispatch(&mut ctx, Origin::Signed(alice), batch),
            Err(DispatchError::InsufficientBalance)
        );
        assert_eq!(fungibles::balance(&ctx.ledger, None, &alice), 100);
        assert_eq!(fungibles::balance(&ctx.ledger, None, &bob), 0);
    }
}

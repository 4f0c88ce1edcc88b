//! Coretime broker: sells regions, keeps them in custody for other chains
//! and turns assignments into workplan entries.
//!
//! ```text
//!   purchase ──► BrokerRegion ──reserve──► ReservedRegion ──assign──► Workplan
//!                     ▲                          │
//!                     └──────── release ─────────┘
//! ```

use crate::pallets::fungibles;
use crate::{Context, Ledger, Origin};
use tracing::debug;
use xregion_messages::BrokerCall;
use xregion_types::{
    AccountId, Balance, BrokerError, CoreAssignment, CoreMask, DispatchError, Location, ParaId,
    RegionId, RegionRecord, RuntimeEvent, SaleInfo, ScheduleItem, StorageKey, StorageValue,
    Timeslice,
};

fn sale(ledger: &Ledger) -> Option<SaleInfo> {
    match ledger.get(&StorageKey::SaleInfo) {
        Some(StorageValue::Sale(sale)) => Some(sale.clone()),
        _ => None,
    }
}

fn record(ledger: &Ledger, key: &StorageKey) -> Option<RegionRecord> {
    ledger.get(key).and_then(StorageValue::as_region_record).cloned()
}

/// Open a sale. Replaces any previous sale.
pub fn start_sales(
    ctx: &mut Context,
    price: Balance,
    cores: u16,
    region_begin: Timeslice,
    region_length: Timeslice,
) -> Result<(), DispatchError> {
    let region_end = region_begin
        .checked_add(region_length)
        .ok_or(DispatchError::Overflow)?;
    ctx.ledger.insert(
        StorageKey::SaleInfo,
        StorageValue::Sale(SaleInfo {
            price,
            region_begin,
            region_end,
            cores_offered: cores,
            cores_sold: 0,
        }),
    );
    ctx.deposit_event(RuntimeEvent::SaleStarted { price, cores });
    Ok(())
}

/// Buy the next core of the current sale.
pub fn purchase(
    ctx: &mut Context,
    who: AccountId,
    price_limit: Balance,
) -> Result<RegionId, DispatchError> {
    let mut sale = sale(&ctx.ledger).ok_or(BrokerError::NoSales)?;
    if sale.cores_sold >= sale.cores_offered {
        return Err(BrokerError::SoldOut.into());
    }
    if sale.price > price_limit {
        return Err(BrokerError::Overpriced.into());
    }
    fungibles::withdraw(ctx, None, who, sale.price)?;

    let region_id = RegionId {
        begin: sale.region_begin,
        core: sale.cores_sold,
        mask: CoreMask::complete(),
    };
    ctx.ledger.insert(
        StorageKey::BrokerRegion(region_id),
        StorageValue::RegionRecord(RegionRecord {
            end: sale.region_end,
            owner: who,
            paid: Some(sale.price),
        }),
    );
    sale.cores_sold += 1;
    ctx.ledger.insert(StorageKey::SaleInfo, StorageValue::Sale(sale.clone()));

    debug!(%region_id, %who, price = sale.price, "Region purchased");
    ctx.deposit_event(RuntimeEvent::Purchased {
        who,
        region_id,
        price: sale.price,
    });
    Ok(region_id)
}

/// Change the owner of a locally held region.
pub fn transfer(
    ctx: &mut Context,
    who: AccountId,
    region_id: RegionId,
    new_owner: AccountId,
) -> Result<(), DispatchError> {
    let key = StorageKey::BrokerRegion(region_id);
    let mut record = record(&ctx.ledger, &key).ok_or(BrokerError::UnknownRegion)?;
    if record.owner != who {
        return Err(BrokerError::NotOwner.into());
    }
    record.owner = new_owner;
    ctx.ledger.insert(key, StorageValue::RegionRecord(record));
    ctx.deposit_event(RuntimeEvent::BrokerRegionTransferred {
        region_id,
        old_owner: who,
        new_owner,
    });
    Ok(())
}

/// Move a region owned by `owner` into custody for `holder`.
///
/// The reserved record is owned by the holder's sovereign account, which is
/// what the holder later proves and what authorises its assignment.
pub fn reserve(
    ctx: &mut Context,
    region_id: RegionId,
    owner: AccountId,
    holder: Location,
) -> Result<(), DispatchError> {
    let key = StorageKey::BrokerRegion(region_id);
    let mut record = record(&ctx.ledger, &key).ok_or(BrokerError::UnknownRegion)?;
    if record.owner != owner {
        return Err(BrokerError::NotOwner.into());
    }
    ctx.ledger.remove(&key);
    record.owner = holder.sovereign_account();
    ctx.ledger.insert(
        StorageKey::ReservedRegion(region_id),
        StorageValue::RegionRecord(record),
    );
    ctx.deposit_event(RuntimeEvent::RegionReserved { region_id, holder });
    Ok(())
}

/// Take a reserved region out of custody on behalf of `holder`.
pub fn take_reserved(
    ctx: &mut Context,
    region_id: RegionId,
    holder: Location,
) -> Result<RegionRecord, DispatchError> {
    let key = StorageKey::ReservedRegion(region_id);
    let record = record(&ctx.ledger, &key).ok_or(BrokerError::UnknownRegion)?;
    if record.owner != holder.sovereign_account() {
        return Err(BrokerError::NotOwner.into());
    }
    ctx.ledger.remove(&key);
    Ok(record)
}

/// Re-instate a region as owned by a local account.
pub fn release(ctx: &mut Context, region_id: RegionId, mut record: RegionRecord, owner: AccountId) {
    record.owner = owner;
    ctx.ledger.insert(
        StorageKey::BrokerRegion(region_id),
        StorageValue::RegionRecord(record),
    );
    ctx.deposit_event(RuntimeEvent::RegionReleased { region_id, owner });
}

/// Consume a region into the workplan for `task`.
///
/// The caller must own the region, either directly or, for a remote origin,
/// through the custody held for it.
pub fn assign(
    ctx: &mut Context,
    origin: &Origin,
    region_id: RegionId,
    task: ParaId,
) -> Result<(), DispatchError> {
    let account = origin.account()?;
    let key = [
        StorageKey::BrokerRegion(region_id),
        StorageKey::ReservedRegion(region_id),
    ]
    .into_iter()
    .find(|key| ctx.ledger.contains(key))
    .ok_or(BrokerError::UnknownRegion)?;
    let record = record(&ctx.ledger, &key).ok_or(BrokerError::UnknownRegion)?;
    if record.owner != account {
        return Err(BrokerError::NotOwner.into());
    }
    ctx.ledger.remove(&key);

    let workplan_key = StorageKey::Workplan {
        begin: region_id.begin,
        core: region_id.core,
    };
    let mut items = ctx
        .ledger
        .get(&workplan_key)
        .and_then(StorageValue::as_workplan)
        .map(<[ScheduleItem]>::to_vec)
        .unwrap_or_default();
    items.push(ScheduleItem {
        mask: region_id.mask,
        assignment: CoreAssignment::Task(task),
    });
    ctx.ledger.insert(workplan_key, StorageValue::Workplan(items));

    debug!(%region_id, %task, "Region assigned");
    ctx.deposit_event(RuntimeEvent::Assigned { region_id, task });
    Ok(())
}

pub(crate) fn dispatch(
    ctx: &mut Context,
    origin: Origin,
    call: BrokerCall,
) -> Result<(), DispatchError> {
    match call {
        BrokerCall::StartSales {
            price,
            cores,
            region_begin,
            region_length,
        } => {
            origin.ensure_root()?;
            start_sales(ctx, price, cores, region_begin, region_length)
        }
        BrokerCall::Purchase { price_limit } => {
            let who = origin.ensure_signed()?;
            purchase(ctx, who, price_limit).map(|_| ())
        }
        BrokerCall::Transfer {
            region_id,
            new_owner,
        } => {
            let who = origin.ensure_signed()?;
            transfer(ctx, who, region_id, new_owner)
        }
        BrokerCall::Assign { region_id, task } => assign(ctx, &origin, region_id, task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChainConfig;
    use std::time::Duration;
    use xregion_types::{BlockHeight, REGIONX_PARA_ID};

    fn setup(config: &ChainConfig, buyer: AccountId) -> Context<'_> {
        let mut ctx = Context::new(config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        fungibles::deposit(&mut ctx, None, buyer, 1_000).unwrap();
        start_sales(&mut ctx, 100, 2, 34, 10).unwrap();
        ctx
    }

    #[test]
    fn test_purchase_issues_sequential_cores() {
        let config = ChainConfig::coretime();
        let alice = AccountId::from_seed("//Alice");
        let mut ctx = setup(&config, alice);

        let first = purchase(&mut ctx, alice, 100).unwrap();
        let second = purchase(&mut ctx, alice, 100).unwrap();
        assert_eq!((first.core, second.core), (0, 1));
        assert_eq!(first.begin, 34);
        assert_eq!(
            purchase(&mut ctx, alice, 100),
            Err(BrokerError::SoldOut.into())
        );

        let record = record(&ctx.ledger, &StorageKey::BrokerRegion(first)).unwrap();
        assert_eq!(record.end, 44);
        assert_eq!(record.owner, alice);
        assert_eq!(record.paid, Some(100));
        assert_eq!(fungibles::balance(&ctx.ledger, None, &alice), 800);
    }

    #[test]
    fn test_purchase_respects_price_limit() {
        let config = ChainConfig::coretime();
        let alice = AccountId::from_seed("//Alice");
        let mut ctx = setup(&config, alice);
        assert_eq!(
            purchase(&mut ctx, alice, 99),
            Err(BrokerError::Overpriced.into())
        );
    }

    #[test]
    fn test_reserve_and_take_back() {
        let config = ChainConfig::coretime();
        let alice = AccountId::from_seed("//Alice");
        let mut ctx = setup(&config, alice);
        let region_id = purchase(&mut ctx, alice, 100).unwrap();
        let holder = Location::Para(REGIONX_PARA_ID);

        let bob = AccountId::from_seed("//Bob");
        assert_eq!(
            reserve(&mut ctx, region_id, bob, holder),
            Err(BrokerError::NotOwner.into())
        );
        reserve(&mut ctx, region_id, alice, holder).unwrap();
        assert!(!ctx.ledger.contains(&StorageKey::BrokerRegion(region_id)));

        assert_eq!(
            take_reserved(&mut ctx, region_id, Location::Relay),
            Err(BrokerError::NotOwner.into())
        );
        let taken = take_reserved(&mut ctx, region_id, holder).unwrap();
        release(&mut ctx, region_id, taken, bob);
        let released = record(&ctx.ledger, &StorageKey::BrokerRegion(region_id)).unwrap();
        assert_eq!(released.owner, bob);
        assert_eq!(released.end, 44, "record fields survive the round trip");
    }

    #[test]
    fn test_remote_assign_consumes_reserve() {
        let config = ChainConfig::coretime();
        let alice = AccountId::from_seed("//Alice");
        let mut ctx = setup(&config, alice);
        let region_id = purchase(&mut ctx, alice, 100).unwrap();
        let holder = Location::Para(REGIONX_PARA_ID);
        reserve(&mut ctx, region_id, alice, holder).unwrap();

        assert_eq!(
            assign(&mut ctx, &Origin::Signed(alice), region_id, ParaId(2004)),
            Err(BrokerError::NotOwner.into())
        );
        assign(&mut ctx, &Origin::Xcm(holder), region_id, ParaId(2004)).unwrap();

        assert!(!ctx.ledger.contains(&StorageKey::ReservedRegion(region_id)));
        let items = ctx
            .ledger
            .get(&StorageKey::Workplan {
                begin: region_id.begin,
                core: region_id.core,
            })
            .and_then(StorageValue::as_workplan)
            .unwrap()
            .to_vec();
        assert_eq!(
            items,
            vec![ScheduleItem {
                mask: CoreMask::complete(),
                assignment: CoreAssignment::Task(ParaId(2004)),
            }]
        );
    }
}

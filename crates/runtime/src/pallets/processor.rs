//! Order fulfillment: consumes an available region, pays the seller from
//! escrow and asks the coretime chain to assign the region.

use crate::pallets::{fungibles, orders, regions};
use crate::{Context, Origin};
use tracing::info;
use xregion_messages::{BrokerCall, Call, Instruction, MultiAsset, ProcessorCall, Xcm};
use xregion_types::{
    check_requirements, AccountId, DispatchError, Location, OrderId, ParaId, ProcessorError,
    RegionId, RuntimeEvent, StorageKey, StorageValue,
};

/// Parachain a fulfilled region was assigned to.
pub fn assignment(ctx: &Context, region_id: &RegionId) -> Option<ParaId> {
    match ctx.ledger.get(&StorageKey::RegionAssignment(*region_id)) {
        Some(StorageValue::Para(para)) => Some(*para),
        _ => None,
    }
}

/// Program asking the coretime chain to assign `region_id` to `task`,
/// paid from this chain's sovereign account there.
pub fn assignment_message(ctx: &Context, region_id: RegionId, task: ParaId) -> Xcm {
    let fee = MultiAsset::relay_token(ctx.config.assignment_fee);
    Xcm(vec![
        Instruction::WithdrawAsset(vec![fee]),
        Instruction::BuyExecution { fees: fee },
        Instruction::Transact {
            call: Call::Broker(BrokerCall::Assign { region_id, task }),
        },
        Instruction::RefundSurplus,
        Instruction::DepositAsset {
            beneficiary: ctx.here().sovereign_account(),
        },
    ])
}

fn send_assignment(ctx: &mut Context, region_id: RegionId, task: ParaId) {
    let message = assignment_message(ctx, region_id, task);
    let coretime = Location::Para(ctx.config.coretime_para);
    ctx.send_xcm(coretime, message);
}

/// Fulfill `order_id` with `region_id`, owned by `seller`.
///
/// The region is removed and the assignment sent in the same transition, so
/// a region can fulfill at most one order.
pub fn fulfill_order(
    ctx: &mut Context,
    seller: AccountId,
    order_id: OrderId,
    region_id: RegionId,
) -> Result<(), DispatchError> {
    let region = regions::region(&ctx.ledger, &region_id).ok_or(ProcessorError::UnknownRegion)?;
    let record = region
        .state
        .record()
        .cloned()
        .ok_or(ProcessorError::RecordUnavailable)?;
    if region.owner != seller {
        return Err(ProcessorError::NotOwner.into());
    }
    let order = orders::order(&ctx.ledger, order_id).ok_or(ProcessorError::UnknownOrder)?;
    check_requirements(&region_id, &record, &order.requirements)
        .map_err(ProcessorError::Requirements)?;

    ctx.ledger.remove(&StorageKey::Region(region_id));
    ctx.ledger.insert(
        StorageKey::RegionAssignment(region_id),
        StorageValue::Para(order.para_id),
    );
    send_assignment(ctx, region_id, order.para_id);

    let escrow = AccountId::order_escrow(order_id);
    let total = orders::total_contribution(&ctx.ledger, order_id);
    if total > 0 {
        let currency = ctx.config.relay_token;
        fungibles::transfer(ctx, currency, escrow, seller, total)?;
    }
    orders::remove_order(ctx, order_id);

    info!(order_id = order_id.0, %region_id, %seller, paid = total, "Order fulfilled");
    ctx.deposit_event(RuntimeEvent::OrderProcessed {
        order_id,
        region_id,
        seller,
    });
    ctx.deposit_event(RuntimeEvent::RegionAssigned {
        region_id,
        para_id: order.para_id,
    });
    Ok(())
}

/// Send the assignment of an already fulfilled region again.
pub fn reassign(ctx: &mut Context, region_id: RegionId) -> Result<(), DispatchError> {
    let para_id = assignment(ctx, &region_id).ok_or(ProcessorError::UnknownAssignment)?;
    send_assignment(ctx, region_id, para_id);
    ctx.deposit_event(RuntimeEvent::RegionAssigned { region_id, para_id });
    Ok(())
}

pub(crate) fn dispatch(
    ctx: &mut Context,
    origin: Origin,
    call: ProcessorCall,
) -> Result<(), DispatchError> {
    let who = origin.ensure_signed()?;
    match call {
        ProcessorCall::FulfillOrder {
            order_id,
            region_id,
        } => fulfill_order(ctx, who, order_id, region_id),
        ProcessorCall::Assign { region_id } => reassign(ctx, region_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChainConfig, Ledger};
    use std::time::Duration;
    use xregion_types::{
        AssetMetadata, BlockHeight, CoreMask, RegionRecord, Requirements, RELAY_ASSET_ID,
    };

    fn region_with(mask: CoreMask) -> RegionId {
        RegionId {
            begin: 34,
            core: 0,
            mask,
        }
    }

    fn requirements() -> Requirements {
        Requirements {
            begin: 40,
            end: 44,
            core_occupancy: 57_600,
        }
    }

    /// A context hosting an available region owned by `seller`.
    fn hosted(config: &ChainConfig, seller: AccountId, region_id: RegionId) -> Context<'_> {
        let mut ctx = Context::new(config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        ctx.ledger.insert(
            StorageKey::AssetMetadata(RELAY_ASSET_ID),
            StorageValue::AssetMetadata(AssetMetadata::relay_token()),
        );
        let commitment = regions::mint_into(&mut ctx, region_id, seller, BlockHeight(3)).unwrap();
        regions::on_response(
            &mut ctx,
            commitment,
            vec![(
                StorageKey::ReservedRegion(region_id),
                StorageValue::RegionRecord(RegionRecord {
                    end: 44,
                    owner: Location::Para(xregion_types::REGIONX_PARA_ID).sovereign_account(),
                    paid: Some(100),
                }),
            )],
        )
        .unwrap();
        ctx
    }

    #[test]
    fn test_fulfill_consumes_region_and_pays_seller() {
        let config = ChainConfig::regionx();
        let seller = AccountId::from_seed("//Alice");
        let funder = AccountId::from_seed("//Bob");
        let region_id = region_with(CoreMask::complete());
        let mut ctx = hosted(&config, seller, region_id);
        fungibles::deposit(&mut ctx, Some(RELAY_ASSET_ID), funder, 50_000).unwrap();
        let order_id =
            orders::create_order(&mut ctx, funder, ParaId(2004), requirements()).unwrap();
        orders::contribute(&mut ctx, funder, order_id, 30_000).unwrap();

        fulfill_order(&mut ctx, seller, order_id, region_id).unwrap();

        assert!(regions::region(&ctx.ledger, &region_id).is_none());
        assert_eq!(assignment(&ctx, &region_id), Some(ParaId(2004)));
        assert_eq!(orders::order(&ctx.ledger, order_id), None);
        assert_eq!(
            fungibles::balance(&ctx.ledger, Some(RELAY_ASSET_ID), &seller),
            30_000
        );

        let err = fulfill_order(&mut ctx, seller, order_id, region_id).unwrap_err();
        assert!(err.is_region_not_available(), "second fulfillment must fail");

        let (_, outbox) = ctx.finish();
        assert_eq!(outbox.len(), 1, "exactly one assignment message");
        assert_eq!(outbox[0].0, Location::Para(config.coretime_para));
    }

    #[test]
    fn test_fulfill_checks_requirements() {
        let config = ChainConfig::regionx();
        let seller = AccountId::from_seed("//Alice");
        let region_id = region_with(CoreMask::from_chunk(0, 40));
        let mut ctx = hosted(&config, seller, region_id);
        let order_id =
            orders::create_order(&mut ctx, seller, ParaId(2004), requirements()).unwrap();

        let err = fulfill_order(&mut ctx, seller, order_id, region_id).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Processor(ProcessorError::Requirements(_))
        ));
        assert!(regions::region(&ctx.ledger, &region_id).is_some());
    }

    #[test]
    fn test_fulfill_requires_available_record() {
        let config = ChainConfig::regionx();
        let seller = AccountId::from_seed("//Alice");
        let region_id = region_with(CoreMask::complete());
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        regions::mint_into(&mut ctx, region_id, seller, BlockHeight(3)).unwrap();
        let order_id =
            orders::create_order(&mut ctx, seller, ParaId(2004), requirements()).unwrap();

        assert_eq!(
            fulfill_order(&mut ctx, seller, order_id, region_id),
            Err(ProcessorError::RecordUnavailable.into())
        );
        assert_eq!(
            fulfill_order(&mut ctx, seller, OrderId(7), region_with(CoreMask::void())),
            Err(ProcessorError::UnknownRegion.into())
        );
    }

    #[test]
    fn test_reassign_requires_prior_fulfillment() {
        let config = ChainConfig::regionx();
        let region_id = region_with(CoreMask::complete());
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        assert_eq!(
            reassign(&mut ctx, region_id),
            Err(ProcessorError::UnknownAssignment.into())
        );
    }
}

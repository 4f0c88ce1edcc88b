//! Coretime orders and their crowd-funded escrow.

use crate::pallets::fungibles;
use crate::{Context, Ledger, Origin};
use tracing::debug;
use xregion_messages::OrdersCall;
use xregion_types::{
    AccountId, Balance, DispatchError, Order, OrderId, OrdersError, ParaId, Requirements,
    RuntimeEvent, StorageKey, StoragePrefix, StorageValue,
};

/// Order by id.
pub fn order(ledger: &Ledger, order_id: OrderId) -> Option<Order> {
    ledger
        .get(&StorageKey::Order(order_id))
        .and_then(StorageValue::as_order)
        .cloned()
}

/// Id the next order will receive.
pub fn next_order_id(ledger: &Ledger) -> OrderId {
    match ledger.get(&StorageKey::NextOrderId) {
        Some(StorageValue::OrderId(id)) => *id,
        _ => OrderId(0),
    }
}

/// Amount `who` has contributed to `order_id`.
pub fn contribution(ledger: &Ledger, order_id: OrderId, who: AccountId) -> Balance {
    ledger
        .get(&StorageKey::Contribution {
            order: order_id,
            who,
        })
        .and_then(StorageValue::as_balance)
        .unwrap_or(0)
}

/// Total contributed to `order_id`.
pub fn total_contribution(ledger: &Ledger, order_id: OrderId) -> Balance {
    ledger
        .get(&StorageKey::TotalContribution(order_id))
        .and_then(StorageValue::as_balance)
        .unwrap_or(0)
}

/// Store a new order under the next id. Fails without touching the ledger
/// once the id space is exhausted.
pub fn create_order(
    ctx: &mut Context,
    creator: AccountId,
    para_id: ParaId,
    requirements: Requirements,
) -> Result<OrderId, DispatchError> {
    let order_id = next_order_id(&ctx.ledger);
    let following = order_id.next().ok_or(OrdersError::OrderIdOverflow)?;
    ctx.ledger.insert(
        StorageKey::Order(order_id),
        StorageValue::Order(Order {
            creator,
            para_id,
            requirements,
        }),
    );
    ctx.ledger.insert(
        StorageKey::NextOrderId,
        StorageValue::OrderId(following),
    );
    debug!(order_id = order_id.0, %para_id, "Order created");
    ctx.deposit_event(RuntimeEvent::OrderCreated { order_id });
    Ok(order_id)
}

/// Move `amount` of relay token from `who` into the order's escrow.
pub fn contribute(
    ctx: &mut Context,
    who: AccountId,
    order_id: OrderId,
    amount: Balance,
) -> Result<(), DispatchError> {
    let order = order(&ctx.ledger, order_id).ok_or(OrdersError::UnknownOrder)?;
    if ctx.current_timeslice() >= order.requirements.end {
        return Err(OrdersError::OrderExpired.into());
    }
    if amount < ctx.config.minimum_contribution {
        return Err(OrdersError::InvalidAmount.into());
    }

    let currency = ctx.config.relay_token;
    fungibles::transfer(ctx, currency, who, AccountId::order_escrow(order_id), amount)?;

    let contributed = contribution(&ctx.ledger, order_id, who)
        .checked_add(amount)
        .ok_or(DispatchError::Overflow)?;
    let total = total_contribution(&ctx.ledger, order_id)
        .checked_add(amount)
        .ok_or(DispatchError::Overflow)?;
    ctx.ledger.insert(
        StorageKey::Contribution {
            order: order_id,
            who,
        },
        StorageValue::Balance(contributed),
    );
    ctx.ledger.insert(
        StorageKey::TotalContribution(order_id),
        StorageValue::Balance(total),
    );
    ctx.deposit_event(RuntimeEvent::Contributed {
        order_id,
        who,
        amount,
    });
    Ok(())
}

/// Delete an order with its contribution bookkeeping.
pub fn remove_order(ctx: &mut Context, order_id: OrderId) {
    let contributors: Vec<StorageKey> = ctx
        .ledger
        .iter_prefix(StoragePrefix::Contributions)
        .filter(|(key, _)| {
            matches!(key, StorageKey::Contribution { order, .. } if *order == order_id)
        })
        .map(|(key, _)| key.clone())
        .collect();
    for key in contributors {
        ctx.ledger.remove(&key);
    }
    ctx.ledger.remove(&StorageKey::TotalContribution(order_id));
    ctx.ledger.remove(&StorageKey::Order(order_id));
}

pub(crate) fn dispatch(
    ctx: &mut Context,
    origin: Origin,
    call: OrdersCall,
) -> Result<(), DispatchError> {
    let who = origin.ensure_signed()?;
    match call {
        OrdersCall::CreateOrder {
            para_id,
            requirements,
        } => create_order(ctx, who, para_id, requirements).map(|_| ()),
        OrdersCall::Contribute { order_id, amount } => contribute(ctx, who, order_id, amount),
    }
}

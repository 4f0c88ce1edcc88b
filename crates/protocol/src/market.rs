//! Coretime orders on the market chain.
//!
//! Anyone creates an order for a parachain; contributors fund its escrow
//! in relay token. A seller holding an `Available` region that meets the
//! requirements fulfills it: in one block the region is consumed, the
//! escrow paid out and the assignment sent to the scheduling chain.

use crate::{
    read_finalized, ChainApi, Chains, Included, ProtocolConfig, ProtocolError, Reconciler,
    RegionCustody, TransactionSubmitter,
};
use std::sync::Arc;
use tracing::{debug, info};
use xregion_messages::{Call, OrdersCall, ProcessorCall};
use xregion_types::{
    check_requirements, AccountId, Balance, BlockRef, CoreAssignment, Order, OrderId, ParaId,
    RegionId, Requirements, RuntimeEvent, ScheduleItem, StorageKey, StoragePrefix, StorageValue,
};

/// Result of a fulfilled order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fulfillment {
    pub order_id: OrderId,
    pub region_id: RegionId,
    pub para_id: ParaId,
    /// Escrow paid to the seller.
    pub payout: Balance,
    pub block: BlockRef,
}

pub struct OrderMarket {
    custody: Arc<RegionCustody>,
    chains: Chains,
    config: ProtocolConfig,
    submitter: TransactionSubmitter,
    reconciler: Reconciler,
}

impl OrderMarket {
    pub fn new(custody: Arc<RegionCustody>, chains: Chains) -> Self {
        let config = custody.config().clone();
        let reconciler = Reconciler::new(config.settle_within_blocks);
        Self {
            custody,
            chains,
            config,
            submitter: TransactionSubmitter::new(),
            reconciler,
        }
    }

    fn market(&self) -> Result<Arc<dyn ChainApi>, ProtocolError> {
        let location = self.config.market_chain;
        self.chains
            .get(location)
            .ok_or(ProtocolError::UnknownChain(location))
    }

    fn scheduler(&self) -> Result<Arc<dyn ChainApi>, ProtocolError> {
        let location = self.config.scheduling_chain;
        self.chains
            .get(location)
            .ok_or(ProtocolError::UnknownChain(location))
    }

    async fn execute(&self, signer: AccountId, call: Call) -> Result<Included, ProtocolError> {
        let api = self.market()?;
        self.submitter
            .execute(api.as_ref(), signer, call, self.config.submit_options)
            .await
    }

    /// Create an order. Orders are immutable once created.
    pub async fn create_order(
        &self,
        creator: AccountId,
        para_id: ParaId,
        requirements: Requirements,
    ) -> Result<OrderId, ProtocolError> {
        let included = self
            .execute(
                creator,
                Call::Orders(OrdersCall::CreateOrder {
                    para_id,
                    requirements,
                }),
            )
            .await?;
        let order_id = included
            .find_event(|event| match event {
                RuntimeEvent::OrderCreated { order_id } => Some(*order_id),
                _ => None,
            })
            .ok_or(ProtocolError::MissingEvent("OrderCreated"))?;
        info!(
            order_id = order_id.0,
            %para_id,
            begin = requirements.begin,
            end = requirements.end,
            occupancy = requirements.core_occupancy,
            "Order created"
        );
        Ok(order_id)
    }

    /// Add `amount` of relay token to the order's escrow. Returns what
    /// `contributor` has contributed in total.
    pub async fn contribute(
        &self,
        order_id: OrderId,
        contributor: AccountId,
        amount: Balance,
    ) -> Result<Balance, ProtocolError> {
        let api = self.market()?;
        if api.storage(&StorageKey::Order(order_id), None).await?.is_none() {
            return Err(ProtocolError::UnknownOrder);
        }
        let included = self
            .execute(
                contributor,
                Call::Orders(OrdersCall::Contribute { order_id, amount }),
            )
            .await?;
        included
            .find_event(|event| match event {
                RuntimeEvent::Contributed { order_id: id, who, .. }
                    if *id == order_id && *who == contributor =>
                {
                    Some(())
                }
                _ => None,
            })
            .ok_or(ProtocolError::MissingEvent("Contributed"))?;
        // The event carries the increment; the running total lives in storage.
        let total = api
            .storage(
                &StorageKey::Contribution {
                    order: order_id,
                    who: contributor,
                },
                Some(included.block.hash),
            )
            .await?
            .as_ref()
            .and_then(StorageValue::as_balance)
            .ok_or(ProtocolError::MissingEvent("Contributed"))?;
        debug!(order_id = order_id.0, %contributor, amount, total, "Contributed");
        Ok(total)
    }

    /// Fulfill an order with a region the seller holds on the market chain.
    ///
    /// The region must be `Available` and satisfy the order's requirements;
    /// both are checked before submission and again by the chain.
    pub async fn fulfill_order(
        &self,
        order_id: OrderId,
        region_id: RegionId,
        seller: AccountId,
    ) -> Result<Fulfillment, ProtocolError> {
        let region = self
            .custody
            .region(self.config.market_chain, region_id)
            .await?
            .ok_or(ProtocolError::RegionNotAvailable)?;
        let record = region
            .state
            .record()
            .cloned()
            .ok_or(ProtocolError::RegionNotAvailable)?;
        let order = self
            .order_at_best(order_id)
            .await?
            .ok_or(ProtocolError::UnknownOrder)?;
        check_requirements(&region_id, &record, &order.requirements)
            .map_err(ProtocolError::RequirementsMismatch)?;

        let included = self
            .execute(
                seller,
                Call::Processor(ProcessorCall::FulfillOrder {
                    order_id,
                    region_id,
                }),
            )
            .await?;
        included
            .find_event(|event| match event {
                RuntimeEvent::OrderProcessed { order_id: id, .. } if *id == order_id => Some(()),
                _ => None,
            })
            .ok_or(ProtocolError::MissingEvent("OrderProcessed"))?;
        let escrow = AccountId::order_escrow(order_id);
        let payout = included
            .find_event(|event| match event {
                RuntimeEvent::Transfer {
                    from, to, amount, ..
                } if *from == escrow && *to == seller => Some(*amount),
                _ => None,
            })
            .unwrap_or(0);
        self.custody.forget(&region_id);

        info!(
            order_id = order_id.0,
            %region_id,
            %seller,
            payout,
            block = %included.block,
            "Order fulfilled"
        );
        Ok(Fulfillment {
            order_id,
            region_id,
            para_id: order.para_id,
            payout,
            block: included.block,
        })
    }

    /// Wait until the scheduling chain's workplan assigns the region to
    /// `para_id`.
    pub async fn await_assignment(
        &self,
        region_id: RegionId,
        para_id: ParaId,
    ) -> Result<ScheduleItem, ProtocolError> {
        let api = self.scheduler()?;
        let expected = ScheduleItem {
            mask: region_id.mask,
            assignment: CoreAssignment::Task(para_id),
        };
        self.reconciler
            .wait_for_storage(
                &api,
                "workplan assignment",
                StorageKey::Workplan {
                    begin: region_id.begin,
                    core: region_id.core,
                },
                |value| {
                    value
                        .as_ref()
                        .and_then(StorageValue::as_workplan)
                        .and_then(|items| items.iter().find(|item| **item == expected).copied())
                },
            )
            .await
    }

    /// Send the assignment of an already fulfilled region again.
    pub async fn reassign(
        &self,
        region_id: RegionId,
        caller: AccountId,
    ) -> Result<Included, ProtocolError> {
        self.execute(caller, Call::Processor(ProcessorCall::Assign { region_id }))
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════════

    async fn order_at_best(&self, order_id: OrderId) -> Result<Option<Order>, ProtocolError> {
        let api = self.market()?;
        Ok(api
            .storage(&StorageKey::Order(order_id), None)
            .await?
            .as_ref()
            .and_then(StorageValue::as_order)
            .cloned())
    }

    pub async fn order(&self, order_id: OrderId) -> Result<Option<Order>, ProtocolError> {
        let api = self.market()?;
        Ok(read_finalized(api.as_ref(), &StorageKey::Order(order_id))
            .await?
            .as_ref()
            .and_then(StorageValue::as_order)
            .cloned())
    }

    /// Every open order, by id.
    pub async fn orders(&self) -> Result<Vec<(OrderId, Order)>, ProtocolError> {
        let api = self.market()?;
        let head = api.finalized_head().await?;
        Ok(api
            .storage_iter(StoragePrefix::Orders, Some(head.hash))
            .await?
            .into_iter()
            .filter_map(|(key, value)| match (key, value) {
                (StorageKey::Order(id), StorageValue::Order(order)) => Some((id, order)),
                _ => None,
            })
            .collect())
    }

    pub async fn contribution(
        &self,
        order_id: OrderId,
        who: AccountId,
    ) -> Result<Balance, ProtocolError> {
        let api = self.market()?;
        let key = StorageKey::Contribution {
            order: order_id,
            who,
        };
        Ok(read_finalized(api.as_ref(), &key)
            .await?
            .as_ref()
            .and_then(StorageValue::as_balance)
            .unwrap_or(0))
    }

    /// Every contributor to an order and what they put in.
    pub async fn contributions(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<(AccountId, Balance)>, ProtocolError> {
        let api = self.market()?;
        let head = api.finalized_head().await?;
        Ok(api
            .storage_iter(StoragePrefix::Contributions, Some(head.hash))
            .await?
            .into_iter()
            .filter_map(|(key, value)| match (key, value) {
                (StorageKey::Contribution { order, who }, StorageValue::Balance(amount))
                    if order == order_id =>
                {
                    Some((who, amount))
                }
                _ => None,
            })
            .collect())
    }

    pub async fn total_contribution(&self, order_id: OrderId) -> Result<Balance, ProtocolError> {
        let api = self.market()?;
        Ok(
            read_finalized(api.as_ref(), &StorageKey::TotalContribution(order_id))
                .await?
                .as_ref()
                .and_then(StorageValue::as_balance)
                .unwrap_or(0),
        )
    }
}

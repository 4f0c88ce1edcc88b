//! Dispatchable calls, grouped by the pallet that handles them.

use crate::{Datagram, MultiAsset};
use serde::{Deserialize, Serialize};
use xregion_types::{
    AccountId, AssetId, AssetMetadata, Balance, ExchangeRate, Location, OrderId, ParaId, RegionId,
    Requirements, Timeslice,
};

/// A call understood by some chain in the network.
///
/// Chains reject calls for pallets they do not run with
/// `DispatchError::CallUnavailable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    System(SystemCall),
    Balances(BalancesCall),
    Tokens(TokensCall),
    AssetRegistry(AssetRegistryCall),
    AssetRate(AssetRateCall),
    Broker(BrokerCall),
    Regions(RegionsCall),
    Orders(OrdersCall),
    Processor(ProcessorCall),
    Ismp(IsmpCall),
    Xcm(XcmCall),
    Sudo(SudoCall),
    Utility(UtilityCall),
}

impl Call {
    /// `pallet.call` name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Call::System(SystemCall::Remark { .. }) => "system.remark",
            Call::Balances(BalancesCall::TransferKeepAlive { .. }) => {
                "balances.transfer_keep_alive"
            }
            Call::Balances(BalancesCall::ForceSetBalance { .. }) => "balances.force_set_balance",
            Call::Tokens(TokensCall::Transfer { .. }) => "tokens.transfer",
            Call::Tokens(TokensCall::SetBalance { .. }) => "tokens.set_balance",
            Call::AssetRegistry(AssetRegistryCall::RegisterAsset { .. }) => {
                "asset_registry.register_asset"
            }
            Call::AssetRate(AssetRateCall::Create { .. }) => "asset_rate.create",
            Call::AssetRate(AssetRateCall::Update { .. }) => "asset_rate.update",
            Call::Broker(BrokerCall::StartSales { .. }) => "broker.start_sales",
            Call::Broker(BrokerCall::Purchase { .. }) => "broker.purchase",
            Call::Broker(BrokerCall::Transfer { .. }) => "broker.transfer",
            Call::Broker(BrokerCall::Assign { .. }) => "broker.assign",
            Call::Regions(RegionsCall::Transfer { .. }) => "regions.transfer",
            Call::Regions(RegionsCall::RequestRegionRecord { .. }) => {
                "regions.request_region_record"
            }
            Call::Orders(OrdersCall::CreateOrder { .. }) => "orders.create_order",
            Call::Orders(OrdersCall::Contribute { .. }) => "orders.contribute",
            Call::Processor(ProcessorCall::FulfillOrder { .. }) => "processor.fulfill_order",
            Call::Processor(ProcessorCall::Assign { .. }) => "processor.assign",
            Call::Ismp(IsmpCall::HandleUnsigned { .. }) => "ismp.handle_unsigned",
            Call::Ismp(IsmpCall::AddParachain { .. }) => "ismp.add_parachain",
            Call::Xcm(XcmCall::TeleportAssets { .. }) => "xcm.limited_teleport_assets",
            Call::Xcm(XcmCall::ReserveTransferAssets { .. }) => {
                "xcm.limited_reserve_transfer_assets"
            }
            Call::Sudo(SudoCall::Sudo { .. }) => "sudo.sudo",
            Call::Utility(UtilityCall::BatchAll { .. }) => "utility.batch_all",
        }
    }

    /// Wrap in a superuser call.
    pub fn sudo(self) -> Call {
        Call::Sudo(SudoCall::Sudo {
            call: Box::new(self),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemCall {
    /// Do nothing but record an event.
    Remark { remark: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalancesCall {
    TransferKeepAlive { dest: AccountId, value: Balance },
    /// Privileged.
    ForceSetBalance { who: AccountId, new_free: Balance },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokensCall {
    Transfer { dest: AccountId, asset: AssetId, amount: Balance },
    /// Privileged.
    SetBalance { who: AccountId, asset: AssetId, free: Balance },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetRegistryCall {
    /// Privileged. Fails if the id is taken.
    RegisterAsset { metadata: AssetMetadata, asset_id: AssetId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetRateCall {
    /// Privileged. Fails if a rate exists.
    Create { asset: AssetId, rate: ExchangeRate },
    /// Privileged. Fails if no rate exists.
    Update { asset: AssetId, rate: ExchangeRate },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokerCall {
    /// Privileged. Open a sale of `cores` regions.
    StartSales {
        price: Balance,
        cores: u16,
        region_begin: Timeslice,
        region_length: Timeslice,
    },
    Purchase { price_limit: Balance },
    Transfer { region_id: RegionId, new_owner: AccountId },
    Assign { region_id: RegionId, task: ParaId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionsCall {
    Transfer { region_id: RegionId, new_owner: AccountId },
    /// Re-request the record of a region whose previous request expired.
    RequestRegionRecord { region_id: RegionId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrdersCall {
    CreateOrder { para_id: ParaId, requirements: Requirements },
    Contribute { order_id: OrderId, amount: Balance },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorCall {
    FulfillOrder { order_id: OrderId, region_id: RegionId },
    /// Re-send the assignment message for an already fulfilled region.
    Assign { region_id: RegionId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsmpCall {
    /// Unsigned. Deliver responses to outstanding requests.
    HandleUnsigned { messages: Vec<Datagram> },
    /// Privileged. Start tracking state roots of these chains.
    AddParachain { para_ids: Vec<ParaId> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum XcmCall {
    TeleportAssets {
        dest: Location,
        beneficiary: AccountId,
        assets: Vec<MultiAsset>,
    },
    /// Either the sender or the destination must be the reserve of each asset.
    ReserveTransferAssets {
        dest: Location,
        beneficiary: AccountId,
        assets: Vec<MultiAsset>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SudoCall {
    Sudo { call: Box<Call> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UtilityCall {
    /// Dispatch all calls atomically; the first failure reverts the batch.
    BatchAll { calls: Vec<Call> },
}

//! A simulated network with the protocol wired over it.

use crate::{Simulation, SimulationConfig, SimulationError};
use std::sync::Arc;
use tracing::info;
use xregion_messages::{BrokerCall, Call};
use xregion_protocol::{
    AssetBridge, ChainApi, Chains, Included, OrderMarket, ProtocolConfig, ProtocolError,
    RegionCustody, TransactionSubmitter,
};
use xregion_types::{
    AccountId, Balance, Location, RegionId, RegionRecord, RuntimeEvent, Timeslice,
    CORETIME_PARA_ID, REGIONX_PARA_ID,
};

pub const RELAY: Location = Location::Relay;
pub const CORETIME: Location = Location::Para(CORETIME_PARA_ID);
pub const REGIONX: Location = Location::Para(REGIONX_PARA_ID);

/// Protocol components sharing one set of chain clients.
pub struct Scenario {
    pub simulation: Simulation,
    pub chains: Chains,
    pub config: ProtocolConfig,
    pub bridge: AssetBridge,
    pub custody: Arc<RegionCustody>,
    pub market: OrderMarket,
    submitter: TransactionSubmitter,
}

impl Scenario {
    pub fn start(
        simulation: SimulationConfig,
        config: ProtocolConfig,
    ) -> Result<Self, SimulationError> {
        let simulation = Simulation::start(simulation)?;
        let chains = simulation.chains();
        let custody = Arc::new(RegionCustody::new(chains.clone(), config.clone()));
        Ok(Self {
            bridge: AssetBridge::new(chains.clone(), config.clone()),
            market: OrderMarket::new(custody.clone(), chains.clone()),
            custody,
            chains,
            config,
            simulation,
            submitter: TransactionSubmitter::new(),
        })
    }

    /// The standard three-chain network with default protocol settings.
    pub fn standard() -> Result<Self, SimulationError> {
        Self::start(SimulationConfig::standard(), ProtocolConfig::default())
    }

    pub fn chain(&self, location: Location) -> Result<Arc<dyn ChainApi>, ProtocolError> {
        self.chains
            .get(location)
            .ok_or(ProtocolError::UnknownChain(location))
    }

    /// Open a coretime sale as sudo.
    pub async fn start_sales(
        &self,
        price: Balance,
        cores: u16,
        region_begin: Timeslice,
        region_length: Timeslice,
    ) -> Result<Included, ProtocolError> {
        let coretime = self.chain(CORETIME)?;
        self.submitter
            .execute_sudo(
                coretime.as_ref(),
                self.config.sudo,
                Call::Broker(BrokerCall::StartSales {
                    price,
                    cores,
                    region_begin,
                    region_length,
                }),
            )
            .await
    }

    /// Buy the next core of the open sale.
    pub async fn purchase_region(
        &self,
        buyer: AccountId,
        price_limit: Balance,
    ) -> Result<RegionId, ProtocolError> {
        let coretime = self.chain(CORETIME)?;
        let included = self
            .submitter
            .execute(
                coretime.as_ref(),
                buyer,
                Call::Broker(BrokerCall::Purchase { price_limit }),
                self.config.submit_options,
            )
            .await?;
        let region_id = included
            .find_event(|event| match event {
                RuntimeEvent::Purchased { region_id, .. } => Some(*region_id),
                _ => None,
            })
            .ok_or(ProtocolError::MissingEvent("Purchased"))?;
        info!(%region_id, %buyer, "Region purchased");
        Ok(region_id)
    }

    /// Move a region `owner` holds on the coretime chain to RegionX and
    /// resolve its record there.
    pub async fn move_to_market(
        &self,
        region_id: RegionId,
        owner: AccountId,
    ) -> Result<RegionRecord, ProtocolError> {
        self.custody
            .transfer_resource(region_id, CORETIME, REGIONX, owner, owner)
            .await?;
        self.custody
            .await_settled(region_id, &[CORETIME, REGIONX])
            .await?;
        let commitment = self.custody.request_record(region_id, REGIONX).await?;
        self.custody
            .resolve_record(commitment, CORETIME, REGIONX, self.config.relayer)
            .await
    }
}

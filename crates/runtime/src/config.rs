//! Chain configuration and genesis state.

use std::time::Duration;
use xregion_types::{
    AccountId, AssetId, AssetMetadata, Balance, ExchangeRate, Location, ParaId, Timeslice,
    CORETIME_PARA_ID, REGIONX_PARA_ID, RELAY_ASSET_ID, TIMESLICE_PERIOD,
};

/// Relay chain block time; timeslices are measured in relay blocks.
pub const RELAY_BLOCK_TIME: Duration = Duration::from_secs(6);

/// Which runtime a chain runs. Determines the pallets available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    /// Relay chain: balances and cross-chain transfers.
    Relay,
    /// Coretime chain: adds the broker that issues regions and keeps the workplan.
    Coretime,
    /// RegionX: multi-asset fees, region custody, orders and state-read requests.
    RegionX,
}

/// Pallets a runtime may include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pallet {
    Tokens,
    AssetRegistry,
    AssetRate,
    Broker,
    Regions,
    Orders,
    Processor,
    Ismp,
}

impl ChainKind {
    /// Whether this runtime includes `pallet`.
    pub fn has(&self, pallet: Pallet) -> bool {
        match self {
            ChainKind::Relay => false,
            ChainKind::Coretime => pallet == Pallet::Broker,
            ChainKind::RegionX => pallet != Pallet::Broker,
        }
    }
}

/// Configuration of a single chain.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Human-readable name for logs.
    pub name: String,

    /// Where the chain sits in the network.
    pub location: Location,

    /// Runtime flavour.
    pub kind: ChainKind,

    /// Time between blocks.
    pub block_time: Duration,

    /// Blocks behind the best block that are final.
    pub finality_depth: u64,

    /// Flat transaction fee in native currency.
    pub base_fee: Balance,

    /// Fee charged for executing an inbound cross-chain program, in relay token.
    pub xcm_execution_fee: Balance,

    /// Currency representing the relay token. `None` means the native currency.
    pub relay_token: Option<AssetId>,

    /// Whether signed extrinsics may pay fees in a registered asset.
    pub fee_asset_payment: bool,

    /// Account allowed to dispatch privileged calls.
    pub sudo_key: Option<AccountId>,

    /// Lifetime of outgoing state-read requests. `None` means no expiry.
    pub request_timeout: Option<Duration>,

    /// Trusted state roots kept per tracked chain, counted back from the
    /// latest height. Roots an outstanding request reads at are kept longer.
    pub state_root_retention: u64,

    /// Chain that issues regions.
    pub coretime_para: ParaId,

    /// Smallest accepted order contribution.
    pub minimum_contribution: Balance,

    /// Relay token withdrawn from our sovereign account on the coretime
    /// chain to pay for each assignment.
    pub assignment_fee: Balance,
}

impl ChainConfig {
    /// Relay chain defaults.
    pub fn relay() -> Self {
        Self {
            name: "relay".to_string(),
            location: Location::Relay,
            kind: ChainKind::Relay,
            block_time: RELAY_BLOCK_TIME,
            finality_depth: 2,
            base_fee: 1_000_000,
            xcm_execution_fee: 0,
            relay_token: None,
            fee_asset_payment: false,
            sudo_key: None,
            request_timeout: None,
            state_root_retention: 512,
            coretime_para: CORETIME_PARA_ID,
            minimum_contribution: 0,
            assignment_fee: 0,
        }
    }

    /// Coretime chain defaults.
    pub fn coretime() -> Self {
        Self {
            name: "coretime".to_string(),
            location: Location::Para(CORETIME_PARA_ID),
            kind: ChainKind::Coretime,
            block_time: Duration::from_secs(12),
            finality_depth: 1,
            xcm_execution_fee: 1_000_000,
            ..Self::relay()
        }
    }

    /// RegionX defaults.
    pub fn regionx() -> Self {
        Self {
            name: "regionx".to_string(),
            location: Location::Para(REGIONX_PARA_ID),
            kind: ChainKind::RegionX,
            block_time: Duration::from_secs(12),
            finality_depth: 1,
            xcm_execution_fee: 1_000_000,
            relay_token: Some(RELAY_ASSET_ID),
            fee_asset_payment: true,
            request_timeout: Some(Duration::from_secs(3_600)),
            minimum_contribution: 1_000,
            assignment_fee: 1_000_000_000,
            ..Self::relay()
        }
    }

    /// Set the superuser account.
    pub fn with_sudo(mut self, key: AccountId) -> Self {
        self.sudo_key = Some(key);
        self
    }

    /// Set the block time.
    pub fn with_block_time(mut self, block_time: Duration) -> Self {
        self.block_time = block_time;
        self
    }

    /// Set the finality depth.
    pub fn with_finality_depth(mut self, depth: u64) -> Self {
        self.finality_depth = depth;
        self
    }

    /// Set the state-read request lifetime.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set how many trusted state roots are kept per tracked chain.
    pub fn with_state_root_retention(mut self, blocks: u64) -> Self {
        self.state_root_retention = blocks;
        self
    }

    /// Set the flat transaction fee.
    pub fn with_base_fee(mut self, fee: Balance) -> Self {
        self.base_fee = fee;
        self
    }

    /// Para id of this chain, if it is a parachain.
    pub fn para_id(&self) -> Option<ParaId> {
        self.location.para_id()
    }

    /// Timeslice in effect at `now`.
    pub fn timeslice_at(&self, now: Duration) -> Timeslice {
        let relay_blocks = now.as_secs() / RELAY_BLOCK_TIME.as_secs();
        (relay_blocks / TIMESLICE_PERIOD) as Timeslice
    }
}

/// Initial ledger contents.
#[derive(Debug, Clone, Default)]
pub struct Genesis {
    /// Native balances.
    pub balances: Vec<(AccountId, Balance)>,
    /// Registered assets.
    pub assets: Vec<(AssetId, AssetMetadata)>,
    /// Fee exchange rates.
    pub rates: Vec<(AssetId, ExchangeRate)>,
    /// Asset balances.
    pub tokens: Vec<(AssetId, AccountId, Balance)>,
    /// Chains whose state roots are tracked from the start.
    pub tracked_chains: Vec<ParaId>,
}

impl Genesis {
    /// Fund an account with native currency.
    pub fn with_balance(mut self, who: AccountId, amount: Balance) -> Self {
        self.balances.push((who, amount));
        self
    }

    /// Register an asset.
    pub fn with_asset(mut self, id: AssetId, metadata: AssetMetadata) -> Self {
        self.assets.push((id, metadata));
        self
    }

    /// Set a fee exchange rate.
    pub fn with_rate(mut self, id: AssetId, rate: ExchangeRate) -> Self {
        self.rates.push((id, rate));
        self
    }

    /// Fund an account with a registered asset.
    pub fn with_token(mut self, id: AssetId, who: AccountId, amount: Balance) -> Self {
        self.tokens.push((id, who, amount));
        self
    }

    /// Track another chain's state roots.
    pub fn with_tracked_chain(mut self, para: ParaId) -> Self {
        self.tracked_chains.push(para);
        self
    }
}

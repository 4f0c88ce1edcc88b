//! Configuration of a simulated network.

use crate::accounts;
use crate::NetworkConfig;
use xregion_runtime::{ChainConfig, Genesis};
use xregion_types::{
    AssetMetadata, Balance, ExchangeRate, Location, CORETIME_PARA_ID, REGIONX_PARA_ID,
    RELAY_ASSET_ID,
};

/// Native balance of every development account at genesis.
pub const INITIAL_BALANCE: Balance = 1_000_000_000_000_000_000;

/// Relay token each development account holds on RegionX at genesis.
pub const INITIAL_RELAY_TOKENS: Balance = 1_000_000_000_000_000;

/// Relay token held by each parachain's sovereign account at genesis.
pub const SOVEREIGN_BALANCE: Balance = 1_000_000_000_000_000;

/// Chains, their genesis, and the network between them.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Seed for latencies and block phases.
    pub seed: u64,

    pub network: NetworkConfig,

    /// One entry per chain.
    pub chains: Vec<(ChainConfig, Genesis)>,
}

impl SimulationConfig {
    /// Empty network with no chains.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            network: NetworkConfig::default(),
            chains: Vec::new(),
        }
    }

    /// Relay, coretime and RegionX with funded development accounts.
    ///
    /// Alice is sudo everywhere. RegionX has the relay token registered at
    /// rate one and tracks the coretime chain's state roots.
    pub fn standard() -> Self {
        let sudo = accounts::alice();
        Self::new(12345)
            .with_chain(ChainConfig::relay().with_sudo(sudo), relay_genesis())
            .with_chain(ChainConfig::coretime().with_sudo(sudo), coretime_genesis())
            .with_chain(ChainConfig::regionx().with_sudo(sudo), regionx_genesis())
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the network latency model.
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Add a chain, replacing any chain at the same location.
    pub fn with_chain(mut self, config: ChainConfig, genesis: Genesis) -> Self {
        self.chains
            .retain(|(existing, _)| existing.location != config.location);
        self.chains.push((config, genesis));
        self
    }

    /// Locations of every configured chain.
    pub fn locations(&self) -> Vec<Location> {
        self.chains.iter().map(|(config, _)| config.location).collect()
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::standard()
    }
}

fn with_dev_balances(mut genesis: Genesis) -> Genesis {
    for who in accounts::dev_accounts() {
        genesis = genesis.with_balance(who, INITIAL_BALANCE);
    }
    genesis
}

/// Relay genesis: development accounts and parachain sovereigns funded.
pub fn relay_genesis() -> Genesis {
    with_dev_balances(Genesis::default())
        .with_balance(
            Location::Para(CORETIME_PARA_ID).sovereign_account(),
            SOVEREIGN_BALANCE,
        )
        .with_balance(
            Location::Para(REGIONX_PARA_ID).sovereign_account(),
            SOVEREIGN_BALANCE,
        )
}

/// Coretime genesis: development accounts and RegionX's sovereign funded,
/// the latter paying for assignments.
pub fn coretime_genesis() -> Genesis {
    with_dev_balances(Genesis::default()).with_balance(
        Location::Para(REGIONX_PARA_ID).sovereign_account(),
        SOVEREIGN_BALANCE,
    )
}

/// RegionX genesis: native and relay-token balances, the relay token
/// registered with a rate, and the coretime chain tracked.
pub fn regionx_genesis() -> Genesis {
    let mut genesis = with_dev_balances(Genesis::default())
        .with_asset(RELAY_ASSET_ID, AssetMetadata::relay_token())
        .with_rate(RELAY_ASSET_ID, ExchangeRate::ONE)
        .with_tracked_chain(CORETIME_PARA_ID);
    for who in accounts::dev_accounts() {
        genesis = genesis.with_token(RELAY_ASSET_ID, who, INITIAL_RELAY_TOKENS);
    }
    genesis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_chain_replaces_location() {
        let config = SimulationConfig::standard()
            .with_chain(ChainConfig::regionx(), Genesis::default());
        assert_eq!(config.chains.len(), 3);
        let (_, genesis) = config
            .chains
            .iter()
            .find(|(chain, _)| chain.location == Location::Para(REGIONX_PARA_ID))
            .unwrap();
        assert!(genesis.assets.is_empty());
    }

    #[test]
    fn test_standard_network() {
        let config = SimulationConfig::standard();
        assert_eq!(
            config.locations(),
            vec![
                Location::Relay,
                Location::Para(CORETIME_PARA_ID),
                Location::Para(REGIONX_PARA_ID)
            ]
        );
        assert!(config
            .chains
            .iter()
            .all(|(chain, _)| chain.sudo_key == Some(accounts::alice())));
    }
}

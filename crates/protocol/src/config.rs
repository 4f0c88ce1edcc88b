//! Protocol configuration.

use xregion_messages::SubmitOptions;
use xregion_types::{AccountId, Balance, Location, CORETIME_PARA_ID, REGIONX_PARA_ID};

/// Relay token carried with every region transfer to pay for execution on
/// the receiving chain.
pub const DEFAULT_REGION_TRANSFER_FEE: Balance = 10_000_000_000;

/// Who signs what, where the market lives, and how long to wait for
/// cross-chain effects.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// Superuser key for administrative calls.
    pub sudo: AccountId,

    /// Account that re-requests expired region records.
    pub relayer: AccountId,

    /// Relay token sent alongside a region.
    pub region_transfer_fee: Balance,

    /// Fee options for every signed call.
    pub submit_options: SubmitOptions,

    /// Chain hosting regions, orders and fulfillment.
    pub market_chain: Location,

    /// Chain owning the workplan regions are assigned on.
    pub scheduling_chain: Location,

    /// Give up waiting for a transition after this many finalized blocks.
    /// `None` waits indefinitely; callers then bound the wait themselves.
    pub settle_within_blocks: Option<u64>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            sudo: AccountId::from_seed("//Alice"),
            relayer: AccountId::from_seed("//Alice"),
            region_transfer_fee: DEFAULT_REGION_TRANSFER_FEE,
            submit_options: SubmitOptions::default(),
            market_chain: Location::Para(REGIONX_PARA_ID),
            scheduling_chain: Location::Para(CORETIME_PARA_ID),
            settle_within_blocks: Some(64),
        }
    }
}

impl ProtocolConfig {
    /// Set the superuser key.
    pub fn with_sudo(mut self, sudo: AccountId) -> Self {
        self.sudo = sudo;
        self
    }

    /// Set the relayer account.
    pub fn with_relayer(mut self, relayer: AccountId) -> Self {
        self.relayer = relayer;
        self
    }

    /// Set the relay token sent with each region.
    pub fn with_region_transfer_fee(mut self, fee: Balance) -> Self {
        self.region_transfer_fee = fee;
        self
    }

    /// Set fee options for signed calls.
    pub fn with_submit_options(mut self, options: SubmitOptions) -> Self {
        self.submit_options = options;
        self
    }

    /// Set the block budget for cross-chain waits.
    pub fn with_settle_within_blocks(mut self, blocks: Option<u64>) -> Self {
        self.settle_within_blocks = blocks;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let bob = AccountId::from_seed("//Bob");
        let config = ProtocolConfig::default()
            .with_relayer(bob)
            .with_region_transfer_fee(5)
            .with_settle_within_blocks(None);
        assert_eq!(config.relayer, bob);
        assert_eq!(config.sudo, AccountId::from_seed("//Alice"));
        assert_eq!(config.region_transfer_fee, 5);
        assert_eq!(config.settle_within_blocks, None);
        assert_eq!(config.market_chain, Location::Para(REGIONX_PARA_ID));
    }
}

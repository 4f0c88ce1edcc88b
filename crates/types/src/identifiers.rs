//! Domain-specific identifier types.

use crate::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fungible balance.
pub type Balance = u128;

/// Chain-local fungible asset identifier.
pub type AssetId = u32;

/// Coretime timeslice (one timeslice spans [`TIMESLICE_PERIOD`] relay blocks).
pub type Timeslice = u32;

/// Index of a core on the relay chain.
pub type CoreIndex = u16;

/// Number of relay chain blocks in one timeslice.
pub const TIMESLICE_PERIOD: u64 = 80;

/// Account identifier.
///
/// Accounts are derived deterministically; there is no key material behind
/// them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Derive a well-known account from a seed such as `"//Alice"`.
    pub fn from_seed(seed: &str) -> Self {
        Self(Hash::tagged("account", seed.as_bytes()).to_bytes())
    }

    /// The account controlled by parachain `para` on any other chain.
    pub fn sovereign(para: ParaId) -> Self {
        Self(Hash::tagged("sovereign", &para.0.to_le_bytes()).to_bytes())
    }

    /// The escrow account holding contributions to an order.
    pub fn order_escrow(order: OrderId) -> Self {
        Self(Hash::tagged("order", &order.0.to_le_bytes()).to_bytes())
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({}..)", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Parachain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParaId(pub u32);

impl fmt::Display for ParaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Para({})", self.0)
    }
}

impl From<u32> for ParaId {
    fn from(id: u32) -> Self {
        ParaId(id)
    }
}

/// Where a chain sits in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Location {
    /// The relay chain.
    Relay,
    /// A parachain.
    Para(ParaId),
}

impl Location {
    /// The parachain id, if this is a parachain.
    pub fn para_id(&self) -> Option<ParaId> {
        match self {
            Location::Relay => None,
            Location::Para(id) => Some(*id),
        }
    }

    /// Account controlled by this location on another chain.
    ///
    /// The relay chain has no sovereign account on its parachains; messages
    /// from it act with superuser authority instead, so it maps to a fixed
    /// account that is never funded.
    pub fn sovereign_account(&self) -> AccountId {
        match self {
            Location::Relay => AccountId::from_seed("relay-parent"),
            Location::Para(id) => AccountId::sovereign(*id),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Relay => write!(f, "Relay"),
            Location::Para(id) => write!(f, "{}", id),
        }
    }
}

/// Block height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHeight(pub u64);

impl BlockHeight {
    /// Genesis block height.
    pub const GENESIS: Self = BlockHeight(0);

    /// Get the next block height.
    pub fn next(self) -> Self {
        BlockHeight(self.0 + 1)
    }

    /// Get the previous block height (returns None if at genesis).
    pub fn prev(self) -> Option<Self> {
        if self.0 > 0 {
            Some(BlockHeight(self.0 - 1))
        } else {
            None
        }
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({})", self.0)
    }
}

/// Order identifier, allocated from a chain-owned counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u32);

impl OrderId {
    /// Id following this one, or `None` once the id space is exhausted.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(OrderId)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Order({})", self.0)
    }
}

/// A reference to a produced block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    /// Block height.
    pub height: BlockHeight,
    /// Block hash.
    pub hash: Hash,
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:?}", self.height, self.hash)
    }
}

//! Finalized header announcements.

use serde::{Deserialize, Serialize};
use xregion_types::{BlockHeight, Hash, Location};

/// Header of a finalized block, relayed to other chains so they can trust
/// its state root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedHeader {
    /// Chain that produced the block.
    pub origin: Location,
    /// Block height.
    pub height: BlockHeight,
    /// Block hash.
    pub hash: Hash,
    /// State root after the block.
    pub state_root: Hash,
}

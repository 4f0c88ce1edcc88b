//! Network topology: which chains trust each other and how assets move.

use crate::{Location, ParaId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parachain ids below this value are system chains.
///
/// System chains and the relay chain trust each other fully.
pub const SYSTEM_CHAIN_THRESHOLD: u32 = 2000;

/// Para id of the coretime system chain.
pub const CORETIME_PARA_ID: ParaId = ParaId(1005);

/// Para id of the RegionX chain.
pub const REGIONX_PARA_ID: ParaId = ParaId(2000);

impl ParaId {
    /// Whether this is a trust-anchored system chain.
    pub fn is_system(&self) -> bool {
        self.0 < SYSTEM_CHAIN_THRESHOLD
    }
}

impl Location {
    /// Whether this location belongs to the trusted system set.
    pub fn is_system(&self) -> bool {
        match self {
            Location::Relay => true,
            Location::Para(id) => id.is_system(),
        }
    }
}

/// How a fungible transfer crosses chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferMode {
    /// Burn on the sender, mint on the receiver. Needs mutual full trust.
    Teleport,
    /// Lock in the destination's sovereign account on the sender; the
    /// receiver mints a representation backed by that lock.
    ReserveTransfer,
}

impl TransferMode {
    /// Select the transfer mode for a destination parachain.
    ///
    /// Depends only on the destination id.
    pub fn for_destination(dest: ParaId) -> Self {
        if dest.is_system() {
            TransferMode::Teleport
        } else {
            TransferMode::ReserveTransfer
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Teleport => write!(f, "teleport"),
            TransferMode::ReserveTransfer => write!(f, "reserve-transfer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_mode_threshold() {
        assert_eq!(
            TransferMode::for_destination(CORETIME_PARA_ID),
            TransferMode::Teleport
        );
        assert_eq!(
            TransferMode::for_destination(ParaId(1999)),
            TransferMode::Teleport
        );
        assert_eq!(
            TransferMode::for_destination(ParaId(2000)),
            TransferMode::ReserveTransfer
        );
        assert_eq!(
            TransferMode::for_destination(ParaId(4242)),
            TransferMode::ReserveTransfer
        );
    }

    #[test]
    fn test_relay_is_system() {
        assert!(Location::Relay.is_system());
        assert!(Location::Para(CORETIME_PARA_ID).is_system());
        assert!(!Location::Para(REGIONX_PARA_ID).is_system());
    }
}

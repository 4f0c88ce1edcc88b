use thiserror::Error;
use xregion_types::{InvalidTransaction, Location};

/// Errors from driving the simulated network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("no chain at {0}")]
    UnknownChain(Location),

    #[error("a chain already runs at {0}")]
    DuplicateChain(Location),

    /// The chain's pool refused the extrinsic.
    #[error("extrinsic rejected by {location}: {reason}")]
    Rejected {
        location: Location,
        reason: InvalidTransaction,
    },
}

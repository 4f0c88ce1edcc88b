//! Outputs of a chain state machine.

use crate::{OutboundMessage, RequestId, TransactionStatus};
use std::time::Duration;
use xregion_types::{BlockRef, Location};

/// Timers a chain can arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Next block production slot.
    BlockProduction,
}

/// Something the runner must do on a chain's behalf.
#[derive(Debug, Clone)]
pub enum Action {
    /// Fire `Event::BlockTimer` after `duration`.
    SetTimer { id: TimerId, duration: Duration },

    /// Deliver a message to one chain.
    Send {
        dest: Location,
        message: OutboundMessage,
    },

    /// Deliver a message to every other chain.
    Broadcast { message: OutboundMessage },

    /// Report progress of a submitted extrinsic to its watcher.
    EmitTransactionStatus {
        request_id: RequestId,
        status: TransactionStatus,
    },

    /// A block became final. Clients waiting on finalized state re-check.
    BlockFinalized(BlockRef),
}

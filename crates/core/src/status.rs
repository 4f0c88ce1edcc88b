//! Lifecycle of a submitted extrinsic.

use xregion_types::{BlockRef, DispatchError, EventRecord, InvalidTransaction};

/// Status reported to whoever watches a submitted extrinsic.
///
/// `Ready → InBlock → {Finalized | Failed}`. `Invalid` is reported instead of
/// `InBlock` if the extrinsic no longer validates when a block is authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Accepted into the pool.
    Ready,
    /// Included in a block that is not yet final.
    InBlock(BlockRef),
    /// Included, dispatched successfully, and final.
    Finalized {
        block: BlockRef,
        events: Vec<EventRecord>,
    },
    /// Included and final, but dispatch failed. No state change was kept.
    Failed { block: BlockRef, error: DispatchError },
    /// Dropped from the pool without inclusion.
    Invalid(InvalidTransaction),
}

impl TransactionStatus {
    /// Whether no further status will follow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Finalized { .. }
                | TransactionStatus::Failed { .. }
                | TransactionStatus::Invalid(_)
        )
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            TransactionStatus::Ready => "Ready",
            TransactionStatus::InBlock(_) => "InBlock",
            TransactionStatus::Finalized { .. } => "Finalized",
            TransactionStatus::Failed { .. } => "Failed",
            TransactionStatus::Invalid(_) => "Invalid",
        }
    }
}

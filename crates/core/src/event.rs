//! Inputs to a chain state machine.

use crate::RequestId;
use xregion_messages::{Extrinsic, FinalizedHeader, XcmEnvelope};

/// Something that happened to a chain.
#[derive(Debug, Clone)]
pub enum Event {
    /// Time to author the next block.
    BlockTimer,

    /// A client submitted an extrinsic that passed pool validation.
    ExtrinsicSubmitted {
        request_id: RequestId,
        extrinsic: Extrinsic,
    },

    /// A cross-chain program arrived. Executed at the start of the next block.
    XcmReceived(XcmEnvelope),

    /// Another chain finalized a block.
    HeaderReceived(FinalizedHeader),
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::BlockTimer => "BlockTimer",
            Event::ExtrinsicSubmitted { .. } => "ExtrinsicSubmitted",
            Event::XcmReceived(_) => "XcmReceived",
            Event::HeaderReceived(_) => "HeaderReceived",
        }
    }
}

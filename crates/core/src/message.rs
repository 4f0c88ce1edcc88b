//! Outbound message types for cross-chain communication.

use xregion_messages::{FinalizedHeader, XcmEnvelope};

/// Messages a chain sends to other chains.
///
/// The runner handles delivery.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    /// A cross-chain program addressed to one chain.
    Xcm(XcmEnvelope),

    /// A finalized header, offered to every chain.
    Header(FinalizedHeader),
}

impl OutboundMessage {
    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::Xcm(_) => "Xcm",
            OutboundMessage::Header(_) => "Header",
        }
    }

    /// Check if this is a cross-chain program.
    pub fn is_xcm(&self) -> bool {
        matches!(self, OutboundMessage::Xcm(_))
    }

    /// Check if this is a header announcement.
    pub fn is_header(&self) -> bool {
        matches!(self, OutboundMessage::Header(_))
    }
}

//! State-read response datagrams.

use serde::{Deserialize, Serialize};
use xregion_types::{AccountId, BlockHeight, Hash, ParaId, Request, StorageProof};

/// Storage proof of one chain's state at a given height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateProof {
    /// Chain the proof is for.
    pub para: ParaId,
    /// Height whose state root the proof verifies against.
    pub height: BlockHeight,
    /// Proven entries.
    pub proof: StorageProof,
}

/// Response to an outstanding request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// The request being answered, exactly as it was dispatched.
    pub request: Request,
    /// Proof of the requested keys.
    pub proof: StateProof,
    /// Relayer submitting the response.
    pub signer: AccountId,
}

impl ResponseMessage {
    /// Commitment of the request being answered.
    pub fn commitment(&self) -> Hash {
        self.request.commitment()
    }
}

/// Messages accepted by the unsigned request handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Datagram {
    Response(ResponseMessage),
}

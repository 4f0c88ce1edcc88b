//! State-read requests exchanged between chains.

use crate::{BlockHeight, Hash, ParaId, StorageKey};
use serde::{Deserialize, Serialize};

/// A request to read another chain's storage at a historical height.
///
/// The request is answered by whoever supplies a storage proof that verifies
/// against the source chain's state root at `height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    /// Chain that issued the request.
    pub source: ParaId,
    /// Chain whose state is read.
    pub dest: ParaId,
    /// Per-source sequence number.
    pub nonce: u64,
    /// Keys to read.
    pub keys: Vec<StorageKey>,
    /// Height of `dest` to read at.
    pub height: BlockHeight,
    /// Timestamp (seconds) after which the request expires. Zero means never.
    pub timeout_timestamp: u64,
}

impl GetRequest {
    /// Commitment identifying this request.
    pub fn commitment(&self) -> Hash {
        Hash::of(self)
    }

    /// Whether the request has expired at `now_secs`.
    pub fn timed_out(&self, now_secs: u64) -> bool {
        self.timeout_timestamp != 0 && now_secs >= self.timeout_timestamp
    }
}

/// Kinds of cross-chain request a chain may hold.
///
/// Only `Get` requests carry a resolvable record. `Post` exists so that a
/// response naming a non-Get request can be rejected explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// State read.
    Get(GetRequest),
    /// Arbitrary payload delivery.
    Post {
        /// Source chain.
        source: ParaId,
        /// Destination chain.
        dest: ParaId,
        /// Sequence number.
        nonce: u64,
        /// Opaque body.
        body: Vec<u8>,
    },
}

impl Request {
    /// Commitment identifying this request.
    pub fn commitment(&self) -> Hash {
        match self {
            Request::Get(get) => get.commitment(),
            post => Hash::of(post),
        }
    }

    /// The inner Get request, if any.
    pub fn as_get(&self) -> Option<&GetRequest> {
        match self {
            Request::Get(get) => Some(get),
            Request::Post { .. } => None,
        }
    }
}

//! The chain client interface the protocol consumes.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use xregion_core::{RequestId, TransactionStatus};
use xregion_messages::{Extrinsic, StateProof};
use xregion_types::{
    BlockHeight, BlockRef, EventRecord, Hash, InvalidTransaction, Location, Request, StorageKey,
    StoragePrefix, StorageValue,
};

/// Failures of the client itself, as opposed to failures of calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The pool refused the extrinsic.
    #[error("rejected by the transaction pool: {0}")]
    Rejected(InvalidTransaction),

    /// No block with this hash.
    #[error("unknown block {0}")]
    UnknownBlock(Hash),

    /// The chain cannot prove state (it is not a parachain).
    #[error("{0} does not serve state proofs")]
    ProofsUnsupported(Location),

    /// The chain is gone.
    #[error("chain {0} disconnected")]
    Disconnected(Location),
}

/// Status stream of one submitted extrinsic.
///
/// Dropping the watch unsubscribes. The extrinsic itself is unaffected; only
/// the observation is abandoned.
pub struct TransactionWatch {
    request_id: RequestId,
    statuses: mpsc::UnboundedReceiver<TransactionStatus>,
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl TransactionWatch {
    /// Wrap a status channel. `unsubscribe` runs exactly once, when the watch
    /// is dropped.
    pub fn new(
        request_id: RequestId,
        statuses: mpsc::UnboundedReceiver<TransactionStatus>,
        unsubscribe: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            request_id,
            statuses,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Id the chain tracks the extrinsic under.
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Next status, or `None` once the chain stops reporting.
    pub async fn next(&mut self) -> Option<TransactionStatus> {
        self.statuses.recv().await
    }
}

impl fmt::Debug for TransactionWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionWatch")
            .field("request_id", &self.request_id)
            .finish()
    }
}

impl Drop for TransactionWatch {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

/// A connection to one chain.
///
/// Reads with `at: None` see the best block; pass a finalized hash to read
/// settled state.
#[async_trait]
pub trait ChainApi: Send + Sync {
    /// Where the chain sits.
    fn location(&self) -> Location;

    /// Submit an extrinsic and follow its status.
    async fn submit(&self, extrinsic: Extrinsic) -> Result<TransactionWatch, ChainError>;

    /// Read one ledger entry.
    async fn storage(
        &self,
        key: &StorageKey,
        at: Option<Hash>,
    ) -> Result<Option<StorageValue>, ChainError>;

    /// Enumerate one ledger map.
    async fn storage_iter(
        &self,
        prefix: StoragePrefix,
        at: Option<Hash>,
    ) -> Result<Vec<(StorageKey, StorageValue)>, ChainError>;

    /// Merkle proof of `keys` against the state root of block `at`.
    async fn query_state_proof(
        &self,
        keys: Vec<StorageKey>,
        at: Hash,
    ) -> Result<StateProof, ChainError>;

    /// Outstanding state-read requests among `commitments`.
    async fn query_pending_requests(
        &self,
        commitments: Vec<Hash>,
    ) -> Result<Vec<Request>, ChainError>;

    /// Hash of the block at `height`, if produced.
    async fn block_hash(&self, height: BlockHeight) -> Result<Option<Hash>, ChainError>;

    /// Events deposited in block `at`.
    async fn events(&self, at: Hash) -> Result<Vec<EventRecord>, ChainError>;

    /// Latest finalized block.
    async fn finalized_head(&self) -> Result<BlockRef, ChainError>;

    /// Every block finalized from now on.
    fn subscribe_finalized(&self) -> broadcast::Receiver<BlockRef>;
}

/// Connections to every chain of the network, by location.
#[derive(Clone, Default)]
pub struct Chains {
    chains: BTreeMap<Location, Arc<dyn ChainApi>>,
}

impl Chains {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chain, replacing any previous connection at its location.
    pub fn with(mut self, chain: Arc<dyn ChainApi>) -> Self {
        self.insert(chain);
        self
    }

    /// Add a chain.
    pub fn insert(&mut self, chain: Arc<dyn ChainApi>) {
        self.chains.insert(chain.location(), chain);
    }

    /// Connection to `location`.
    pub fn get(&self, location: Location) -> Option<Arc<dyn ChainApi>> {
        self.chains.get(&location).cloned()
    }

    /// Every known location.
    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.chains.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl fmt::Debug for Chains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.chains.keys()).finish()
    }
}

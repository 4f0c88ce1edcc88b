//! [`ChainApi`] over one chain of a running simulation.

use crate::{SimulationError, SimulationRunner};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use xregion_messages::{Extrinsic, StateProof};
use xregion_protocol::{ChainApi, ChainError, TransactionWatch};
use xregion_runtime::ChainStateMachine;
use xregion_types::{
    BlockHeight, BlockRef, EventRecord, Hash, Location, Request, StorageKey, StoragePrefix,
    StorageValue,
};

/// Client for one simulated chain.
pub struct SimChain {
    location: Location,
    runner: Arc<Mutex<SimulationRunner>>,
}

impl SimChain {
    pub fn new(location: Location, runner: Arc<Mutex<SimulationRunner>>) -> Self {
        Self { location, runner }
    }

    fn read<R>(&self, f: impl FnOnce(&ChainStateMachine) -> R) -> Result<R, ChainError> {
        let runner = self.runner.lock();
        let chain = runner
            .chain(self.location)
            .ok_or(ChainError::Disconnected(self.location))?;
        Ok(f(chain))
    }
}

impl std::fmt::Debug for SimChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimChain")
            .field("location", &self.location)
            .finish()
    }
}

#[async_trait]
impl ChainApi for SimChain {
    fn location(&self) -> Location {
        self.location
    }

    async fn submit(&self, extrinsic: Extrinsic) -> Result<TransactionWatch, ChainError> {
        let (request_id, statuses) = self
            .runner
            .lock()
            .submit(self.location, extrinsic)
            .map_err(|err| match err {
                SimulationError::Rejected { reason, .. } => ChainError::Rejected(reason),
                _ => ChainError::Disconnected(self.location),
            })?;
        let runner = self.runner.clone();
        Ok(TransactionWatch::new(request_id, statuses, move || {
            runner.lock().unwatch(request_id);
        }))
    }

    async fn storage(
        &self,
        key: &StorageKey,
        at: Option<Hash>,
    ) -> Result<Option<StorageValue>, ChainError> {
        self.read(|chain| {
            if let Some(hash) = at {
                chain.block_by_hash(&hash).ok_or(ChainError::UnknownBlock(hash))?;
            }
            Ok(chain.storage(key, at))
        })?
    }

    async fn storage_iter(
        &self,
        prefix: StoragePrefix,
        at: Option<Hash>,
    ) -> Result<Vec<(StorageKey, StorageValue)>, ChainError> {
        self.read(|chain| {
            if let Some(hash) = at {
                chain.block_by_hash(&hash).ok_or(ChainError::UnknownBlock(hash))?;
            }
            Ok(chain.storage_iter(prefix, at))
        })?
    }

    async fn query_state_proof(
        &self,
        keys: Vec<StorageKey>,
        at: Hash,
    ) -> Result<StateProof, ChainError> {
        if self.location.para_id().is_none() {
            return Err(ChainError::ProofsUnsupported(self.location));
        }
        self.read(|chain| chain.state_proof(&keys, at).ok_or(ChainError::UnknownBlock(at)))?
    }

    async fn query_pending_requests(
        &self,
        commitments: Vec<Hash>,
    ) -> Result<Vec<Request>, ChainError> {
        self.read(|chain| chain.pending_requests(&commitments))
    }

    async fn block_hash(&self, height: BlockHeight) -> Result<Option<Hash>, ChainError> {
        self.read(|chain| chain.block_hash(height))
    }

    async fn events(&self, at: Hash) -> Result<Vec<EventRecord>, ChainError> {
        self.read(|chain| {
            chain
                .events(&at)
                .map(<[EventRecord]>::to_vec)
                .ok_or(ChainError::UnknownBlock(at))
        })?
    }

    async fn finalized_head(&self) -> Result<BlockRef, ChainError> {
        self.read(ChainStateMachine::finalized)
    }

    fn subscribe_finalized(&self) -> broadcast::Receiver<BlockRef> {
        // A chain that is gone yields a closed subscription.
        self.runner
            .lock()
            .subscribe_finalized(self.location)
            .unwrap_or_else(|| broadcast::channel(1).1)
    }
}

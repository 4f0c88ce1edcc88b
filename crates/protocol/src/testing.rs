//! A scripted in-memory chain for unit tests.

use crate::{ChainApi, ChainError, TransactionWatch};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use xregion_core::{RequestId, TransactionStatus};
use xregion_messages::{Extrinsic, StateProof};
use xregion_types::{
    BlockHeight, BlockRef, EventRecord, Hash, InvalidTransaction, Location, Request,
    StorageKey, StoragePrefix, StorageProof, StorageValue, REGIONX_PARA_ID,
};

/// How the chain answers the next submission.
#[derive(Debug, Clone)]
pub enum Script {
    /// Report these statuses, then close the stream.
    Statuses(Vec<TransactionStatus>),
    /// Refuse at the pool.
    Reject(InvalidTransaction),
    /// Accept and never report anything.
    Hang,
}

pub struct MockChain {
    location: Location,
    scripts: Mutex<VecDeque<Script>>,
    submitted: Mutex<Vec<Extrinsic>>,
    storage: Mutex<BTreeMap<StorageKey, StorageValue>>,
    requests: Mutex<BTreeMap<Hash, Request>>,
    hashes: Mutex<BTreeMap<BlockHeight, Hash>>,
    head: Mutex<BlockRef>,
    finalized: broadcast::Sender<BlockRef>,
    watching: Arc<Mutex<HashSet<RequestId>>>,
    hung: Mutex<Vec<mpsc::UnboundedSender<TransactionStatus>>>,
    next_request: Mutex<RequestId>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::at(Location::Para(REGIONX_PARA_ID))
    }

    pub fn at(location: Location) -> Self {
        let (finalized, _) = broadcast::channel(64);
        Self {
            location,
            scripts: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            storage: Mutex::new(BTreeMap::new()),
            requests: Mutex::new(BTreeMap::new()),
            hashes: Mutex::new(BTreeMap::new()),
            head: Mutex::new(BlockRef {
                height: BlockHeight(1),
                hash: Hash::from_bytes(b"head-1"),
            }),
            finalized,
            watching: Arc::new(Mutex::new(HashSet::new())),
            hung: Mutex::new(Vec::new()),
            next_request: Mutex::new(RequestId(0)),
        }
    }

    pub fn with_script(self, script: Script) -> Self {
        self.scripts.lock().push_back(script);
        self
    }

    pub fn with_storage(self, key: StorageKey, value: StorageValue) -> Self {
        self.storage.lock().insert(key, value);
        self
    }

    pub fn with_request(self, request: Request) -> Self {
        self.requests.lock().insert(request.commitment(), request);
        self
    }

    pub fn set_storage(&self, key: StorageKey, value: StorageValue) {
        self.storage.lock().insert(key, value);
    }

    pub fn submitted(&self) -> Vec<Extrinsic> {
        self.submitted.lock().clone()
    }

    pub fn active_watches(&self) -> usize {
        self.watching.lock().len()
    }

    /// Finalize the next block and notify subscribers.
    pub fn finalize_next(&self) -> BlockRef {
        let mut head = self.head.lock();
        let height = head.height.next();
        *head = BlockRef {
            height,
            hash: Hash::from_parts(&[b"head-", &height.0.to_le_bytes()]),
        };
        self.hashes.lock().insert(height, head.hash);
        let _ = self.finalized.send(*head);
        *head
    }
}

#[async_trait]
impl ChainApi for MockChain {
    fn location(&self) -> Location {
        self.location
    }

    async fn submit(&self, extrinsic: Extrinsic) -> Result<TransactionWatch, ChainError> {
        let script = self.scripts.lock().pop_front().unwrap_or_else(|| {
            Script::Statuses(vec![TransactionStatus::Finalized {
                block: *self.head.lock(),
                events: vec![],
            }])
        });
        if let Script::Reject(invalid) = script {
            return Err(ChainError::Rejected(invalid));
        }
        self.submitted.lock().push(extrinsic);

        let request_id = {
            let mut next = self.next_request.lock();
            *next = next.next();
            *next
        };
        let (tx, rx) = mpsc::unbounded_channel();
        match script {
            Script::Statuses(statuses) => {
                for status in statuses {
                    let _ = tx.send(status);
                }
            }
            Script::Hang => self.hung.lock().push(tx),
            Script::Reject(_) => {}
        }

        self.watching.lock().insert(request_id);
        let watching = self.watching.clone();
        Ok(TransactionWatch::new(request_id, rx, move || {
            watching.lock().remove(&request_id);
        }))
    }

    async fn storage(
        &self,
        key: &StorageKey,
        _at: Option<Hash>,
    ) -> Result<Option<StorageValue>, ChainError> {
        Ok(self.storage.lock().get(key).cloned())
    }

    async fn storage_iter(
        &self,
        prefix: StoragePrefix,
        _at: Option<Hash>,
    ) -> Result<Vec<(StorageKey, StorageValue)>, ChainError> {
        Ok(self
            .storage
            .lock()
            .iter()
            .filter(|(key, _)| key.prefix() == prefix)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn query_state_proof(
        &self,
        keys: Vec<StorageKey>,
        at: Hash,
    ) -> Result<StateProof, ChainError> {
        let para = self
            .location
            .para_id()
            .ok_or(ChainError::ProofsUnsupported(self.location))?;
        let height = self
            .hashes
            .lock()
            .iter()
            .find(|(_, hash)| **hash == at)
            .map(|(height, _)| *height)
            .ok_or(ChainError::UnknownBlock(at))?;
        let storage = self.storage.lock();
        Ok(StateProof {
            para,
            height,
            proof: StorageProof::generate(storage.iter(), &keys),
        })
    }

    async fn query_pending_requests(
        &self,
        commitments: Vec<Hash>,
    ) -> Result<Vec<Request>, ChainError> {
        let requests = self.requests.lock();
        Ok(commitments
            .iter()
            .filter_map(|commitment| requests.get(commitment).cloned())
            .collect())
    }

    async fn block_hash(&self, height: BlockHeight) -> Result<Option<Hash>, ChainError> {
        Ok(self.hashes.lock().get(&height).copied())
    }

    async fn events(&self, _at: Hash) -> Result<Vec<EventRecord>, ChainError> {
        Ok(Vec::new())
    }

    async fn finalized_head(&self) -> Result<BlockRef, ChainError> {
        Ok(*self.head.lock())
    }

    fn subscribe_finalized(&self) -> broadcast::Receiver<BlockRef> {
        self.finalized.subscribe()
    }
}

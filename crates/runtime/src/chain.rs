//! A chain as a deterministic state machine.
//!
//! # Block production
//!
//! ```text
//!   BlockTimer
//!       │
//!       ├─ initialization: relayed headers, request timeouts, inbound programs
//!       ├─ extrinsics: revalidate, charge fee, dispatch transactionally
//!       ├─ seal: state root, block hash, outbound programs
//!       └─ finality: blocks `finality_depth` behind the best are final;
//!                    their statuses and headers are released
//! ```
//!
//! Fees are kept even when dispatch fails. Every block keeps an O(1)
//! snapshot of its post-state for historical reads and proofs.

use crate::pallets::{ismp, xcm};
use crate::validation;
use crate::{dispatch, ChainConfig, Context, Genesis, Ledger, Origin, Pallet};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};
use xregion_core::{
    Action, Event, OutboundMessage, RequestId, StateMachine, TimerId, TransactionStatus,
};
use xregion_messages::{Extrinsic, FinalizedHeader, StateProof, XcmEnvelope};
use xregion_types::{
    BlockHeight, BlockRef, DispatchError, EventRecord, Hash, InvalidTransaction, Location, Phase,
    Request, RuntimeEvent, StorageKey, StoragePrefix, StorageValue,
};

/// Outcome of one included extrinsic.
#[derive(Debug, Clone)]
struct Receipt {
    request_id: RequestId,
    index: u32,
    error: Option<DispatchError>,
}

/// A sealed block.
#[derive(Debug, Clone)]
pub struct Block {
    pub height: BlockHeight,
    pub hash: Hash,
    pub parent: Hash,
    pub state_root: Hash,
    /// Hashes of included extrinsics, in order.
    pub extrinsics: Vec<Hash>,
    pub events: Vec<EventRecord>,
    receipts: Vec<Receipt>,
    state: Ledger,
}

impl Block {
    /// Reference to this block.
    pub fn block_ref(&self) -> BlockRef {
        BlockRef {
            height: self.height,
            hash: self.hash,
        }
    }

    /// Ledger after this block.
    pub fn state(&self) -> &Ledger {
        &self.state
    }
}

fn genesis_ledger(genesis: &Genesis) -> Ledger {
    let mut ledger = Ledger::new();
    for (who, amount) in &genesis.balances {
        ledger.insert(StorageKey::Account(*who), StorageValue::Balance(*amount));
    }
    for (id, metadata) in &genesis.assets {
        ledger.insert(
            StorageKey::AssetMetadata(*id),
            StorageValue::AssetMetadata(metadata.clone()),
        );
    }
    for (id, rate) in &genesis.rates {
        ledger.insert(StorageKey::AssetRate(*id), StorageValue::ExchangeRate(*rate));
    }
    for (asset, who, amount) in &genesis.tokens {
        ledger.insert(
            StorageKey::Token {
                asset: *asset,
                who: *who,
            },
            StorageValue::Balance(*amount),
        );
    }
    for para in &genesis.tracked_chains {
        ledger.insert(StorageKey::TrackedChain(*para), StorageValue::Flag);
    }
    ledger
}

/// One chain of the network.
pub struct ChainStateMachine {
    config: ChainConfig,

    /// Best state.
    state: Ledger,

    /// Every block, indexed by height.
    blocks: Vec<Block>,

    finalized: BlockHeight,

    /// Validated extrinsics waiting for the next block.
    pool: VecDeque<(RequestId, Extrinsic)>,

    /// Programs delivered since the last block.
    inbound: VecDeque<XcmEnvelope>,

    /// Finalized headers of other chains relayed since the last block.
    headers: VecDeque<FinalizedHeader>,

    now: Duration,
}

impl std::fmt::Debug for ChainStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainStateMachine")
            .field("name", &self.config.name)
            .field("best", &self.best())
            .field("finalized", &self.finalized)
            .field("pool", &self.pool.len())
            .finish()
    }
}

impl ChainStateMachine {
    /// Create a chain at genesis.
    pub fn new(config: ChainConfig, genesis: Genesis) -> Self {
        let state = genesis_ledger(&genesis);
        let state_root = state.root();
        let hash = Hash::of(&(config.location, BlockHeight::GENESIS, state_root));
        info!(
            chain = %config.name,
            location = %config.location,
            root = %state_root,
            "Chain initialized"
        );

        let genesis_block = Block {
            height: BlockHeight::GENESIS,
            hash,
            parent: Hash::ZERO,
            state_root,
            extrinsics: Vec::new(),
            events: Vec::new(),
            receipts: Vec::new(),
            state: state.clone(),
        };
        Self {
            config,
            state,
            blocks: vec![genesis_block],
            finalized: BlockHeight::GENESIS,
            pool: VecDeque::new(),
            inbound: VecDeque::new(),
            headers: VecDeque::new(),
            now: Duration::ZERO,
        }
    }

    /// Chain configuration.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Where the chain sits.
    pub fn location(&self) -> Location {
        self.config.location
    }

    /// Best block.
    pub fn best(&self) -> BlockRef {
        self.blocks
            .last()
            .map(Block::block_ref)
            .unwrap_or(BlockRef {
                height: BlockHeight::GENESIS,
                hash: Hash::ZERO,
            })
    }

    /// Latest finalized block.
    pub fn finalized(&self) -> BlockRef {
        self.blocks[self.finalized.0 as usize].block_ref()
    }

    /// Block at `height`.
    pub fn block(&self, height: BlockHeight) -> Option<&Block> {
        self.blocks.get(height.0 as usize)
    }

    /// Block with `hash`.
    pub fn block_by_hash(&self, hash: &Hash) -> Option<&Block> {
        self.blocks.iter().rev().find(|block| &block.hash == hash)
    }

    /// Hash of the block at `height`.
    pub fn block_hash(&self, height: BlockHeight) -> Option<Hash> {
        self.block(height).map(|block| block.hash)
    }

    /// Events of the block with `hash`.
    pub fn events(&self, hash: &Hash) -> Option<&[EventRecord]> {
        self.block_by_hash(hash).map(|block| block.events.as_slice())
    }

    fn state_at(&self, at: Option<Hash>) -> Option<&Ledger> {
        match at {
            None => Some(&self.state),
            Some(hash) => self.block_by_hash(&hash).map(Block::state),
        }
    }

    /// Read `key` at block `at`, or at the best block.
    pub fn storage(&self, key: &StorageKey, at: Option<Hash>) -> Option<StorageValue> {
        self.state_at(at)?.get(key).cloned()
    }

    /// Enumerate one map at block `at`, or at the best block.
    pub fn storage_iter(
        &self,
        prefix: StoragePrefix,
        at: Option<Hash>,
    ) -> Vec<(StorageKey, StorageValue)> {
        self.state_at(at)
            .map(|ledger| {
                ledger
                    .iter_prefix(prefix)
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Proof of `keys` against the state root of block `at`.
    ///
    /// `None` for unknown blocks and for the relay chain, which is never the
    /// target of state reads.
    pub fn state_proof(&self, keys: &[StorageKey], at: Hash) -> Option<StateProof> {
        let para = self.config.para_id()?;
        let block = self.block_by_hash(&at)?;
        Some(StateProof {
            para,
            height: block.height,
            proof: block.state.proof(keys),
        })
    }

    /// Outstanding state-read requests among `commitments`, at the best block.
    pub fn pending_requests(&self, commitments: &[Hash]) -> Vec<Request> {
        commitments
            .iter()
            .filter_map(|commitment| {
                self.state
                    .get(&StorageKey::Request(*commitment))
                    .and_then(StorageValue::as_request)
                    .cloned()
            })
            .collect()
    }

    /// Transaction pool check against the best state.
    pub fn validate_transaction(&self, extrinsic: &Extrinsic) -> Result<(), InvalidTransaction> {
        validation::validate(&self.state, &self.config, extrinsic).map(|_| ())
    }

    /// Extrinsics waiting for inclusion.
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    fn produce_block(&mut self) -> Vec<Action> {
        let parent = self.best();
        let height = parent.height.next();
        let mut actions = Vec::new();
        let mut records = Vec::new();
        let mut receipts = Vec::new();
        let mut included = Vec::new();

        let mut ctx = Context::new(&self.config, self.state.clone(), self.now, height);

        if self.config.kind.has(Pallet::Ismp) {
            for header in self.headers.drain(..) {
                ismp::on_header(&mut ctx, &header);
            }
            ismp::on_initialize(&mut ctx);
        } else {
            self.headers.clear();
        }
        for envelope in self.inbound.drain(..) {
            xcm::execute(&mut ctx, envelope);
        }
        records.extend(ctx.take_events().into_iter().map(|event| EventRecord {
            phase: Phase::Initialization,
            event,
        }));

        for (request_id, extrinsic) in self.pool.drain(..) {
            let charged = validation::validate(&ctx.ledger, ctx.config, &extrinsic)
                .and_then(|fee| match &fee {
                    Some(fee) => validation::charge(&mut ctx, fee).map(|_| ()),
                    None => Ok(()),
                });
            if let Err(invalid) = charged {
                warn!(chain = %self.config.name, %request_id, %invalid, "Extrinsic dropped");
                // Anything deposited while charging is discarded with it.
                ctx.take_events();
                actions.push(Action::EmitTransactionStatus {
                    request_id,
                    status: TransactionStatus::Invalid(invalid),
                });
                continue;
            }

            let index = included.len() as u32;
            let origin = extrinsic
                .signer()
                .map(Origin::Signed)
                .unwrap_or(Origin::None);
            let call = extrinsic.call.clone();
            let name = call.name();
            let error = match ctx.with_transaction(|ctx| dispatch(ctx, origin, call)) {
                Ok(()) => {
                    ctx.deposit_event(RuntimeEvent::ExtrinsicSuccess);
                    None
                }
                Err(error) => {
                    warn!(
                        chain = %self.config.name,
                        %request_id,
                        call = name,
                        %error,
                        "Dispatch failed"
                    );
                    ctx.deposit_event(RuntimeEvent::ExtrinsicFailed {
                        error: error.clone(),
                    });
                    Some(error)
                }
            };
            records.extend(ctx.take_events().into_iter().map(|event| EventRecord {
                phase: Phase::ApplyExtrinsic(index),
                event,
            }));
            included.push(extrinsic.hash());
            receipts.push(Receipt {
                request_id,
                index,
                error,
            });
        }

        let (state, outbox) = ctx.finish();
        let state_root = state.root();
        let hash = Hash::of(&(parent.hash, height, state_root, &included));
        let block_ref = BlockRef { height, hash };

        for receipt in &receipts {
            actions.push(Action::EmitTransactionStatus {
                request_id: receipt.request_id,
                status: TransactionStatus::InBlock(block_ref),
            });
        }
        for (dest, message) in outbox {
            actions.push(Action::Send {
                dest,
                message: OutboundMessage::Xcm(XcmEnvelope {
                    origin: self.config.location,
                    sent_at: height,
                    message,
                }),
            });
        }

        debug!(
            chain = %self.config.name,
            height = height.0,
            extrinsics = included.len(),
            events = records.len(),
            "Block produced"
        );

        self.state = state.clone();
        self.blocks.push(Block {
            height,
            hash,
            parent: parent.hash,
            state_root,
            extrinsics: included,
            events: records,
            receipts,
            state,
        });

        actions.extend(self.finalize());
        actions.push(Action::SetTimer {
            id: TimerId::BlockProduction,
            duration: self.config.block_time,
        });
        actions
    }

    fn finalize(&mut self) -> Vec<Action> {
        let best = self.best().height;
        let target = BlockHeight(best.0.saturating_sub(self.config.finality_depth));
        let mut actions = Vec::new();

        while self.finalized < target {
            let height = self.finalized.next();
            let block = &self.blocks[height.0 as usize];
            let block_ref = block.block_ref();

            for receipt in &block.receipts {
                let status = match &receipt.error {
                    None => TransactionStatus::Finalized {
                        block: block_ref,
                        events: block
                            .events
                            .iter()
                            .filter(|record| record.phase == Phase::ApplyExtrinsic(receipt.index))
                            .cloned()
                            .collect(),
                    },
                    Some(error) => TransactionStatus::Failed {
                        block: block_ref,
                        error: error.clone(),
                    },
                };
                actions.push(Action::EmitTransactionStatus {
                    request_id: receipt.request_id,
                    status,
                });
            }
            actions.push(Action::Broadcast {
                message: OutboundMessage::Header(FinalizedHeader {
                    origin: self.config.location,
                    height,
                    hash: block.hash,
                    state_root: block.state_root,
                }),
            });
            actions.push(Action::BlockFinalized(block_ref));
            self.finalized = height;
        }
        actions
    }
}

impl StateMachine for ChainStateMachine {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::BlockTimer => self.produce_block(),
            Event::ExtrinsicSubmitted {
                request_id,
                extrinsic,
            } => {
                self.pool.push_back((request_id, extrinsic));
                vec![Action::EmitTransactionStatus {
                    request_id,
                    status: TransactionStatus::Ready,
                }]
            }
            Event::XcmReceived(envelope) => {
                self.inbound.push_back(envelope);
                vec![]
            }
            Event::HeaderReceived(header) => {
                if header.origin != self.config.location {
                    self.headers.push_back(header);
                }
                vec![]
            }
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn now(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;
    use xregion_messages::{BalancesCall, Call, SubmitOptions};
    use xregion_types::AccountId;

    fn statuses(actions: &[Action]) -> Vec<(RequestId, TransactionStatus)> {
        actions
            .iter()
            .filter_map(|action| match action {
                Action::EmitTransactionStatus { request_id, status } => {
                    Some((*request_id, status.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn transfer(from: AccountId, to: AccountId, value: u128) -> Extrinsic {
        Extrinsic::signed(
            from,
            Call::Balances(BalancesCall::TransferKeepAlive { dest: to, value }),
            SubmitOptions::default(),
        )
    }

    #[traced_test]
    #[test]
    fn test_extrinsic_lifecycle() {
        let alice = AccountId::from_seed("//Alice");
        let bob = AccountId::from_seed("//Bob");
        let config = ChainConfig::relay().with_finality_depth(1);
        let fee = config.base_fee;
        let genesis = Genesis::default().with_balance(alice, 10 * fee);
        let mut chain = ChainStateMachine::new(config, genesis);

        let xt = transfer(alice, bob, fee);
        assert!(chain.validate_transaction(&xt).is_ok());
        let ready = chain.handle(Event::ExtrinsicSubmitted {
            request_id: RequestId(1),
            extrinsic: xt,
        });
        assert_eq!(statuses(&ready), vec![(RequestId(1), TransactionStatus::Ready)]);

        let first = chain.handle(Event::BlockTimer);
        let in_block = statuses(&first);
        assert!(matches!(
            in_block[0].1,
            TransactionStatus::InBlock(block) if block.height == BlockHeight(1)
        ));
        assert!(first.iter().any(|a| matches!(a, Action::SetTimer { .. })));

        let second = chain.handle(Event::BlockTimer);
        let finalized = statuses(&second);
        assert_eq!(finalized.len(), 1);
        let TransactionStatus::Finalized { block, events } = &finalized[0].1 else {
            panic!("expected Finalized, got {:?}", finalized[0].1);
        };
        assert_eq!(block.height, BlockHeight(1));
        assert!(events.iter().any(|r| r.event == RuntimeEvent::ExtrinsicSuccess));
        assert!(second
            .iter()
            .any(|a| matches!(a, Action::Broadcast { message } if message.is_header())));

        assert_eq!(
            chain.storage(&StorageKey::Account(bob), None),
            Some(StorageValue::Balance(fee))
        );
        assert_eq!(
            chain.storage(&StorageKey::Account(alice), None),
            Some(StorageValue::Balance(8 * fee)),
            "transfer plus fee"
        );
    }

    #[traced_test]
    #[test]
    fn test_failed_dispatch_keeps_fee() {
        let alice = AccountId::from_seed("//Alice");
        let bob = AccountId::from_seed("//Bob");
        let config = ChainConfig::relay().with_finality_depth(0);
        let fee = config.base_fee;
        let genesis = Genesis::default().with_balance(alice, 2 * fee);
        let mut chain = ChainStateMachine::new(config, genesis);

        chain.handle(Event::ExtrinsicSubmitted {
            request_id: RequestId(1),
            extrinsic: transfer(alice, bob, 5 * fee),
        });
        let actions = chain.handle(Event::BlockTimer);
        let failed = statuses(&actions)
            .into_iter()
            .find(|(_, status)| status.is_terminal())
            .unwrap();
        assert_eq!(
            failed.1,
            TransactionStatus::Failed {
                block: chain.best(),
                error: DispatchError::InsufficientBalance,
            }
        );
        assert_eq!(
            chain.storage(&StorageKey::Account(alice), None),
            Some(StorageValue::Balance(fee))
        );
        assert_eq!(chain.storage(&StorageKey::Account(bob), None), None);
    }

    #[test]
    fn test_revalidation_drops_unpayable() {
        let alice = AccountId::from_seed("//Alice");
        let bob = AccountId::from_seed("//Bob");
        let config = ChainConfig::relay();
        let fee = config.base_fee;
        let mut chain = ChainStateMachine::new(config, Genesis::default().with_balance(alice, fee));

        // Both pass pool validation; only one fee can be paid.
        for id in 1..=2 {
            chain.handle(Event::ExtrinsicSubmitted {
                request_id: RequestId(id),
                extrinsic: transfer(alice, bob, 0),
            });
        }
        let actions = chain.handle(Event::BlockTimer);
        assert!(statuses(&actions).contains(&(
            RequestId(2),
            TransactionStatus::Invalid(InvalidTransaction::Payment)
        )));
    }

    #[test]
    fn test_historical_reads_and_proofs() {
        let alice = AccountId::from_seed("//Alice");
        let config = ChainConfig::coretime();
        let mut chain = ChainStateMachine::new(config, Genesis::default().with_balance(alice, 1));
        let genesis = chain.best();
        chain.handle(Event::BlockTimer);

        assert_eq!(chain.block_hash(BlockHeight::GENESIS), Some(genesis.hash));
        assert_eq!(
            chain.storage(&StorageKey::Account(alice), Some(genesis.hash)),
            Some(StorageValue::Balance(1))
        );

        let keys = [StorageKey::Account(alice)];
        let proof = chain.state_proof(&keys, genesis.hash).unwrap();
        let root = chain.block(BlockHeight::GENESIS).unwrap().state_root;
        assert!(proof.proof.verify(&root, &keys).is_ok());
        assert!(ChainStateMachine::new(ChainConfig::relay(), Genesis::default())
            .state_proof(&keys, genesis.hash)
            .is_none());
    }
}

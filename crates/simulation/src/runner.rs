//! The deterministic runner: owns every chain, the event queue and the
//! network, and routes actions between them.

use crate::event_queue::{EventKey, EventPriority};
use crate::{SimulatedNetwork, SimulationConfig, SimulationError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace, warn};
use xregion_core::{
    Action, Event, OutboundMessage, RequestId, StateMachine, TimerId, TransactionStatus,
};
use xregion_messages::Extrinsic;
use xregion_runtime::{ChainConfig, ChainStateMachine, Genesis};
use xregion_types::{BlockRef, Location};

/// Finalized blocks buffered per subscriber before it lags.
const FINALITY_CHANNEL_CAPACITY: usize = 256;

/// Counters over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationStats {
    pub events_processed: u64,
    pub extrinsics_submitted: u64,
    pub extrinsics_rejected: u64,
    /// Cross-chain programs put on the network.
    pub messages_sent: u64,
    /// Messages addressed to a chain that does not exist.
    pub messages_dropped: u64,
    pub headers_relayed: u64,
    pub blocks_finalized: u64,
}

/// Runs a set of chains against one event queue.
///
/// Time only moves when an event is processed. Given the same
/// configuration and the same submissions at the same times, every run
/// produces the same blocks.
pub struct SimulationRunner {
    chains: BTreeMap<Location, ChainStateMachine>,
    queue: BTreeMap<EventKey, Event>,
    seq: u64,
    now: Duration,
    network: SimulatedNetwork,
    /// Block phase offsets.
    rng: ChaCha8Rng,
    /// Status channels of submitted extrinsics, until a terminal status.
    watchers: HashMap<RequestId, mpsc::UnboundedSender<TransactionStatus>>,
    finality: BTreeMap<Location, broadcast::Sender<BlockRef>>,
    next_request_id: RequestId,
    stats: SimulationStats,
}

impl std::fmt::Debug for SimulationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationRunner")
            .field("now", &self.now)
            .field("chains", &self.chains.keys().collect::<Vec<_>>())
            .field("queued", &self.queue.len())
            .field("watchers", &self.watchers.len())
            .finish()
    }
}

impl SimulationRunner {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let network = SimulatedNetwork::new(config.network, ChaCha8Rng::seed_from_u64(rng.gen()));
        let mut runner = Self {
            chains: BTreeMap::new(),
            queue: BTreeMap::new(),
            seq: 0,
            now: Duration::ZERO,
            network,
            rng,
            watchers: HashMap::new(),
            finality: BTreeMap::new(),
            next_request_id: RequestId(0),
            stats: SimulationStats::default(),
        };
        for (chain, genesis) in config.chains {
            runner.add_chain(chain, genesis)?;
        }
        Ok(runner)
    }

    /// Start a chain. Its first block is authored after a seeded phase
    /// offset within one block time.
    pub fn add_chain(
        &mut self,
        config: ChainConfig,
        genesis: Genesis,
    ) -> Result<(), SimulationError> {
        let location = config.location;
        if self.chains.contains_key(&location) {
            return Err(SimulationError::DuplicateChain(location));
        }
        let period = config.block_time.as_millis() as u64;
        let phase = if period == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(self.rng.gen_range(0..period))
        };
        debug!(chain = %config.name, %location, phase_ms = phase.as_millis() as u64, "Chain added");

        self.chains
            .insert(location, ChainStateMachine::new(config, genesis));
        self.finality
            .insert(location, broadcast::channel(FINALITY_CHANNEL_CAPACITY).0);
        self.schedule(self.now + phase, EventPriority::Timer, location, Event::BlockTimer);
        Ok(())
    }

    fn schedule(&mut self, time: Duration, priority: EventPriority, chain: Location, event: Event) {
        let key = EventKey {
            time,
            priority,
            chain,
            seq: self.seq,
        };
        self.seq += 1;
        self.queue.insert(key, event);
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn chain(&self, location: Location) -> Option<&ChainStateMachine> {
        self.chains.get(&location)
    }

    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.chains.keys().copied()
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Number of events waiting in the queue.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Time of the earliest queued event.
    pub fn next_event_time(&self) -> Option<Duration> {
        self.queue.keys().next().map(|key| key.time)
    }

    /// Receive every block `location` finalizes from now on.
    pub fn subscribe_finalized(&self, location: Location) -> Option<broadcast::Receiver<BlockRef>> {
        self.finality.get(&location).map(broadcast::Sender::subscribe)
    }

    /// Validate an extrinsic against the chain's best state and queue it.
    ///
    /// Statuses arrive on the returned channel until a terminal one.
    pub fn submit(
        &mut self,
        location: Location,
        extrinsic: Extrinsic,
    ) -> Result<(RequestId, mpsc::UnboundedReceiver<TransactionStatus>), SimulationError> {
        let chain = self
            .chains
            .get(&location)
            .ok_or(SimulationError::UnknownChain(location))?;
        if let Err(reason) = chain.validate_transaction(&extrinsic) {
            self.stats.extrinsics_rejected += 1;
            debug!(%location, call = extrinsic.call.name(), %reason, "Extrinsic rejected");
            return Err(SimulationError::Rejected { location, reason });
        }

        self.next_request_id = self.next_request_id.next();
        let request_id = self.next_request_id;
        let (tx, rx) = mpsc::unbounded_channel();
        self.watchers.insert(request_id, tx);
        self.stats.extrinsics_submitted += 1;
        trace!(%location, %request_id, call = extrinsic.call.name(), "Extrinsic submitted");
        self.schedule(
            self.now,
            EventPriority::Submission,
            location,
            Event::ExtrinsicSubmitted {
                request_id,
                extrinsic,
            },
        );
        Ok((request_id, rx))
    }

    /// Stop reporting statuses for `request_id`. The extrinsic itself stays
    /// in the pool.
    pub fn unwatch(&mut self, request_id: RequestId) {
        if self.watchers.remove(&request_id).is_some() {
            trace!(%request_id, "Watcher removed");
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Process the earliest event. Returns false if the queue is empty.
    pub fn step(&mut self) -> bool {
        let Some((key, event)) = self.queue.pop_first() else {
            return false;
        };
        self.now = key.time;
        self.stats.events_processed += 1;

        let Some(chain) = self.chains.get_mut(&key.chain) else {
            return true;
        };
        trace!(chain = %key.chain, event = event.type_name(), at = ?key.time, "Processing");
        chain.set_time(self.now);
        let actions = chain.handle(event);
        for action in actions {
            self.process_action(key.chain, action);
        }
        true
    }

    /// Process every event scheduled up to and including `end`, then move
    /// the clock to `end`.
    pub fn run_until(&mut self, end: Duration) {
        while self.next_event_time().is_some_and(|time| time <= end) {
            self.step();
        }
        self.now = self.now.max(end);
    }

    /// Run for `duration` of simulated time.
    pub fn run_for(&mut self, duration: Duration) {
        self.run_until(self.now + duration);
    }

    fn deliver(&mut self, from: Location, dest: Location, message: OutboundMessage) {
        if !self.chains.contains_key(&dest) {
            warn!(
                %from,
                %dest,
                kind = message.type_name(),
                "No chain at destination; message dropped"
            );
            self.stats.messages_dropped += 1;
            return;
        }
        let at = self.network.delivery_time(from, dest, self.now);
        let event = match message {
            OutboundMessage::Xcm(envelope) => {
                self.stats.messages_sent += 1;
                debug!(%from, %dest, hash = %envelope.message.hash(), "Message in flight");
                Event::XcmReceived(envelope)
            }
            OutboundMessage::Header(header) => {
                self.stats.headers_relayed += 1;
                Event::HeaderReceived(header)
            }
        };
        self.schedule(at, EventPriority::Delivery, dest, event);
    }

    fn process_action(&mut self, from: Location, action: Action) {
        match action {
            Action::SetTimer {
                id: TimerId::BlockProduction,
                duration,
            } => {
                self.schedule(self.now + duration, EventPriority::Timer, from, Event::BlockTimer);
            }

            Action::Send { dest, message } => self.deliver(from, dest, message),

            Action::Broadcast { message } => {
                let others: Vec<Location> = self
                    .chains
                    .keys()
                    .copied()
                    .filter(|location| *location != from)
                    .collect();
                for dest in others {
                    self.deliver(from, dest, message.clone());
                }
            }

            Action::EmitTransactionStatus { request_id, status } => {
                let Some(watcher) = self.watchers.get(&request_id) else {
                    return;
                };
                let terminal = status.is_terminal();
                trace!(%request_id, status = status.name(), "Status");
                if watcher.send(status).is_err() || terminal {
                    self.watchers.remove(&request_id);
                }
            }

            Action::BlockFinalized(block) => {
                self.stats.blocks_finalized += 1;
                trace!(chain = %from, %block, "Finalized");
                if let Some(finality) = self.finality.get(&from) {
                    // No subscribers is fine.
                    let _ = finality.send(block);
                }
            }
        }
    }
}

//! Deterministic multi-chain simulation.
//!
//! Runs relay, coretime and RegionX chains in one process and exposes each
//! through [`ChainApi`](xregion_protocol::ChainApi), so the protocol can be
//! exercised end to end. Given the same seed and the same submissions, every
//! run produces identical blocks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Event Queue (BTreeMap<EventKey, Event>)        │ │
//! │  │     Ordered by: time, priority, chain, sequence    │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     chains: BTreeMap<Location, ChainStateMachine>  │ │
//! │  │     Each processes events sequentially             │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → network delivery, timers, statuses,  │ │
//! │  │               finality notifications               │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────▲───────────────────────────┘
//!                               │ lock
//!            ┌──────────────────┴──────────────────┐
//!            │                                     │
//!     driver task (tokio time)          SimChain: ChainApi
//! ```

pub mod accounts;
mod client;
mod config;
mod driver;
mod error;
mod event_queue;
mod network;
mod runner;
mod scenario;

pub use client::SimChain;
pub use config::{
    coretime_genesis, regionx_genesis, relay_genesis, SimulationConfig, INITIAL_BALANCE,
    INITIAL_RELAY_TOKENS, SOVEREIGN_BALANCE,
};
pub use driver::Simulation;
pub use error::SimulationError;
pub use event_queue::{EventKey, EventPriority};
pub use network::{NetworkConfig, SimulatedNetwork};
pub use runner::{SimulationRunner, SimulationStats};
pub use scenario::{Scenario, CORETIME, REGIONX, RELAY};

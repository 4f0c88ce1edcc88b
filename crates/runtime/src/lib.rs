//! Runtime of the simulated chains.
//!
//! One [`ChainStateMachine`] per chain. Its [`ChainConfig::kind`] selects
//! which pallets exist:
//!
//! | kind       | pallets                                                          |
//! |------------|------------------------------------------------------------------|
//! | `Relay`    | balances, xcm, sudo, utility                                     |
//! | `Coretime` | + broker                                                         |
//! | `RegionX`  | + tokens, asset registry/rate, regions, orders, processor, ismp  |
//!
//! Pallets are plain functions over a [`Context`]; the ledger is a single
//! persistent map ([`Ledger`]) so per-block snapshots and per-dispatch
//! rollbacks are both O(1).

mod chain;
mod config;
mod context;
mod dispatch;
pub mod pallets;
mod storage;
mod validation;

pub use chain::{Block, ChainStateMachine};
pub use config::{ChainConfig, ChainKind, Genesis, Pallet, RELAY_BLOCK_TIME};
pub use context::{Context, Origin};
pub use dispatch::dispatch;
pub use storage::Ledger;
pub use validation::{charge, compute_fee, validate, FeeCharge};

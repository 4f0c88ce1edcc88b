//! Cross-chain region custody and the order market built on it.
//!
//! Everything here talks to chains only through [`ChainApi`]: submitting
//! calls, reading ledgers, fetching proofs and following finality.
//!
//! ```text
//!   ┌─────────────────────────────────────────────────────────────────┐
//!   │                          OrderMarket                            │
//!   │     create_order · contribute · fulfill_order · reassign        │
//!   └───────────────┬───────────────────────────────┬─────────────────┘
//!                   │                               │
//!   ┌───────────────▼──────────────┐   ┌────────────▼────────────────┐
//!   │         RegionCustody        │   │         AssetBridge         │
//!   │ transfer · request · resolve │   │ register · rate · bridge    │
//!   └──────┬──────────────┬────────┘   └──────┬───────────┬──────────┘
//!          │              │                   │           │
//!   ┌──────▼──────────────▼───────────────────▼──┐  ┌─────▼──────────┐
//!   │            TransactionSubmitter            │  │   Reconciler   │
//!   │   submit → InBlock → Finalized | Error     │  │ finalized-state│
//!   └──────────────────────┬─────────────────────┘  └─────┬──────────┘
//!                          │                              │
//!                   ┌──────▼──────────────────────────────▼──┐
//!                   │                ChainApi                │
//!                   └────────────────────────────────────────┘
//! ```
//!
//! No operation retries. Cross-chain effects are confirmed by observing
//! the receiving chain's finalized ledger through the [`Reconciler`];
//! nothing waits for a fixed delay.

mod api;
mod bridge;
mod config;
mod custody;
mod error;
mod market;
mod reconciler;
mod submitter;
mod tracker;

#[cfg(test)]
mod testing;

pub use api::{ChainApi, ChainError, Chains, TransactionWatch};
pub use bridge::{relay_balance_key, AssetBridge, BridgeReceipt};
pub use config::{ProtocolConfig, DEFAULT_REGION_TRANSFER_FEE};
pub use custody::{custody_key, RegionCustody, TransferReceipt};
pub use error::ProtocolError;
pub use market::{Fulfillment, OrderMarket};
pub use reconciler::{read_finalized, Reconciler};
pub use submitter::{Included, Outcome, TransactionSubmitter};
pub use tracker::{CustodyStatus, CustodyTracker};

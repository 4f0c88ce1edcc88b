//! Drives one submitted call to a terminal status.

use crate::{ChainApi, ProtocolError};
use tracing::{debug, info, warn};
use xregion_core::TransactionStatus;
use xregion_messages::{Call, Extrinsic, SubmitOptions};
use xregion_types::{AccountId, BlockRef, DispatchError, EventRecord, RuntimeEvent};

/// A successfully dispatched and finalized call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Included {
    pub block: BlockRef,
    /// Events the call deposited.
    pub events: Vec<EventRecord>,
}

impl Included {
    /// First event `f` maps to a value.
    pub fn find_event<T>(&self, f: impl Fn(&RuntimeEvent) -> Option<T>) -> Option<T> {
        self.events.iter().find_map(|record| f(&record.event))
    }
}

/// Terminal result of a submission that made it into a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Finalized(Included),
    /// Dispatch failed. Nothing but the fee was applied.
    Error { block: BlockRef, error: DispatchError },
}

impl Outcome {
    /// The inclusion, or the dispatch failure as a typed error.
    pub fn into_result(self) -> Result<Included, ProtocolError> {
        match self {
            Outcome::Finalized(included) => Ok(included),
            Outcome::Error { error, .. } => Err(ProtocolError::from_dispatch(error)),
        }
    }

    pub fn block(&self) -> BlockRef {
        match self {
            Outcome::Finalized(included) => included.block,
            Outcome::Error { block, .. } => *block,
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, Outcome::Finalized(_))
    }
}

/// Submits calls and waits for their outcome.
///
/// Each submission is attempted exactly once. The status subscription is
/// dropped on every exit path, including the returned future being dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionSubmitter;

impl TransactionSubmitter {
    pub fn new() -> Self {
        Self
    }

    /// Submit a signed call and wait until it is final or failed.
    ///
    /// A pool rejection is returned as an error immediately; it never
    /// reaches a block.
    pub async fn submit(
        &self,
        chain: &dyn ChainApi,
        signer: AccountId,
        call: Call,
        options: SubmitOptions,
    ) -> Result<Outcome, ProtocolError> {
        self.submit_extrinsic(chain, Extrinsic::signed(signer, call, options))
            .await
    }

    /// Submit an unsigned call.
    pub async fn submit_unsigned(
        &self,
        chain: &dyn ChainApi,
        call: Call,
    ) -> Result<Outcome, ProtocolError> {
        self.submit_extrinsic(chain, Extrinsic::unsigned(call)).await
    }

    /// Submit a signed call and require it to succeed.
    pub async fn execute(
        &self,
        chain: &dyn ChainApi,
        signer: AccountId,
        call: Call,
        options: SubmitOptions,
    ) -> Result<Included, ProtocolError> {
        self.submit(chain, signer, call, options).await?.into_result()
    }

    /// Submit `call` with superuser authority and require it to succeed.
    pub async fn execute_sudo(
        &self,
        chain: &dyn ChainApi,
        sudo: AccountId,
        call: Call,
    ) -> Result<Included, ProtocolError> {
        self.execute(chain, sudo, call.sudo(), SubmitOptions::default())
            .await
    }

    async fn submit_extrinsic(
        &self,
        chain: &dyn ChainApi,
        extrinsic: Extrinsic,
    ) -> Result<Outcome, ProtocolError> {
        let location = chain.location();
        let name = extrinsic.call.name();
        let mut watch = chain.submit(extrinsic).await.map_err(|err| {
            warn!(chain = %location, call = name, error = %err, "Submission rejected");
            ProtocolError::from(err)
        })?;
        let request_id = watch.request_id();
        debug!(chain = %location, call = name, %request_id, "Submitted");

        while let Some(status) = watch.next().await {
            match status {
                TransactionStatus::Ready => {}
                TransactionStatus::InBlock(block) => {
                    debug!(chain = %location, call = name, %request_id, %block, "In block");
                }
                TransactionStatus::Finalized { block, events } => {
                    info!(
                        chain = %location,
                        call = name,
                        %request_id,
                        height = block.height.0,
                        "Finalized"
                    );
                    return Ok(Outcome::Finalized(Included { block, events }));
                }
                TransactionStatus::Failed { block, error } => {
                    warn!(chain = %location, call = name, %request_id, %error, "Dispatch failed");
                    return Ok(Outcome::Error { block, error });
                }
                TransactionStatus::Invalid(invalid) => {
                    warn!(
                        chain = %location,
                        call = name,
                        %request_id,
                        %invalid,
                        "Dropped from pool"
                    );
                    return Err(ProtocolError::from_invalid(invalid));
                }
            }
        }
        Err(ProtocolError::SubscriptionClosed)
    }
}

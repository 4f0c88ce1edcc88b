//! Execution context for one block.

use crate::{ChainConfig, Ledger};
use std::time::Duration;
use xregion_messages::Xcm;
use xregion_types::{
    AccountId, BlockHeight, DispatchError, Location, RuntimeEvent, Timeslice,
};

/// Authority a call is dispatched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Superuser.
    Root,
    /// A signed extrinsic.
    Signed(AccountId),
    /// A cross-chain program acting for its sender.
    Xcm(Location),
    /// An unsigned extrinsic.
    None,
}

impl Origin {
    /// The signer, or `BadOrigin`.
    pub fn ensure_signed(&self) -> Result<AccountId, DispatchError> {
        match self {
            Origin::Signed(who) => Ok(*who),
            _ => Err(DispatchError::BadOrigin),
        }
    }

    /// Succeeds only for the superuser.
    pub fn ensure_root(&self) -> Result<(), DispatchError> {
        match self {
            Origin::Root => Ok(()),
            _ => Err(DispatchError::BadOrigin),
        }
    }

    /// Succeeds only for unsigned extrinsics.
    pub fn ensure_none(&self) -> Result<(), DispatchError> {
        match self {
            Origin::None => Ok(()),
            _ => Err(DispatchError::BadOrigin),
        }
    }

    /// Account acting for this origin: the signer, or the sovereign account
    /// of a remote sender.
    pub fn account(&self) -> Result<AccountId, DispatchError> {
        match self {
            Origin::Signed(who) => Ok(*who),
            Origin::Xcm(location) => Ok(location.sovereign_account()),
            Origin::Root | Origin::None => Err(DispatchError::BadOrigin),
        }
    }
}

/// Mutable state threaded through everything that runs inside a block.
///
/// Pallets read and write `ledger`, deposit events and queue outbound
/// programs here. [`Context::with_transaction`] gives every dispatch an
/// all-or-nothing view.
pub struct Context<'a> {
    pub config: &'a ChainConfig,
    pub ledger: Ledger,
    pub now: Duration,
    pub height: BlockHeight,
    events: Vec<RuntimeEvent>,
    outbox: Vec<(Location, Xcm)>,
}

impl<'a> Context<'a> {
    /// Start a block on top of `ledger`.
    pub fn new(
        config: &'a ChainConfig,
        ledger: Ledger,
        now: Duration,
        height: BlockHeight,
    ) -> Self {
        Self {
            config,
            ledger,
            now,
            height,
            events: Vec::new(),
            outbox: Vec::new(),
        }
    }

    /// Run `f`, discarding every ledger write, event and outbound program it
    /// produced if it fails.
    pub fn with_transaction<T, E>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let ledger = self.ledger.clone();
        let events = self.events.len();
        let outbox = self.outbox.len();

        let result = f(self);
        if result.is_err() {
            self.ledger = ledger;
            self.events.truncate(events);
            self.outbox.truncate(outbox);
        }
        result
    }

    /// Record an event.
    pub fn deposit_event(&mut self, event: RuntimeEvent) {
        self.events.push(event);
    }

    /// Queue a program for delivery once the block is sealed.
    pub fn send_xcm(&mut self, dest: Location, message: Xcm) {
        self.deposit_event(RuntimeEvent::XcmSent {
            dest,
            hash: message.hash(),
        });
        self.outbox.push((dest, message));
    }

    /// Events deposited since the last call.
    pub fn take_events(&mut self) -> Vec<RuntimeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Wall-clock seconds at block production.
    pub fn now_secs(&self) -> u64 {
        self.now.as_secs()
    }

    /// Timeslice at block production.
    pub fn current_timeslice(&self) -> Timeslice {
        self.config.timeslice_at(self.now)
    }

    /// Location of this chain.
    pub fn here(&self) -> Location {
        self.config.location
    }

    /// Close the block, returning the final ledger and outbound programs.
    pub fn finish(self) -> (Ledger, Vec<(Location, Xcm)>) {
        (self.ledger, self.outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xregion_types::{StorageKey, StorageValue};

    #[test]
    fn test_failed_transaction_discards_everything() {
        let config = ChainConfig::regionx();
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        ctx.deposit_event(RuntimeEvent::ExtrinsicSuccess);

        let result: Result<(), DispatchError> = ctx.with_transaction(|ctx| {
            ctx.ledger.insert(StorageKey::RequestNonce, StorageValue::Nonce(1));
            ctx.deposit_event(RuntimeEvent::Sudid);
            ctx.send_xcm(Location::Relay, Xcm(vec![]));
            Err(DispatchError::BadOrigin)
        });

        assert!(result.is_err());
        assert!(ctx.ledger.is_empty(), "ledger write should be reverted");
        assert_eq!(ctx.take_events(), vec![RuntimeEvent::ExtrinsicSuccess]);
        let (_, outbox) = ctx.finish();
        assert!(outbox.is_empty(), "outbound program should be dropped");
    }

    #[test]
    fn test_successful_transaction_keeps_writes() {
        let config = ChainConfig::regionx();
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        let result: Result<(), DispatchError> = ctx.with_transaction(|ctx| {
            ctx.ledger.insert(StorageKey::RequestNonce, StorageValue::Nonce(1));
            Ok(())
        });
        assert!(result.is_ok());
        assert_eq!(ctx.ledger.len(), 1);
    }

    #[test]
    fn test_origin_accounts() {
        let alice = AccountId::from_seed("//Alice");
        assert_eq!(Origin::Signed(alice).account(), Ok(alice));
        assert_eq!(
            Origin::Xcm(Location::Relay).account(),
            Ok(Location::Relay.sovereign_account())
        );
        assert_eq!(Origin::Root.account(), Err(DispatchError::BadOrigin));
        assert!(Origin::Root.ensure_root().is_ok());
        assert!(Origin::None.ensure_signed().is_err());
    }
}

//! The state machine abstraction every chain implements.

use crate::{Action, Event};
use std::time::Duration;

/// A chain as the runner sees it.
///
/// Chains do no I/O and keep no clock of their own. The runner sets the
/// time, feeds one [`Event`] at a time (block timer, submitted extrinsic,
/// inbound XCM, relayed header) and carries out the returned [`Action`]s.
/// Equal state and equal input give equal output, so a seeded run replays
/// exactly.
pub trait StateMachine {
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Called before every `handle`.
    fn set_time(&mut self, now: Duration);

    fn now(&self) -> Duration;
}

//! Core abstractions for chain state machines: [`Event`], [`Action`] and the
//! [`StateMachine`] trait, plus the types the runner uses to talk back to
//! clients.

mod action;
mod event;
mod message;
mod request;
mod status;
mod traits;

pub use action::{Action, TimerId};
pub use event::Event;
pub use message::OutboundMessage;
pub use request::RequestId;
pub use status::TransactionStatus;
pub use traits::StateMachine;

//! Delivery of one inbound message to every local mailbox it is addressed to
//!
//! This crate provides:
//! - Working out the delivery targets for an envelope (recipients, plus a
//!   copy in the sender's Sent folder)
//! - Receiving the message once and fanning it out to each target's Maildir
//! - Folding the per-target results into a single accept/reject outcome

mod config;
mod coordinator;
mod error;
mod outcome;
mod target;

pub use config::{DeliveryConfig, parse_forced_user};
pub use coordinator::DeliveryCoordinator;
pub use error::DeliveryError;
pub use outcome::{Outcome, TargetReport};
pub use target::{DeliveryTarget, targets_for};

//! State-change synchronizer for the Node Coordination Service.
//!
//! Owns the node registry together with a table of blocking waiters keyed by
//! `(node, target state)`. A transition updates the node and wakes every
//! waiter registered for that exact pair. A wait either returns at once
//! (the node is already in the target state) or suspends until a matching
//! transition fires.
//!
//! The check-then-register step and the transition-then-notify step both
//! run under the same mutex, so a transition can never slip between a
//! waiter's state check and its enrollment.

pub mod error;
pub mod synchronizer;
pub mod waiters;

pub use error::{Result, SyncError};
pub use synchronizer::{PendingWait, StateSynchronizer};

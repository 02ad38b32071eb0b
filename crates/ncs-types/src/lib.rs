//! Foundation types for the Node Coordination Service (NCS).
//!
//! This crate provides the identity, state, and metadata types shared by the
//! registry, the state synchronizer, and the HTTP surface. Every other NCS
//! crate depends on `ncs-types`.
//!
//! # Key Types
//!
//! - [`NodeId`] — Server-assigned, monotonically increasing node identity
//! - [`IdAllocator`] — Issues dense, zero-based, never-reused [`NodeId`]s
//! - [`NodeState`] — Opaque state label with the reserved `initial` and `killing`
//! - [`StateCatalog`] — The set of states a deployment recognizes
//! - [`NodeMetadata`] / [`Node`] — The authoritative stored entity

pub mod error;
pub mod id;
pub mod node;
pub mod state;

pub use error::TypeError;
pub use id::{IdAllocator, NodeId};
pub use node::{DataMap, MetadataObject, Node, NodeMetadata};
pub use state::{NodeState, StateCatalog};

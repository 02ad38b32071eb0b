//! Node registry for the Node Coordination Service.
//!
//! The registry owns the authoritative set of nodes. It validates creation
//! templates, assigns identities, stores per-node data, and answers filtered
//! and projected queries over node metadata.
//!
//! # Architecture
//!
//! - **Templates** are caller-supplied creation requests. They are validated
//!   in full before any identity is allocated, so a rejected template never
//!   changes the node set.
//! - **Nodes** are stored in an identity-keyed map. Identities come from an
//!   [`ncs_types::IdAllocator`] and are never reused.
//! - **Queries** filter by type, state and identity, then project metadata
//!   down to the requested attributes. Results are in identity order.
//!
//! The registry itself is not synchronized; the state synchronizer owns it
//! behind a single lock together with its waiter table.
//!
//! # Modules
//!
//! - [`error`] — Error types for registry operations
//! - [`template`] — [`NodeTemplate`] validation
//! - [`query`] — [`NodeQuery`] filters and projection
//! - [`registry`] — The [`NodeRegistry`] itself

pub mod error;
pub mod query;
pub mod registry;
pub mod template;

pub use error::{RegistryError, Result};
pub use query::NodeQuery;
pub use registry::NodeRegistry;
pub use template::NodeTemplate;

//! The authoritative, in-memory node set.
//!
//! [`NodeRegistry`] keys nodes by identity in a `BTreeMap`, so storage
//! position and identity are independent and listings come out in identity
//! order. It is a plain single-owner value:
//! callers that share it across tasks wrap it in a lock (the state
//! synchronizer does).

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, error};

use ncs_types::{
    IdAllocator, MetadataObject, Node, NodeId, NodeMetadata, NodeState, TypeError,
};

use crate::error::{RegistryError, Result};
use crate::query::NodeQuery;
use crate::template::NodeTemplate;

/// Owns every node and the allocator that names them.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    allocator: IdAllocator,
    nodes: BTreeMap<NodeId, Node>,
}

impl NodeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            allocator: IdAllocator::new(),
            nodes: BTreeMap::new(),
        }
    }

    /// Create a node from a validated template and return its identity.
    ///
    /// The node starts in [`NodeState::INITIAL`]; a `state` attribute in the
    /// template is overwritten.
    pub fn create(&mut self, template: NodeTemplate) -> Result<NodeId> {
        let (mut object, data) = template.into_parts();
        let id = self.allocator.next_id();
        object.insert(NodeMetadata::ID.into(), Value::String(id.to_string()));
        object.insert(
            NodeMetadata::STATE.into(),
            Value::String(NodeState::INITIAL.to_string()),
        );

        let metadata = Self::checked_metadata(object)?;
        debug_assert_eq!(metadata.id, id);
        debug!(id = %id, node_type = %metadata.node_type, parent = %metadata.parent, "node created");
        self.nodes.insert(id, Node { metadata, data });
        Ok(id)
    }

    /// Create every template in order, returning the identities issued.
    pub fn create_all<I>(&mut self, templates: I) -> Result<Vec<NodeId>>
    where
        I: IntoIterator<Item = NodeTemplate>,
    {
        templates.into_iter().map(|t| self.create(t)).collect()
    }

    /// Validate a raw JSON batch, then create all of it. A single invalid
    /// template rejects the batch before any identity is allocated.
    pub fn create_from_values<I>(&mut self, values: I) -> Result<Vec<NodeId>>
    where
        I: IntoIterator<Item = Value>,
    {
        let templates = NodeTemplate::from_values(values)?;
        self.create_all(templates)
    }

    /// Interpret metadata on the write path. Any failure here is a defect in
    /// the registry, since templates were validated before reaching it.
    fn checked_metadata(object: MetadataObject) -> Result<NodeMetadata> {
        NodeMetadata::from_object(object).map_err(|e| {
            error!(error = %e, "refusing to store node with invalid metadata");
            match e {
                TypeError::MissingMetadataAttribute(name) => {
                    RegistryError::MissingMetadataAttribute { name }
                }
                other => RegistryError::CorruptMetadata(other),
            }
        })
    }

    /// Returns `true` if a node with this identity exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.allocator.was_issued(id) && self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Result<&Node> {
        if !self.allocator.was_issued(id) {
            return Err(RegistryError::not_found(id));
        }
        self.nodes.get(&id).ok_or_else(|| RegistryError::not_found(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        if !self.allocator.was_issued(id) {
            return Err(RegistryError::not_found(id));
        }
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| RegistryError::not_found(id))
    }

    /// Current state of a node.
    pub fn state(&self, id: NodeId) -> Result<&NodeState> {
        self.get(id).map(Node::state)
    }

    /// Overwrite a node's state, returning the previous one.
    ///
    /// This only mutates the stored node. Waking waiters is the state
    /// synchronizer's job.
    pub fn set_state(&mut self, id: NodeId, state: NodeState) -> Result<NodeState> {
        let node = self.get_mut(id)?;
        let previous = std::mem::replace(&mut node.metadata.state, state);
        debug!(id = %id, from = %previous, to = %node.metadata.state, "node state changed");
        Ok(previous)
    }

    /// Metadata of every matching node, in identity order.
    pub fn query(&self, query: &NodeQuery) -> Vec<MetadataObject> {
        self.nodes
            .values()
            .filter(|node| query.matches(&node.metadata))
            .map(|node| query.project(&node.metadata))
            .collect()
    }

    /// Keys of a node's data, sorted.
    pub fn data_keys(&self, id: NodeId) -> Result<Vec<String>> {
        Ok(self.get(id)?.data.keys().cloned().collect())
    }

    pub fn get_data(&self, id: NodeId, key: &str) -> Result<&Value> {
        self.get(id)?
            .data
            .get(key)
            .ok_or_else(|| RegistryError::DataKeyNotFound {
                id,
                key: key.to_string(),
            })
    }

    /// Store a data value, returning the one it replaced.
    pub fn put_data(&mut self, id: NodeId, key: impl Into<String>, value: Value) -> Result<Option<Value>> {
        let node = self.get_mut(id)?;
        Ok(node.data.insert(key.into(), value))
    }

    /// The allocator that issued this registry's identities.
    pub fn allocator(&self) -> &IdAllocator {
        &self.allocator
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node was ever created.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

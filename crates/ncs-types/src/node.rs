use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::id::NodeId;
use crate::state::NodeState;

/// A JSON object holding node metadata attributes.
pub type MetadataObject = serde_json::Map<String, Value>;

/// Arbitrary key/value data attached to a node.
pub type DataMap = serde_json::Map<String, Value>;

/// Metadata of a stored node.
///
/// `id`, `type` and `parent` are fixed at creation. `state` is changed only
/// through the state synchronizer. Any other attributes supplied in the
/// creation template are kept verbatim in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    pub parent: String,
    pub state: NodeState,
    #[serde(flatten)]
    pub extra: MetadataObject,
}

impl NodeMetadata {
    pub const ID: &'static str = "id";
    pub const TYPE: &'static str = "type";
    pub const PARENT: &'static str = "parent";
    pub const STATE: &'static str = "state";

    /// Attributes every stored node carries.
    pub const REQUIRED: [&'static str; 3] = [Self::ID, Self::TYPE, Self::PARENT];

    /// Interpret a metadata object as stored node metadata.
    ///
    /// Fails with [`TypeError::MissingMetadataAttribute`] if `id`, `type` or
    /// `parent` is absent. A missing `state` means [`NodeState::INITIAL`].
    pub fn from_object(mut object: MetadataObject) -> Result<Self, TypeError> {
        for name in Self::REQUIRED {
            if !object.contains_key(name) {
                return Err(TypeError::MissingMetadataAttribute(name.to_string()));
            }
        }

        let id = match object.remove(Self::ID) {
            Some(Value::String(s)) => NodeId::parse(&s)?,
            Some(Value::Number(n)) => n
                .as_u64()
                .map(NodeId::from_raw)
                .ok_or_else(|| TypeError::InvalidNodeId(n.to_string()))?,
            _ => return Err(TypeError::InvalidMetadataAttribute(Self::ID.into())),
        };
        let node_type = take_string(&mut object, Self::TYPE)?;
        let parent = take_string(&mut object, Self::PARENT)?;
        let state = match object.remove(Self::STATE) {
            None => NodeState::INITIAL,
            Some(Value::String(s)) => NodeState::new(s)?,
            Some(_) => return Err(TypeError::InvalidMetadataAttribute(Self::STATE.into())),
        };

        Ok(Self {
            id,
            node_type,
            parent,
            state,
            extra: object,
        })
    }

    /// All attributes as a flat JSON object.
    pub fn to_object(&self) -> MetadataObject {
        let mut object = self.extra.clone();
        object.insert(Self::ID.into(), Value::String(self.id.to_string()));
        object.insert(Self::TYPE.into(), Value::String(self.node_type.clone()));
        object.insert(Self::PARENT.into(), Value::String(self.parent.clone()));
        object.insert(Self::STATE.into(), Value::String(self.state.to_string()));
        object
    }

    /// Only the named attributes, plus `id` which is always kept.
    /// Names that match no attribute are ignored.
    pub fn project(&self, fields: &BTreeSet<String>) -> MetadataObject {
        let mut object = self.to_object();
        object.retain(|key, _| key == Self::ID || fields.contains(key));
        object
    }
}

fn take_string(object: &mut MetadataObject, name: &str) -> Result<String, TypeError> {
    match object.remove(name) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(TypeError::InvalidMetadataAttribute(name.to_string())),
        None => Err(TypeError::MissingMetadataAttribute(name.to_string())),
    }
}

/// A registered unit of work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub metadata: NodeMetadata,
    #[serde(default)]
    pub data: DataMap,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.metadata.id
    }

    pub fn state(&self) -> &NodeState {
        &self.metadata.state
    }
}

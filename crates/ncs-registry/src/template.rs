//! Validation of node creation templates.
//!
//! A template is the caller's request to create a node:
//!
//! ```json
//! {
//!     "metadata": { "type": "<any type>", "parent": "<root | node id>" },
//!     "data": { }
//! }
//! ```
//!
//! The server assigns `id` and `state`; a template that carries an `id` is
//! rejected. `data` is optional and defaults to an empty object. Extra
//! metadata attributes are kept as-is.

use serde_json::Value;

use ncs_types::{DataMap, MetadataObject, NodeMetadata};

use crate::error::{RegistryError, Result};

/// A validated request to create a node.
///
/// Instances are only produced by [`NodeTemplate::new`] or by validating raw
/// JSON with [`NodeTemplate::from_value`], so every template in hand has a
/// string `type` and `parent` and no `id`.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeTemplate {
    metadata: MetadataObject,
    data: DataMap,
}

impl NodeTemplate {
    /// Attributes a template's metadata must carry.
    pub const REQUIRED: [&'static str; 2] = [NodeMetadata::TYPE, NodeMetadata::PARENT];

    /// Build a template with the two required attributes and no data.
    pub fn new(node_type: impl Into<String>, parent: impl Into<String>) -> Self {
        let mut metadata = MetadataObject::new();
        metadata.insert(NodeMetadata::TYPE.into(), Value::String(node_type.into()));
        metadata.insert(NodeMetadata::PARENT.into(), Value::String(parent.into()));
        Self {
            metadata,
            data: DataMap::new(),
        }
    }

    /// Attach a data entry.
    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Validate raw JSON as a template.
    ///
    /// Checks run in a fixed order and the first failure is reported:
    /// `metadata` present, `type` and `parent` present, no `id`, then the
    /// JSON types of `type`, `parent` and `data`.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut object) = value else {
            return Err(RegistryError::TemplateNotObject);
        };

        let metadata = match object.remove("metadata") {
            None => return Err(RegistryError::TemplateMissingMetadata),
            Some(Value::Object(metadata)) => metadata,
            Some(_) => {
                return Err(RegistryError::TemplateInvalidAttribute {
                    name: "metadata".into(),
                })
            }
        };

        for name in Self::REQUIRED {
            if !metadata.contains_key(name) {
                return Err(RegistryError::TemplateMissingAttribute { name: name.into() });
            }
        }
        if metadata.contains_key(NodeMetadata::ID) {
            return Err(RegistryError::TemplateContainsIdentity);
        }
        for name in Self::REQUIRED {
            if !metadata.get(name).is_some_and(Value::is_string) {
                return Err(RegistryError::TemplateInvalidAttribute { name: name.into() });
            }
        }

        let data = match object.remove("data") {
            None | Some(Value::Null) => DataMap::new(),
            Some(Value::Object(data)) => data,
            Some(_) => {
                return Err(RegistryError::TemplateInvalidAttribute {
                    name: "data".into(),
                })
            }
        };

        Ok(Self { metadata, data })
    }

    /// Validate a whole batch. The first invalid template fails the batch.
    pub fn from_values<I>(values: I) -> Result<Vec<Self>>
    where
        I: IntoIterator<Item = Value>,
    {
        values.into_iter().map(Self::from_value).collect()
    }

    pub fn node_type(&self) -> &str {
        self.metadata
            .get(NodeMetadata::TYPE)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn parent(&self) -> &str {
        self.metadata
            .get(NodeMetadata::PARENT)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn data(&self) -> &DataMap {
        &self.data
    }

    pub(crate) fn into_parts(self) -> (MetadataObject, DataMap) {
        (self.metadata, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_minimal_template() {
        let t = NodeTemplate::from_value(json!({
            "metadata": { "type": "job", "parent": "root" }
        }))
        .unwrap();
        assert_eq!(t.node_type(), "job");
        assert_eq!(t.parent(), "root");
        assert!(t.data().is_empty());
    }

    #[test]
    fn keeps_data_and_extra_metadata() {
        let t = NodeTemplate::from_value(json!({
            "metadata": { "type": "job", "parent": "0", "queue": "gpu" },
            "data": { "cmd": "make" }
        }))
        .unwrap();
        assert_eq!(t.data().get("cmd"), Some(&json!("make")));
        let (metadata, _) = t.into_parts();
        assert_eq!(metadata.get("queue"), Some(&json!("gpu")));
    }

    #[test]
    fn rejects_missing_metadata() {
        let err = NodeTemplate::from_value(json!({ "data": {} })).unwrap_err();
        assert_eq!(err, RegistryError::TemplateMissingMetadata);
    }

    #[test]
    fn rejects_missing_attribute_by_name() {
        let err = NodeTemplate::from_value(json!({ "metadata": { "type": "job" } })).unwrap_err();
        assert_eq!(
            err,
            RegistryError::TemplateMissingAttribute { name: "parent".into() }
        );

        let err = NodeTemplate::from_value(json!({ "metadata": { "parent": "root" } })).unwrap_err();
        assert_eq!(
            err,
            RegistryError::TemplateMissingAttribute { name: "type".into() }
        );
    }

    #[test]
    fn rejects_identity() {
        let err = NodeTemplate::from_value(json!({
            "metadata": { "type": "job", "parent": "root", "id": "9" }
        }))
        .unwrap_err();
        assert_eq!(err, RegistryError::TemplateContainsIdentity);
    }

    #[test]
    fn missing_attribute_is_reported_before_identity() {
        let err = NodeTemplate::from_value(json!({
            "metadata": { "type": "job", "id": "9" }
        }))
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::TemplateMissingAttribute { name: "parent".into() }
        );
    }

    #[test]
    fn rejects_wrongly_typed_values() {
        assert_eq!(
            NodeTemplate::from_value(json!([])).unwrap_err(),
            RegistryError::TemplateNotObject
        );
        assert_eq!(
            NodeTemplate::from_value(json!({ "metadata": "job" })).unwrap_err(),
            RegistryError::TemplateInvalidAttribute { name: "metadata".into() }
        );
        assert_eq!(
            NodeTemplate::from_value(json!({ "metadata": { "type": 1, "parent": "root" } }))
                .unwrap_err(),
            RegistryError::TemplateInvalidAttribute { name: "type".into() }
        );
        assert_eq!(
            NodeTemplate::from_value(json!({
                "metadata": { "type": "job", "parent": "root" },
                "data": [1, 2]
            }))
            .unwrap_err(),
            RegistryError::TemplateInvalidAttribute { name: "data".into() }
        );
    }

    #[test]
    fn batch_fails_on_first_invalid_template() {
        let err = NodeTemplate::from_values(vec![
            json!({ "metadata": { "type": "job", "parent": "root" } }),
            json!({ "metadata": { "type": "job", "parent": "root", "id": "1" } }),
            json!({}),
        ])
        .unwrap_err();
        assert_eq!(err, RegistryError::TemplateContainsIdentity);
    }
}

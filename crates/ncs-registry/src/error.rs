//! Error types for registry operations.

use thiserror::Error;

use ncs_types::{NodeId, TypeError};

/// Errors that can occur during registry operations.
///
/// Most variants describe bad caller input. [`RegistryError::MissingMetadataAttribute`]
/// and [`RegistryError::CorruptMetadata`] instead mean the registry's own
/// write path produced a node it should have refused; see
/// [`RegistryError::is_internal`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A template was not a JSON object.
    #[error("Node template is not an object.")]
    TemplateNotObject,

    /// A template has no `metadata` attribute.
    #[error("Missing metadata.")]
    TemplateMissingMetadata,

    /// A template's metadata lacks a required attribute.
    #[error("Missing metadata attribute \"{name}\".")]
    TemplateMissingAttribute { name: String },

    /// A template attribute has the wrong JSON type.
    #[error("Metadata attribute \"{name}\" is not valid.")]
    TemplateInvalidAttribute { name: String },

    /// A template tried to choose its own identity.
    #[error("Node template must not contain an id.")]
    TemplateContainsIdentity,

    /// No node with this identity was ever issued.
    #[error("ID \"{id}\" does not exist")]
    NotFound { id: String },

    /// The node exists but has no data under this key.
    #[error("Key \"{key}\" does not exist")]
    DataKeyNotFound { id: NodeId, key: String },

    /// A query parameter the operation does not support.
    #[error("Unsupported parameter \"{name}\"")]
    UnsupportedParameter { name: String },

    /// A query parameter whose value could not be interpreted.
    #[error("Requested {name} param \"{value}\" is not valid.")]
    InvalidParameter { name: String, value: String },

    /// A node about to be stored lacks a required metadata attribute.
    #[error("internal error: missing metadata attribute \"{name}\"")]
    MissingMetadataAttribute { name: String },

    /// A node about to be stored has malformed metadata.
    #[error("internal error: corrupt metadata: {0}")]
    CorruptMetadata(TypeError),
}

impl RegistryError {
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    /// Returns `true` if this error signals a defect in the registry rather
    /// than bad input from the caller.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::MissingMetadataAttribute { .. } | Self::CorruptMetadata(_)
        )
    }

    /// Returns `true` if the error names something that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::DataKeyNotFound { .. })
    }
}

/// Convenience type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_are_distinguished() {
        assert!(RegistryError::MissingMetadataAttribute { name: "id".into() }.is_internal());
        assert!(RegistryError::CorruptMetadata(TypeError::InvalidNodeId("x".into())).is_internal());
        assert!(!RegistryError::TemplateMissingMetadata.is_internal());
        assert!(!RegistryError::not_found(3).is_internal());
    }

    #[test]
    fn messages_name_the_offending_value() {
        let err = RegistryError::TemplateMissingAttribute { name: "parent".into() };
        assert_eq!(err.to_string(), "Missing metadata attribute \"parent\".");
        assert_eq!(RegistryError::not_found("7").to_string(), "ID \"7\" does not exist");
        let err = RegistryError::UnsupportedParameter { name: "foo".into() };
        assert_eq!(err.to_string(), "Unsupported parameter \"foo\"");
    }
}

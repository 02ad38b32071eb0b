use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid node id: {0:?}")]
    InvalidNodeId(String),

    #[error("invalid state label: {0:?}")]
    InvalidState(String),

    #[error("state is not recognized: {0:?}")]
    UnrecognizedState(String),

    #[error("missing metadata attribute \"{0}\"")]
    MissingMetadataAttribute(String),

    #[error("metadata attribute \"{0}\" has the wrong type")]
    InvalidMetadataAttribute(String),
}

use ncs_registry::RegistryError;

/// Errors produced by the state synchronizer.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A registry operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A transition or wait named an identity that was never issued.
    #[error("Provided id \"{0}\" is not valid.")]
    UnknownNode(String),

    /// A transition or wait named a state the deployment does not recognize.
    #[error("Provided state \"{0}\" is not valid.")]
    UnrecognizedState(String),

    /// The synchronizer was shut down while the caller was waiting.
    #[error("state synchronizer is shut down")]
    Closed,

    /// Shared state is unusable (a lock was poisoned).
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Returns `true` if this error signals a server-side defect rather than
    /// bad caller input.
    pub fn is_internal(&self) -> bool {
        match self {
            Self::Registry(e) => e.is_internal(),
            Self::Internal(_) => true,
            _ => false,
        }
    }
}

/// Convenience alias used throughout the synchronizer crate.
pub type Result<T> = std::result::Result<T, SyncError>;

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ncs_types::StateCatalog;

use crate::error::{ServerError, ServerResult};

/// Server configuration, usually read from a TOML file.
///
/// Every field has a default, so a file only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Deadline for `/scheduler/wait`, in seconds. `0` waits forever.
    pub wait_timeout_secs: u64,
    /// Recognized states. Absent means any well-formed state is accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            wait_timeout_secs: 300,
            states: None,
        }
    }
}

impl ServerConfig {
    /// Read a configuration file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        (self.wait_timeout_secs > 0).then(|| Duration::from_secs(self.wait_timeout_secs))
    }

    /// The state catalog this configuration describes.
    pub fn state_catalog(&self) -> ServerResult<StateCatalog> {
        match self.states {
            None => Ok(StateCatalog::open()),
            Some(ref labels) => StateCatalog::closed_from_labels(labels.iter().cloned())
                .map_err(|e| ServerError::Config(e.to_string())),
        }
    }
}

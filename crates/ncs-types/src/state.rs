use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Longest accepted state label, in bytes.
pub const MAX_STATE_LEN: usize = 64;

/// The state of a node.
///
/// States are opaque labels. Two are reserved: [`NodeState::INITIAL`], which
/// every node starts in, and [`NodeState::KILLING`], which a kill request
/// sets. Everything else (`running`, `done`, ...) is defined by the
/// orchestrator and workers. Labels are restricted to ASCII alphanumerics,
/// `_`, `-` and `.`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NodeState(Cow<'static, str>);

impl NodeState {
    pub const INITIAL: NodeState = NodeState(Cow::Borrowed("initial"));
    pub const KILLING: NodeState = NodeState(Cow::Borrowed("killing"));

    /// Validate and wrap a state label.
    pub fn new(label: impl Into<String>) -> Result<Self, TypeError> {
        let label = label.into();
        let well_formed = !label.is_empty()
            && label.len() <= MAX_STATE_LEN
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));
        if !well_formed {
            return Err(TypeError::InvalidState(label));
        }
        Ok(Self(Cow::Owned(label)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<NodeState> for String {
    fn from(state: NodeState) -> Self {
        state.0.into_owned()
    }
}

impl TryFrom<String> for NodeState {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl fmt::Debug for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeState({})", self.0)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The set of states a deployment recognizes as transition and wait targets.
///
/// An open catalog accepts every well-formed label. A closed catalog accepts
/// only the labels it was built with plus the reserved states.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StateCatalog {
    #[default]
    Open,
    Closed(BTreeSet<NodeState>),
}

impl StateCatalog {
    pub fn open() -> Self {
        Self::Open
    }

    /// Build a closed catalog. The reserved states are always included.
    pub fn closed<I>(states: I) -> Self
    where
        I: IntoIterator<Item = NodeState>,
    {
        let mut set: BTreeSet<NodeState> = states.into_iter().collect();
        set.insert(NodeState::INITIAL);
        set.insert(NodeState::KILLING);
        Self::Closed(set)
    }

    /// Build a closed catalog from raw labels, validating each one.
    pub fn closed_from_labels<I, S>(labels: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let states = labels
            .into_iter()
            .map(NodeState::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::closed(states))
    }

    pub fn recognizes(&self, state: &NodeState) -> bool {
        match self {
            Self::Open => true,
            Self::Closed(set) => set.contains(state),
        }
    }

    /// Parse a label and check it against the catalog.
    pub fn parse(&self, label: &str) -> Result<NodeState, TypeError> {
        let state = NodeState::new(label)?;
        if !self.recognizes(&state) {
            return Err(TypeError::UnrecognizedState(label.to_string()));
        }
        Ok(state)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

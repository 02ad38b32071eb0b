use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Server-assigned identity of a node.
///
/// Identities are issued by an [`IdAllocator`] and are never reused. On the
/// wire (and inside node metadata) an identity is the decimal string form of
/// the underlying integer, e.g. `"0"`, `"17"`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NodeId(u64);

impl NodeId {
    /// Create from a raw integer. Use an [`IdAllocator`] in production code.
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// The raw integer value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Parse the decimal string form. Surrounding whitespace is tolerated,
    /// signs, fractions and exponents are not.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypeError::InvalidNodeId(s.to_string()));
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidNodeId(s.to_string()))
    }

    /// Parse a comma separated list of identities, e.g. `"0,3,7"`.
    ///
    /// Empty entries are skipped. The first malformed entry fails the whole
    /// list.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, TypeError> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}

impl FromStr for NodeId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0.to_string()
    }
}

impl TryFrom<String> for NodeId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues node identities.
///
/// Identities are dense, zero-based, strictly increasing, and never reused.
/// Storage must still key nodes by identity explicitly rather than treating
/// the identity as a position.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    /// The value the next call to [`IdAllocator::next_id`] returns.
    next: u64,
}

impl IdAllocator {
    /// First identity ever issued.
    pub const INITIAL: u64 = 0;

    pub fn new() -> Self {
        Self {
            next: Self::INITIAL,
        }
    }

    /// Issue the next identity.
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// The highest identity issued so far, or `None` before the first one.
    pub fn highest(&self) -> Option<NodeId> {
        self.next.checked_sub(1).map(NodeId)
    }

    /// Returns `true` iff `id` was returned by an earlier [`IdAllocator::next_id`].
    pub fn was_issued(&self, id: NodeId) -> bool {
        (Self::INITIAL..self.next).contains(&id.0)
    }
}

//! Filters and projection for node listing.
//!
//! A [`NodeQuery`] is built either programmatically or from raw request
//! parameters with [`NodeQuery::from_params`]. Filters compose as a logical
//! AND; a filter that is not set does not constrain the result.

use std::collections::BTreeSet;

use ncs_types::{MetadataObject, NodeMetadata};

use crate::error::{RegistryError, Result};

/// Parameter names understood by [`NodeQuery::from_params`].
pub mod params {
    pub const TYPE: &str = "type";
    pub const STATE: &str = "state";
    pub const NEWER_THAN: &str = "newerThan";
    pub const FIELDS: &str = "fields";
    /// Older spelling of [`NEWER_THAN`].
    pub const NEW: &str = "new";
    /// Older spelling of [`FIELDS`].
    pub const METADATA: &str = "metadata";

    pub const ALL: [&str; 6] = [TYPE, STATE, NEWER_THAN, FIELDS, NEW, METADATA];
}

/// Filters and projection for listing node metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeQuery {
    /// Keep nodes whose type is one of these.
    pub types: Option<BTreeSet<String>>,
    /// Keep nodes whose state is one of these.
    pub states: Option<BTreeSet<String>>,
    /// Keep nodes whose identity is strictly greater than this.
    pub newer_than: Option<i64>,
    /// Project metadata down to these attributes (plus `id`).
    pub fields: Option<BTreeSet<String>>,
}

impl NodeQuery {
    /// A query that matches every node and returns full metadata.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.states = Some(states.into_iter().map(Into::into).collect());
        self
    }

    pub fn newer_than(mut self, id: i64) -> Self {
        self.newer_than = Some(id);
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Build a query from raw `key=value` request parameters.
    ///
    /// Set-valued parameters are comma separated; empty entries are dropped
    /// and an empty set leaves that filter unset. Unknown keys are rejected
    /// rather than ignored, as is a `newerThan` that is not an integer.
    pub fn from_params<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                params::TYPE => query.types = split_set(value),
                params::STATE => query.states = split_set(value),
                params::NEWER_THAN | params::NEW => {
                    let limit = value.trim().parse::<i64>().map_err(|_| {
                        RegistryError::InvalidParameter {
                            name: key.to_string(),
                            value: value.to_string(),
                        }
                    })?;
                    query.newer_than = Some(limit);
                }
                params::FIELDS | params::METADATA => query.fields = split_set(value),
                other => {
                    return Err(RegistryError::UnsupportedParameter {
                        name: other.to_string(),
                    })
                }
            }
        }
        Ok(query)
    }

    /// Returns `true` if the node passes every filter that is set.
    pub fn matches(&self, metadata: &NodeMetadata) -> bool {
        if let Some(ref types) = self.types {
            if !types.contains(&metadata.node_type) {
                return false;
            }
        }
        if let Some(ref states) = self.states {
            if !states.contains(metadata.state.as_str()) {
                return false;
            }
        }
        if let Some(limit) = self.newer_than {
            if i128::from(metadata.id.value()) <= i128::from(limit) {
                return false;
            }
        }
        true
    }

    /// The metadata view this query asks for.
    pub fn project(&self, metadata: &NodeMetadata) -> MetadataObject {
        match self.fields {
            Some(ref fields) => metadata.project(fields),
            None => metadata.to_object(),
        }
    }
}

fn split_set(value: &str) -> Option<BTreeSet<String>> {
    let set: BTreeSet<String> = value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    (!set.is_empty()).then_some(set)
}

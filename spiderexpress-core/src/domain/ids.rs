// spiderexpress-core/src/domain/ids.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// The only cross-component identity: an opaque, case-sensitive node
/// identifier. Two `NodeId`s are equal iff their raw strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// A named sub-graph with its own connector, router, sampler and tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerName(String);

impl LayerName {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for LayerName {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for LayerName {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_is_case_sensitive() {
        assert_ne!(NodeId::from("Alice"), NodeId::from("alice"));
    }

    #[test]
    fn node_id_display_roundtrips() {
        let id = NodeId::from("bob");
        assert_eq!(format!("{id}"), "bob");
    }
}

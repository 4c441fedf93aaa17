//! Node identity for the consistent hash ring.
//!
//! The ring never owns a cache server; it only stores the server's stable
//! identifier (typically a `host:port` address) and hands it back on lookup.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Opaque, non-empty identifier of a physical node.
///
/// Identifiers are ordered lexically (byte order of the UTF-8 string). When
/// two nodes land on the same token, the smaller identifier owns it.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node identifier, rejecting the empty string.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::invalid("node identifier must not be empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl TryFrom<String> for NodeId {
    type Error = Error;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id)
    }
}

impl TryFrom<&str> for NodeId {
    type Error = Error;

    fn try_from(id: &str) -> Result<Self> {
        Self::new(id)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_id() {
        assert!(matches!(NodeId::new(""), Err(Error::InvalidArgument(_))));
        assert!(NodeId::try_from("").is_err());
    }

    #[test]
    fn lexical_order() {
        let a = NodeId::new("10.0.0.1:11211").unwrap();
        let b = NodeId::new("10.0.0.2:11211").unwrap();
        assert!(a < b);
        assert_eq!(a, "10.0.0.1:11211");
        assert_eq!(a.to_string(), "10.0.0.1:11211");
    }

    #[test]
    fn serde_round_trip_validates() {
        let id: NodeId = serde_json::from_str("\"cache-1\"").unwrap();
        assert_eq!(id.as_str(), "cache-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"cache-1\"");
        assert!(serde_json::from_str::<NodeId>("\"\"").is_err());
    }
}

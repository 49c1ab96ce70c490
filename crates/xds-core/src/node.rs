//! Consumer keys for published snapshots.

use std::fmt;
use std::hash::{Hash, Hasher};

use fnv::FnvHasher;

/// Key under which a snapshot is published.
///
/// The ingress publishes every snapshot under one fixed key derived from a
/// configured node id, so every connected proxy sees the same
/// configuration. The wildcard key is reserved for stores that are not
/// partitioned by consumer at all, such as the endpoint store of the split
/// design.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeHash {
    hash: u64,
    is_wildcard: bool,
}

impl NodeHash {
    const WILDCARD_HASH: u64 = 0;

    /// Hash a node id with FNV-1a.
    #[must_use]
    pub fn from_id(node_id: &str) -> Self {
        let mut hasher = FnvHasher::default();
        node_id.hash(&mut hasher);
        let hash = match hasher.finish() {
            Self::WILDCARD_HASH => 1,
            hash => hash,
        };
        Self {
            hash,
            is_wildcard: false,
        }
    }

    /// The key shared by all consumers.
    #[must_use]
    pub fn wildcard() -> Self {
        Self {
            hash: Self::WILDCARD_HASH,
            is_wildcard: true,
        }
    }

    /// Whether this is the wildcard key.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.is_wildcard
    }

    /// Raw hash value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.hash
    }
}

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wildcard {
            f.write_str("<wildcard>")
        } else {
            write!(f, "{:016x}", self.hash)
        }
    }
}

impl Default for NodeHash {
    fn default() -> Self {
        Self::wildcard()
    }
}

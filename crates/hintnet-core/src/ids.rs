//! Node and content identifiers
//!
//! Both identifiers are opaque newtypes: the engine only ever hashes and
//! compares them. Topology builders assign node ids densely from zero;
//! content ids come from the workload generator.

use serde::{Deserialize, Serialize};

/// Logical event time.
///
/// Supplied by the calling harness, monotonically non-decreasing across
/// events. No wall-clock semantics attach to it.
pub type SimTime = f64;

/// Unique identifier for a node in the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Generate node ids `0..n`
    pub fn range(n: u32) -> Vec<Self> {
        (0..n).map(NodeId).collect()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Unique identifier for a content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentId(pub u64);

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_range() {
        let ids = NodeId::range(3);
        assert_eq!(ids, vec![NodeId(0), NodeId(1), NodeId(2)]);
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeId(7).to_string(), "n7");
        assert_eq!(ContentId(42).to_string(), "c42");
    }
}

//! Pending forward bookkeeping for metacaching-on-evict
//!
//! When a strategy decides, at request time, that a node should hand an
//! evicted content onward, the decision is parked here and consumed exactly
//! once on the delivery pass. The map is keyed by `(node, content)`; a
//! second take for the same key yields nothing.

use std::collections::HashMap;

use hintnet_core::{ContentId, NodeId};

/// Deferred `(node, content) -> nexthop` forwarding decisions
#[derive(Debug, Clone, Default)]
pub struct PendingForwards {
    map: HashMap<(NodeId, ContentId), NodeId>,
}

impl PendingForwards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Park a forwarding decision. A later decision for the same key
    /// overwrites the earlier one.
    pub fn insert(&mut self, node: NodeId, content: ContentId, nexthop: NodeId) {
        self.map.insert((node, content), nexthop);
    }

    /// Consume the decision for `(node, content)`, if one is parked
    pub fn take(&mut self, node: NodeId, content: ContentId) -> Option<NodeId> {
        self.map.remove(&(node, content))
    }

    /// Read without consuming
    pub fn peek(&self, node: NodeId, content: ContentId) -> Option<NodeId> {
        self.map.get(&(node, content)).copied()
    }

    /// Consume every parked decision
    pub fn drain(&mut self) -> Vec<((NodeId, ContentId), NodeId)> {
        self.map.drain().collect()
    }
}

//! The view/controller boundary
//!
//! Strategies never own the graph, the caches, or the hint stores. They
//! read network state through [`NetworkView`] and actuate it through
//! [`NetworkController`]. The split keeps the decision engine testable
//! against any backing model and makes every mutation auditable at one
//! seam.
//!
//! All mutation goes through `&mut self`: one request is processed at a
//! time per network instance, so the model needs no interior locking.

use hintnet_core::{ContentId, NodeId, SimTime, StrategyResult};
use hintnet_routing::{HintEntry, HintKey, RankedHint};

/// Read-only view of network state
pub trait NetworkView {
    /// BFS shortest path between two nodes, inclusive of both endpoints
    fn shortest_path(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>>;

    /// Neighbors of a node in ascending order
    fn neighbors(&self, node: NodeId) -> Vec<NodeId>;

    /// The designated origin server of a content
    fn content_source(&self, content: ContentId) -> Option<NodeId>;

    /// Every node currently holding a copy: caches first, then the source
    fn content_locations(&self, content: ContentId) -> Vec<NodeId>;

    /// Whether a node has a content cache
    fn has_cache(&self, node: NodeId) -> bool;

    /// Cache-capable nodes in ascending order
    fn cache_nodes(&self) -> Vec<NodeId>;

    /// Capacity of a node's cache, if it has one
    fn cache_capacity(&self, node: NodeId) -> Option<usize>;

    /// Check a cache for a content without touching recency or stats
    fn cache_peek(&self, node: NodeId, content: ContentId) -> bool;

    /// Delay of the direct link between two neighbors
    fn link_delay(&self, u: NodeId, v: NodeId) -> Option<f64>;

    /// Sum of link delays along a path
    fn path_delay(&self, path: &[NodeId]) -> f64;

    /// Hop-count diameter of the topology
    fn topology_diameter(&self) -> u32;

    /// Betweenness centrality of a node (full Brandes)
    fn betweenness(&self, node: NodeId) -> f64;

    /// Ego-graph betweenness of a node
    fn ego_betweenness(&self, node: NodeId) -> f64;

    /// Logical time of the session being processed
    fn now(&self) -> SimTime;

    /// Content of the session being processed
    fn session_content(&self) -> ContentId;
}

/// Mutating surface through which strategies actuate the network
pub trait NetworkController: NetworkView {
    /// Open a request session. All forwarding and cache calls until
    /// [`end_session`](NetworkController::end_session) belong to it.
    fn start_session(&mut self, time: SimTime, receiver: NodeId, content: ContentId, log: bool);

    /// Close the session, folding its counters into the cumulative stats
    fn end_session(&mut self, success: bool);

    /// Forward the request along a whole path.
    ///
    /// `main_path` is false for replicated or multicast branches.
    fn forward_request_path(&mut self, path: &[NodeId], main_path: bool);

    /// Forward the request one hop
    fn forward_request_hop(&mut self, u: NodeId, v: NodeId, main_path: bool);

    /// Forward the content along a whole path
    fn forward_content_path(&mut self, path: &[NodeId], main_path: bool);

    /// Forward the content one hop
    fn forward_content_hop(&mut self, u: NodeId, v: NodeId, main_path: bool);

    /// Attempt to retrieve the session content at a node.
    ///
    /// True on a cache hit (promoting the content) or at the content's
    /// source. False means a miss; misses are ordinary control flow.
    fn get_content(&mut self, node: NodeId) -> bool;

    /// Insert the session content into a node's cache.
    ///
    /// Returns the evicted content, if the insertion displaced one. A node
    /// without a cache ignores the call.
    fn put_content(&mut self, node: NodeId) -> Option<ContentId>;

    /// Remove the session content from a node's cache
    fn remove_content(&mut self, node: NodeId) -> bool;

    /// Insert an arbitrary content into a node's cache, outside the
    /// session accounting. Used when an evicted copy is handed onward.
    /// Returns the displaced content, if any.
    fn cache_insert(&mut self, node: NodeId, content: ContentId) -> Option<ContentId>;

    /// The per-content hint entry of a node, if it exists
    fn hint_entry(&mut self, node: NodeId, content: ContentId) -> Option<&mut HintEntry>;

    /// The per-content hint entry of a node, created with the given
    /// windows if absent
    fn hint_entry_or_insert(
        &mut self,
        node: NodeId,
        content: ContentId,
        fresh_window: SimTime,
        expiry_ttl: SimTime,
    ) -> &mut HintEntry;

    /// Drop a node's entire hint entry for a content
    fn remove_hint_entry(&mut self, node: NodeId, content: ContentId) -> bool;

    /// Invalidate every link of a trail for a content: at each trail node
    /// the hint toward its successor is deleted, and entries left empty are
    /// dropped. A link with no backing hint is a bookkeeping error.
    fn invalidate_trail(&mut self, trail: &[NodeId], content: ContentId) -> StrategyResult<()>;

    /// Read a node's ranked hint without promoting it
    fn ranked_peek(&mut self, node: NodeId, key: &HintKey) -> Option<RankedHint>;

    /// Read a node's ranked hint, promoting it to the hot position
    fn ranked_touch(&mut self, node: NodeId, key: &HintKey) -> Option<RankedHint>;

    /// Insert or refresh a node's ranked hint; returns the evicted key
    fn ranked_put(&mut self, node: NodeId, key: HintKey, nexthop: NodeId) -> Option<HintKey>;

    /// Remove a node's ranked hint
    fn ranked_remove(&mut self, node: NodeId, key: &HintKey);

    /// Recency position of a key in a node's ranked table
    fn ranked_position(&self, node: NodeId, key: &HintKey) -> Option<usize>;

    /// Exploration quota of a position in a node's ranked table
    fn ranked_quota(&self, node: NodeId, pos: usize) -> f64;

    /// Feed a detour outcome back into a position's AIMD quota
    fn ranked_record(&mut self, node: NodeId, pos: usize, success: bool, quota_increment: f64);

    /// Report the cost and outcome of one off-path detour for telemetry
    fn record_detour(&mut self, cost: f64, success: bool);
}

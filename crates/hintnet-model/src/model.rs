//! In-memory network model
//!
//! [`InMemoryNetwork`] is the single concrete backing for the
//! view/controller boundary: topology, per-node LRU caches, per-node hint
//! stores, and one open session at a time. It also keeps a session trace
//! (optional) and cumulative counters, so tests can assert on exactly
//! which hops and cache operations a strategy issued.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use hintnet_core::{ContentId, NodeId, SimTime, StrategyError, StrategyResult};
use hintnet_routing::{HintEntry, HintKey, RankedHint, RankedHintTable};

use crate::cache::LruCache;
use crate::network::{NetworkController, NetworkView};
use crate::topology::Topology;

/// One observable action taken against the network model
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    SessionStart {
        time: SimTime,
        receiver: NodeId,
        content: ContentId,
    },
    RequestHop {
        u: NodeId,
        v: NodeId,
        main_path: bool,
    },
    ContentHop {
        u: NodeId,
        v: NodeId,
        main_path: bool,
    },
    CacheHit {
        node: NodeId,
    },
    SourceHit {
        node: NodeId,
    },
    CachePut {
        node: NodeId,
        evicted: Option<ContentId>,
    },
    SessionEnd {
        success: bool,
    },
}

/// Cumulative counters over all logged sessions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkStats {
    pub sessions: u64,
    pub cache_hits: u64,
    pub source_hits: u64,
    pub request_hops: u64,
    pub content_hops: u64,
    pub latency: f64,
    pub detours: u64,
    pub detour_successes: u64,
    pub detour_cost: f64,
}

impl NetworkStats {
    /// Fraction of logged sessions served from a cache
    pub fn cache_hit_ratio(&self) -> f64 {
        if self.sessions == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / self.sessions as f64
    }

    /// Fraction of detours that produced a usable trail
    pub fn detour_success_ratio(&self) -> f64 {
        if self.detours == 0 {
            return 0.0;
        }
        self.detour_successes as f64 / self.detours as f64
    }
}

#[derive(Debug, Clone)]
struct Session {
    time: SimTime,
    content: ContentId,
    log: bool,
    /// Set once the first node serves the content, so multi-trail
    /// deliveries count one hit per session
    served: bool,
}

/// Concrete network backing the view/controller boundary
#[derive(Debug)]
pub struct InMemoryNetwork {
    topology: Topology,
    betweenness: BTreeMap<NodeId, f64>,
    ego_betweenness: BTreeMap<NodeId, f64>,
    caches: BTreeMap<NodeId, LruCache>,
    sources: BTreeMap<ContentId, NodeId>,
    hint_entries: HashMap<(NodeId, ContentId), HintEntry>,
    ranked: BTreeMap<NodeId, RankedHintTable>,
    ranked_maxlen: usize,
    ranked_expiry: SimTime,
    session: Option<Session>,
    capture_trace: bool,
    trace: Vec<TraceEvent>,
    stats: NetworkStats,
}

impl InMemoryNetwork {
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::new()
    }

    fn session(&self) -> &Session {
        self.session.as_ref().expect("no open session")
    }

    fn session_mut(&mut self) -> &mut Session {
        self.session.as_mut().expect("no open session")
    }

    fn record(&mut self, event: TraceEvent) {
        if self.capture_trace {
            self.trace.push(event);
        }
    }

    /// Drain the trace collected so far
    pub fn take_trace(&mut self) -> Vec<TraceEvent> {
        std::mem::take(&mut self.trace)
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Contents of a node's cache, most recently used first
    pub fn cache_dump(&self, node: NodeId) -> Option<&[ContentId]> {
        self.caches.get(&node).map(|c| c.dump())
    }
}

impl NetworkView for InMemoryNetwork {
    fn shortest_path(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        self.topology.shortest_path(from, to)
    }

    fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        self.topology.neighbors(node)
    }

    fn content_source(&self, content: ContentId) -> Option<NodeId> {
        self.sources.get(&content).copied()
    }

    fn content_locations(&self, content: ContentId) -> Vec<NodeId> {
        let mut locations: Vec<NodeId> = self
            .caches
            .iter()
            .filter(|(_, cache)| cache.has(content))
            .map(|(&node, _)| node)
            .collect();
        if let Some(&source) = self.sources.get(&content) {
            locations.push(source);
        }
        locations
    }

    fn has_cache(&self, node: NodeId) -> bool {
        self.caches.contains_key(&node)
    }

    fn cache_nodes(&self) -> Vec<NodeId> {
        self.caches.keys().copied().collect()
    }

    fn cache_capacity(&self, node: NodeId) -> Option<usize> {
        self.caches.get(&node).map(|c| c.maxlen())
    }

    fn cache_peek(&self, node: NodeId, content: ContentId) -> bool {
        self.caches.get(&node).map(|c| c.has(content)).unwrap_or(false)
    }

    fn link_delay(&self, u: NodeId, v: NodeId) -> Option<f64> {
        self.topology.link_delay(u, v)
    }

    fn path_delay(&self, path: &[NodeId]) -> f64 {
        self.topology.path_delay(path)
    }

    fn topology_diameter(&self) -> u32 {
        self.topology.diameter()
    }

    fn betweenness(&self, node: NodeId) -> f64 {
        self.betweenness.get(&node).copied().unwrap_or(0.0)
    }

    fn ego_betweenness(&self, node: NodeId) -> f64 {
        self.ego_betweenness.get(&node).copied().unwrap_or(0.0)
    }

    fn now(&self) -> SimTime {
        self.session().time
    }

    fn session_content(&self) -> ContentId {
        self.session().content
    }
}

impl NetworkController for InMemoryNetwork {
    fn start_session(&mut self, time: SimTime, receiver: NodeId, content: ContentId, log: bool) {
        debug!(%receiver, %content, time, "session start");
        self.session = Some(Session {
            time,
            content,
            log,
            served: false,
        });
        if log {
            self.stats.sessions += 1;
        }
        self.record(TraceEvent::SessionStart {
            time,
            receiver,
            content,
        });
    }

    fn end_session(&mut self, success: bool) {
        self.record(TraceEvent::SessionEnd { success });
        self.session = None;
    }

    fn forward_request_path(&mut self, path: &[NodeId], main_path: bool) {
        for w in path.windows(2) {
            self.forward_request_hop(w[0], w[1], main_path);
        }
    }

    fn forward_request_hop(&mut self, u: NodeId, v: NodeId, main_path: bool) {
        if self.session().log {
            self.stats.request_hops += 1;
            self.stats.latency += self.topology.link_delay(u, v).unwrap_or(0.0);
        }
        self.record(TraceEvent::RequestHop { u, v, main_path });
    }

    fn forward_content_path(&mut self, path: &[NodeId], main_path: bool) {
        for w in path.windows(2) {
            self.forward_content_hop(w[0], w[1], main_path);
        }
    }

    fn forward_content_hop(&mut self, u: NodeId, v: NodeId, main_path: bool) {
        if self.session().log {
            self.stats.content_hops += 1;
            if main_path {
                self.stats.latency += self.topology.link_delay(u, v).unwrap_or(0.0);
            }
        }
        self.record(TraceEvent::ContentHop { u, v, main_path });
    }

    fn get_content(&mut self, node: NodeId) -> bool {
        let content = self.session().content;
        let from_cache = self
            .caches
            .get_mut(&node)
            .map(|c| c.get(content))
            .unwrap_or(false);
        let from_source = !from_cache && self.sources.get(&content) == Some(&node);
        if !from_cache && !from_source {
            return false;
        }
        let session = self.session_mut();
        let first = !session.served;
        session.served = true;
        let log = session.log;
        if from_cache {
            if log && first {
                self.stats.cache_hits += 1;
            }
            self.record(TraceEvent::CacheHit { node });
        } else {
            if log && first {
                self.stats.source_hits += 1;
            }
            self.record(TraceEvent::SourceHit { node });
        }
        true
    }

    fn put_content(&mut self, node: NodeId) -> Option<ContentId> {
        let content = self.session().content;
        let evicted = self.caches.get_mut(&node)?.put(content);
        self.record(TraceEvent::CachePut { node, evicted });
        evicted
    }

    fn remove_content(&mut self, node: NodeId) -> bool {
        let content = self.session().content;
        self.caches
            .get_mut(&node)
            .map(|c| c.remove(content))
            .unwrap_or(false)
    }

    fn cache_insert(&mut self, node: NodeId, content: ContentId) -> Option<ContentId> {
        let evicted = self.caches.get_mut(&node)?.put(content);
        self.record(TraceEvent::CachePut { node, evicted });
        evicted
    }

    fn hint_entry(&mut self, node: NodeId, content: ContentId) -> Option<&mut HintEntry> {
        self.hint_entries.get_mut(&(node, content))
    }

    fn hint_entry_or_insert(
        &mut self,
        node: NodeId,
        content: ContentId,
        fresh_window: SimTime,
        expiry_ttl: SimTime,
    ) -> &mut HintEntry {
        self.hint_entries
            .entry((node, content))
            .or_insert_with(|| HintEntry::new(fresh_window, expiry_ttl))
    }

    fn remove_hint_entry(&mut self, node: NodeId, content: ContentId) -> bool {
        self.hint_entries.remove(&(node, content)).is_some()
    }

    fn invalidate_trail(&mut self, trail: &[NodeId], content: ContentId) -> StrategyResult<()> {
        for w in trail.windows(2) {
            let (u, v) = (w[0], w[1]);
            let entry = self
                .hint_entries
                .get_mut(&(u, content))
                .filter(|e| e.lookup(v).is_some())
                .ok_or(StrategyError::TrailBookkeeping { node: u, nexthop: v })?;
            entry.delete(v);
            if entry.is_empty() {
                self.hint_entries.remove(&(u, content));
            }
        }
        Ok(())
    }

    fn ranked_peek(&mut self, node: NodeId, key: &HintKey) -> Option<RankedHint> {
        let now = self.session().time;
        self.ranked.get_mut(&node)?.peek(key, now)
    }

    fn ranked_touch(&mut self, node: NodeId, key: &HintKey) -> Option<RankedHint> {
        let now = self.session().time;
        self.ranked.get_mut(&node)?.touch(key, now)
    }

    fn ranked_put(&mut self, node: NodeId, key: HintKey, nexthop: NodeId) -> Option<HintKey> {
        let now = self.session().time;
        let maxlen = self.ranked_maxlen;
        let expiry = self.ranked_expiry;
        self.ranked
            .entry(node)
            .or_insert_with(|| RankedHintTable::new(maxlen, expiry))
            .put(key, nexthop, now)
    }

    fn ranked_remove(&mut self, node: NodeId, key: &HintKey) {
        if let Some(table) = self.ranked.get_mut(&node) {
            table.remove(key);
        }
    }

    fn ranked_position(&self, node: NodeId, key: &HintKey) -> Option<usize> {
        self.ranked.get(&node)?.position(key)
    }

    fn ranked_quota(&self, node: NodeId, pos: usize) -> f64 {
        self.ranked
            .get(&node)
            .map(|t| t.quota_at(pos))
            .unwrap_or(1.0)
    }

    fn ranked_record(&mut self, node: NodeId, pos: usize, success: bool, quota_increment: f64) {
        if let Some(table) = self.ranked.get_mut(&node) {
            table.record_result(pos, success, quota_increment);
        }
    }

    fn record_detour(&mut self, cost: f64, success: bool) {
        if self.session().log {
            self.stats.detours += 1;
            self.stats.detour_cost += cost;
            if success {
                self.stats.detour_successes += 1;
            }
        }
    }
}

/// Builder for [`InMemoryNetwork`]
pub struct NetworkBuilder {
    topology: Topology,
    cache_sizes: BTreeMap<NodeId, usize>,
    sources: BTreeMap<ContentId, NodeId>,
    ranked_maxlen: usize,
    ranked_expiry: SimTime,
    capture_trace: bool,
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self {
            topology: Topology::new(),
            cache_sizes: BTreeMap::new(),
            sources: BTreeMap::new(),
            ranked_maxlen: 64,
            ranked_expiry: f64::INFINITY,
            capture_trace: false,
        }
    }

    /// Use a prebuilt topology
    pub fn topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Add a unit-delay link
    pub fn link(mut self, a: NodeId, b: NodeId) -> Self {
        self.topology.connect(a, b, 1.0);
        self
    }

    /// Add a link with an explicit delay
    pub fn link_with_delay(mut self, a: NodeId, b: NodeId, delay: f64) -> Self {
        self.topology.connect(a, b, delay);
        self
    }

    /// Give a node a cache of the given capacity
    pub fn cache(mut self, node: NodeId, maxlen: usize) -> Self {
        self.cache_sizes.insert(node, maxlen);
        self
    }

    /// Assign contents to their origin server
    pub fn source<I: IntoIterator<Item = ContentId>>(mut self, node: NodeId, contents: I) -> Self {
        for content in contents {
            self.sources.insert(content, node);
        }
        self
    }

    /// Size and expiry of the per-node ranked hint tables
    pub fn ranked_tables(mut self, maxlen: usize, expiry_ttl: SimTime) -> Self {
        self.ranked_maxlen = maxlen;
        self.ranked_expiry = expiry_ttl;
        self
    }

    /// Record a [`TraceEvent`] for every action (tests)
    pub fn capture_trace(mut self) -> Self {
        self.capture_trace = true;
        self
    }

    pub fn build(self) -> InMemoryNetwork {
        // centrality is static per topology, computed once up front
        let betweenness = self.topology.betweenness();
        let ego_betweenness = self.topology.ego_betweenness();
        let caches = self
            .cache_sizes
            .into_iter()
            .map(|(node, size)| (node, LruCache::new(size)))
            .collect();
        InMemoryNetwork {
            topology: self.topology,
            betweenness,
            ego_betweenness,
            caches,
            sources: self.sources,
            hint_entries: HashMap::new(),
            ranked: BTreeMap::new(),
            ranked_maxlen: self.ranked_maxlen,
            ranked_expiry: self.ranked_expiry,
            session: None,
            capture_trace: self.capture_trace,
            trace: Vec::new(),
            stats: NetworkStats::default(),
        }
    }
}

/// Convenience: source contents `0..count` at one node
pub fn content_range(count: u64) -> impl Iterator<Item = ContentId> {
    (0..count).map(ContentId)
}

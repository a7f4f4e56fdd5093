//! Network topology
//!
//! Provides the undirected graph the decision engine routes over, plus the
//! handful of graph measures strategies consult: BFS shortest paths,
//! diameter, and betweenness centrality (full Brandes and an ego-graph
//! approximation).
//!
//! Adjacency uses ordered maps so neighbor iteration, and therefore path
//! selection among equal-length candidates, is deterministic across runs.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use hintnet_core::NodeId;

/// An undirected network topology with per-link delays
#[derive(Debug, Clone, Default)]
pub struct Topology {
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
    delays: BTreeMap<(NodeId, NodeId), f64>,
}

fn link_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a < b { (a, b) } else { (b, a) }
}

impl Topology {
    /// Create an empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an isolated node
    pub fn add_node(&mut self, node: NodeId) {
        self.adjacency.entry(node).or_default();
    }

    /// Add a bidirectional link with the given delay
    pub fn connect(&mut self, a: NodeId, b: NodeId, delay: f64) {
        if a == b {
            return; // No self-loops
        }
        self.add_node(a);
        self.add_node(b);
        self.adjacency.get_mut(&a).unwrap().insert(b);
        self.adjacency.get_mut(&b).unwrap().insert(a);
        self.delays.insert(link_key(a, b), delay);
    }

    /// All node IDs in ascending order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.adjacency.keys().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.delays.len()
    }

    /// Neighbors of a node in ascending order
    pub fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        self.adjacency
            .get(&node)
            .map(|n| n.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Check if two nodes are directly connected
    pub fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency
            .get(&a)
            .map(|n| n.contains(&b))
            .unwrap_or(false)
    }

    /// Delay of the direct link between two nodes
    pub fn link_delay(&self, a: NodeId, b: NodeId) -> Option<f64> {
        self.delays.get(&link_key(a, b)).copied()
    }

    /// Sum of link delays along a path
    pub fn path_delay(&self, path: &[NodeId]) -> f64 {
        path.windows(2)
            .map(|w| self.link_delay(w[0], w[1]).unwrap_or(0.0))
            .sum()
    }

    /// BFS shortest path from `from` to `to`, inclusive of both endpoints.
    ///
    /// Among equal-length paths the one through the lowest-numbered
    /// neighbors wins, so results are stable across runs.
    pub fn shortest_path(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        if from == to {
            return self.adjacency.contains_key(&from).then(|| vec![from]);
        }
        let mut prev: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(from);
        prev.insert(from, from);
        while let Some(u) = queue.pop_front() {
            for &v in self.adjacency.get(&u)? {
                if !prev.contains_key(&v) {
                    prev.insert(v, u);
                    if v == to {
                        let mut path = vec![to];
                        let mut cur = to;
                        while cur != from {
                            cur = prev[&cur];
                            path.push(cur);
                        }
                        path.reverse();
                        return Some(path);
                    }
                    queue.push_back(v);
                }
            }
        }
        None
    }

    /// Hop distance between two nodes
    pub fn distance(&self, from: NodeId, to: NodeId) -> Option<u32> {
        self.shortest_path(from, to).map(|p| (p.len() - 1) as u32)
    }

    /// Hop-count diameter of the topology
    pub fn diameter(&self) -> u32 {
        let nodes = self.node_ids();
        let mut diameter = 0;
        for &u in &nodes {
            for (_, d) in self.bfs_distances(u) {
                diameter = diameter.max(d);
            }
        }
        diameter
    }

    fn bfs_distances(&self, from: NodeId) -> BTreeMap<NodeId, u32> {
        let mut dist = BTreeMap::new();
        dist.insert(from, 0);
        let mut queue = VecDeque::new();
        queue.push_back(from);
        while let Some(u) = queue.pop_front() {
            let du = dist[&u];
            if let Some(neighbors) = self.adjacency.get(&u) {
                for &v in neighbors {
                    if !dist.contains_key(&v) {
                        dist.insert(v, du + 1);
                        queue.push_back(v);
                    }
                }
            }
        }
        dist
    }

    /// Betweenness centrality of every node (Brandes, unweighted)
    pub fn betweenness(&self) -> BTreeMap<NodeId, f64> {
        let nodes = self.node_ids();
        let mut centrality: BTreeMap<NodeId, f64> =
            nodes.iter().map(|&n| (n, 0.0)).collect();

        for &s in &nodes {
            let mut stack: Vec<NodeId> = Vec::new();
            let mut preds: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
            let mut sigma: BTreeMap<NodeId, f64> = BTreeMap::new();
            let mut dist: BTreeMap<NodeId, i64> = BTreeMap::new();
            sigma.insert(s, 1.0);
            dist.insert(s, 0);
            let mut queue = VecDeque::new();
            queue.push_back(s);
            while let Some(v) = queue.pop_front() {
                stack.push(v);
                let dv = dist[&v];
                let sv = sigma[&v];
                if let Some(neighbors) = self.adjacency.get(&v) {
                    for &w in neighbors {
                        if !dist.contains_key(&w) {
                            dist.insert(w, dv + 1);
                            queue.push_back(w);
                        }
                        if dist[&w] == dv + 1 {
                            *sigma.entry(w).or_insert(0.0) += sv;
                            preds.entry(w).or_default().push(v);
                        }
                    }
                }
            }
            let mut delta: BTreeMap<NodeId, f64> =
                stack.iter().map(|&n| (n, 0.0)).collect();
            while let Some(w) = stack.pop() {
                if let Some(ps) = preds.get(&w) {
                    for &v in ps {
                        let share = sigma[&v] / sigma[&w] * (1.0 + delta[&w]);
                        *delta.get_mut(&v).unwrap() += share;
                    }
                }
                if w != s {
                    *centrality.get_mut(&w).unwrap() += delta[&w];
                }
            }
        }
        // undirected graph: each pair counted twice
        for value in centrality.values_mut() {
            *value /= 2.0;
        }
        centrality
    }

    /// Ego-graph betweenness of every node.
    ///
    /// For each node, betweenness is computed only within the subgraph
    /// induced by the node and its neighbors. A cheap local stand-in for
    /// full Brandes on large graphs.
    pub fn ego_betweenness(&self) -> BTreeMap<NodeId, f64> {
        let mut centrality = BTreeMap::new();
        for (&v, neighbors) in &self.adjacency {
            let mut members: BTreeSet<NodeId> = neighbors.clone();
            members.insert(v);
            let mut ego = Topology::new();
            for &a in &members {
                ego.add_node(a);
                if let Some(an) = self.adjacency.get(&a) {
                    for &b in an {
                        if members.contains(&b) {
                            ego.connect(a, b, self.link_delay(a, b).unwrap_or(1.0));
                        }
                    }
                }
            }
            centrality.insert(v, ego.betweenness()[&v]);
        }
        centrality
    }
}

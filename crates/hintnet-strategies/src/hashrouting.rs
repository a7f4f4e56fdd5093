//! Hash-routing strategies
//!
//! Every content maps to exactly one authoritative cache via a fixed hash
//! over the cache-capable nodes. Requests always check the authoritative
//! cache; the variants differ only in how content travels back on a miss.

use tracing::debug;

use hintnet_core::{ContentId, NodeId, SimTime, StrategyResult};
use hintnet_model::NetworkController;

use crate::strategy::{fetch_at_source, path_between, source_of, Strategy};

/// Content-return policy on an authoritative-cache miss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashVariant {
    /// Always route content through the authoritative cache
    Symmetric,
    /// Route straight to the receiver; cache only if on that path
    Asymmetric,
    /// Fork at the last common node, one copy each way
    Multicast,
    /// Multicast only if the cache branch is shorter than a fraction of
    /// the network diameter, otherwise asymmetric
    HybridAm,
    /// Pick the cheaper of symmetric and multicast per request
    HybridSm,
}

/// Hash-routing over the set of cache-capable nodes
pub struct HashRouting {
    variant: HashVariant,
    /// HybridAM: multicast stretch budget as a fraction of diameter
    max_stretch: f64,
    /// Diameter is static; computed on first use
    diameter: Option<u32>,
}

impl HashRouting {
    pub fn new(variant: HashVariant, max_stretch: f64) -> Self {
        Self {
            variant,
            max_stretch,
            diameter: None,
        }
    }

    /// The single cache node a content hashes to.
    ///
    /// Folded so that consecutive content IDs sweep the cache list up and
    /// down, spreading load evenly.
    pub fn authoritative_cache(&self, net: &dyn NetworkController, content: ContentId) -> NodeId {
        let caches = net.cache_nodes();
        let n = caches.len() as u64;
        let h = content.0 % n;
        let idx = if (content.0 / n) % 2 == 0 { h } else { n - h - 1 };
        caches[idx as usize]
    }

    fn stretch_budget(&mut self, net: &dyn NetworkController) -> f64 {
        let diameter = *self
            .diameter
            .get_or_insert_with(|| net.topology_diameter());
        self.max_stretch * diameter as f64
    }
}

/// Last node shared by the prefixes of two paths out of the same origin
fn multicast_fork(cache_path: &[NodeId], receiver_path: &[NodeId]) -> NodeId {
    let mut fork = cache_path[0];
    for (a, b) in cache_path.iter().zip(receiver_path.iter()) {
        if a != b {
            break;
        }
        fork = *a;
    }
    fork
}

impl HashRouting {
    fn deliver_symmetric(
        &self,
        net: &mut dyn NetworkController,
        source: NodeId,
        cache: NodeId,
        receiver: NodeId,
    ) -> StrategyResult<()> {
        let down = path_between(net, source, cache)?;
        net.forward_content_path(&down, true);
        net.put_content(cache);
        let back = path_between(net, cache, receiver)?;
        net.forward_content_path(&back, true);
        Ok(())
    }

    fn deliver_multicast(
        &self,
        net: &mut dyn NetworkController,
        source: NodeId,
        cache: NodeId,
        receiver: NodeId,
    ) -> StrategyResult<()> {
        let cache_path = path_between(net, source, cache)?;
        let recv_path = path_between(net, source, receiver)?;
        let fork = multicast_fork(&cache_path, &recv_path);
        let to_fork = path_between(net, source, fork)?;
        net.forward_content_path(&to_fork, true);
        let fork_to_cache = path_between(net, fork, cache)?;
        net.forward_content_path(&fork_to_cache, false);
        net.put_content(cache);
        let fork_to_recv = path_between(net, fork, receiver)?;
        net.forward_content_path(&fork_to_recv, true);
        Ok(())
    }

    fn deliver_asymmetric(
        &self,
        net: &mut dyn NetworkController,
        source: NodeId,
        cache: NodeId,
        receiver: NodeId,
    ) -> StrategyResult<()> {
        let recv_path = path_between(net, source, receiver)?;
        net.forward_content_path(&recv_path, true);
        if recv_path.contains(&cache) {
            net.put_content(cache);
        }
        Ok(())
    }
}

impl Strategy for HashRouting {
    fn process_event(
        &mut self,
        net: &mut dyn NetworkController,
        time: SimTime,
        receiver: NodeId,
        content: ContentId,
        log: bool,
    ) -> StrategyResult<()> {
        net.start_session(time, receiver, content, log);
        let cache = self.authoritative_cache(net, content);
        let source = source_of(net, content)?;

        let to_cache = path_between(net, receiver, cache)?;
        net.forward_request_path(&to_cache, true);

        if net.get_content(cache) {
            let back: Vec<NodeId> = to_cache.iter().rev().copied().collect();
            net.forward_content_path(&back, true);
            net.end_session(true);
            return Ok(());
        }

        debug!(%content, %cache, "authoritative cache miss");
        let to_source = path_between(net, cache, source)?;
        net.forward_request_path(&to_source, true);
        fetch_at_source(net, source, content)?;

        match self.variant {
            HashVariant::Symmetric => {
                self.deliver_symmetric(net, source, cache, receiver)?;
            }
            HashVariant::Asymmetric => {
                self.deliver_asymmetric(net, source, cache, receiver)?;
            }
            HashVariant::Multicast => {
                self.deliver_multicast(net, source, cache, receiver)?;
            }
            HashVariant::HybridAm => {
                let cache_path = path_between(net, source, cache)?;
                let recv_path = path_between(net, source, receiver)?;
                let fork = multicast_fork(&cache_path, &recv_path);
                let branch = path_between(net, fork, cache)?.len() as f64 - 1.0;
                // the branch must come in strictly under the budget
                if branch < self.stretch_budget(net) {
                    self.deliver_multicast(net, source, cache, receiver)?;
                } else {
                    self.deliver_asymmetric(net, source, cache, receiver)?;
                }
            }
            HashVariant::HybridSm => {
                let d_sc = path_between(net, source, cache)?.len() - 1;
                let d_cr = path_between(net, cache, receiver)?.len() - 1;
                let d_sr = path_between(net, source, receiver)?.len() - 1;
                let cache_path = path_between(net, source, cache)?;
                let recv_path = path_between(net, source, receiver)?;
                let fork = multicast_fork(&cache_path, &recv_path);
                let d_fc = path_between(net, fork, cache)?.len() - 1;
                let symmetric_cost = d_sc + d_cr;
                let multicast_cost = d_sr + d_fc;
                // ties favor the simpler symmetric delivery
                if symmetric_cost <= multicast_cost {
                    self.deliver_symmetric(net, source, cache, receiver)?;
                } else {
                    self.deliver_multicast(net, source, cache, receiver)?;
                }
            }
        }
        net.end_session(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hintnet_model::{InMemoryNetwork, NetworkView};

    fn net_with_caches(count: u32) -> InMemoryNetwork {
        let mut builder = InMemoryNetwork::builder();
        for i in 0..count {
            builder = builder.link(NodeId(i), NodeId(i + 1)).cache(NodeId(i), 4);
        }
        builder.source(NodeId(count), [ContentId(0)]).build()
    }

    #[test]
    fn test_hash_is_stable_and_in_range() {
        let net = net_with_caches(4);
        let hr = HashRouting::new(HashVariant::Symmetric, 0.2);
        for c in 0..100u64 {
            let a = hr.authoritative_cache(&net, ContentId(c));
            let b = hr.authoritative_cache(&net, ContentId(c));
            assert_eq!(a, b);
            assert!(net.has_cache(a));
        }
    }

    #[test]
    fn test_hash_sweeps_up_and_down() {
        let net = net_with_caches(4);
        let hr = HashRouting::new(HashVariant::Symmetric, 0.2);
        // first pass ascending, second pass descending
        assert_eq!(hr.authoritative_cache(&net, ContentId(0)), NodeId(0));
        assert_eq!(hr.authoritative_cache(&net, ContentId(3)), NodeId(3));
        assert_eq!(hr.authoritative_cache(&net, ContentId(4)), NodeId(3));
        assert_eq!(hr.authoritative_cache(&net, ContentId(7)), NodeId(0));
    }

    #[test]
    fn test_hybrid_am_stays_asymmetric_at_the_exact_budget() {
        // diameter 4 and max_stretch 0.5 give a budget of 2 hops; the
        // cache branch below is exactly 2 hops and must not multicast
        let content = ContentId(0);
        let mut net = InMemoryNetwork::builder()
            .link(NodeId(0), NodeId(1))
            .link(NodeId(1), NodeId(2))
            .link(NodeId(2), NodeId(3))
            .link(NodeId(1), NodeId(4))
            .link(NodeId(4), NodeId(5))
            .cache(NodeId(5), 4)
            .source(NodeId(3), [content])
            .build();
        let mut hr = HashRouting::new(HashVariant::HybridAm, 0.5);
        hr.process_event(&mut net, 0.0, NodeId(0), content, true)
            .unwrap();
        // asymmetric delivery: the copy never reaches the off-path cache
        assert!(!net.cache_peek(NodeId(5), content));
    }

    #[test]
    fn test_multicast_fork_is_last_common_node() {
        let cache_path = [NodeId(0), NodeId(1), NodeId(2), NodeId(5)];
        let recv_path = [NodeId(0), NodeId(1), NodeId(3)];
        assert_eq!(multicast_fork(&cache_path, &recv_path), NodeId(1));
        // fully divergent paths fork at the origin
        let other = [NodeId(0), NodeId(9)];
        assert_eq!(multicast_fork(&cache_path, &other), NodeId(0));
    }
}

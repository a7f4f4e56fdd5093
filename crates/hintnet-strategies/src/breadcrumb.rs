//! Breadcrumb strategies
//!
//! Off-path search over per-content hint entries, one hop at a time: no
//! batched fan-out lookahead, a visited set instead of loop rollback, and
//! a full reverse walk of the explored trail on dead end before the
//! request resumes on-path. Content deliveries drop a breadcrumb at every
//! hop pointing downstream, and trails that lead to a copy get their
//! hints marked used so later searches prefer proven ones.

use std::collections::HashSet;

use rand::{Rng, RngCore};
use tracing::debug;

use hintnet_core::{ContentId, NodeId, SimTime, StrategyResult};
use hintnet_model::NetworkController;

use crate::params::StrategyParams;
use crate::strategy::{fetch_at_source, path_between, source_of, ForwardOutcome, Strategy};

/// One explored breadcrumb trail
struct CrumbWalk {
    trail: Vec<NodeId>,
    outcome: ForwardOutcome,
    hops: usize,
}

/// Breadcrumb engine; `hybrid` switches candidate selection from
/// freshest-only to the used-and-fresh two-tier `best_k`
pub struct Breadcrumb {
    hybrid: bool,
    params: StrategyParams,
    rng: Box<dyn RngCore>,
}

impl Breadcrumb {
    pub fn new(hybrid: bool, params: StrategyParams, rng: Box<dyn RngCore>) -> Self {
        Self {
            hybrid,
            params,
            rng,
        }
    }

    /// First hops worth trying from `node`, already filtered of the
    /// on-path neighbors
    fn candidates(
        &mut self,
        net: &mut dyn NetworkController,
        node: NodeId,
        content: ContentId,
        exclude: &HashSet<NodeId>,
    ) -> Vec<NodeId> {
        let now = net.now();
        let fan_out = if self.hybrid { self.params.fan_out } else { 1 };
        let Some(entry) = net.hint_entry(node, content) else {
            return Vec::new();
        };
        let hints = if self.hybrid {
            entry.best_k(now, None, fan_out + exclude.len())
        } else {
            entry.top_k_freshest(now, None, fan_out + exclude.len())
        };
        let mut hops: Vec<NodeId> = hints
            .into_iter()
            .map(|h| h.nexthop)
            .filter(|n| !exclude.contains(n))
            .collect();
        hops.truncate(fan_out);
        hops
    }

    /// Follow breadcrumbs from `start` through `first_hop` until a copy,
    /// a dead end, or the horizon. Failed trails are walked back and
    /// invalidated.
    fn follow_crumbs(
        &mut self,
        net: &mut dyn NetworkController,
        content: ContentId,
        source: NodeId,
        start: NodeId,
        first_hop: NodeId,
        exclude: &HashSet<NodeId>,
    ) -> StrategyResult<CrumbWalk> {
        let mut walk = CrumbWalk {
            trail: vec![start, first_hop],
            outcome: ForwardOutcome::Exhausted,
            hops: 1,
        };
        let mut visited: HashSet<NodeId> = exclude.clone();
        visited.insert(start);
        visited.insert(first_hop);
        net.forward_request_hop(start, first_hop, false);
        let mut cur = first_hop;
        loop {
            if net.get_content(cur) {
                walk.outcome = if cur == source {
                    ForwardOutcome::ReachedSource
                } else {
                    ForwardOutcome::Hit(cur)
                };
                self.mark_trail_used(net, content, &walk.trail);
                return Ok(walk);
            }
            if walk.hops >= self.params.max_detour {
                self.reverse_walk(net, &walk.trail);
                return Ok(walk);
            }
            let now = net.now();
            let next = net
                .hint_entry(cur, content)
                .and_then(|e| e.freshest_excluding_many(now, &visited))
                .map(|h| h.nexthop);
            match next {
                None => {
                    debug!(%cur, "breadcrumb dead end");
                    self.reverse_walk(net, &walk.trail);
                    net.invalidate_trail(&walk.trail, content)?;
                    return Ok(walk);
                }
                Some(nexthop) => {
                    net.forward_request_hop(cur, nexthop, false);
                    walk.trail.push(nexthop);
                    visited.insert(nexthop);
                    walk.hops += 1;
                    cur = nexthop;
                }
            }
        }
    }

    fn reverse_walk(&self, net: &mut dyn NetworkController, trail: &[NodeId]) {
        for w in trail.windows(2).rev() {
            net.forward_request_hop(w[1], w[0], false);
        }
    }

    fn mark_trail_used(
        &self,
        net: &mut dyn NetworkController,
        content: ContentId,
        trail: &[NodeId],
    ) {
        for w in trail.windows(2) {
            if let Some(entry) = net.hint_entry(w[0], content) {
                entry.mark_used(w[1]);
            }
        }
    }

    /// Deliver along one trail, dropping breadcrumbs and applying the
    /// flat placement probability
    fn deliver(
        &mut self,
        net: &mut dyn NetworkController,
        content: ContentId,
        trail: &[NodeId],
        main: bool,
        visited: &mut HashSet<(NodeId, NodeId)>,
        placed: &mut bool,
    ) {
        let ret: Vec<NodeId> = trail.iter().rev().copied().collect();
        let receiver = ret[ret.len() - 1];
        let now = net.now();
        for hop in 1..ret.len() {
            let (u, v) = (ret[hop - 1], ret[hop]);
            if !visited.insert((u, v)) {
                continue;
            }
            net.forward_content_hop(u, v, main);
            let distance = (ret.len() - hop) as u32;
            net.hint_entry_or_insert(
                u,
                content,
                self.params.fresh_window,
                self.params.expiry_ttl,
            )
            .insert(v, receiver, distance, now, false);
            if net.has_cache(v)
                && !(self.params.limit_replica && *placed)
                && self.rng.random::<f64>() < self.params.p
            {
                net.put_content(v);
                // the holder's stale crumbs would point away from its own copy
                net.remove_hint_entry(v, content);
                *placed = true;
            }
        }
    }
}

impl Strategy for Breadcrumb {
    fn process_event(
        &mut self,
        net: &mut dyn NetworkController,
        time: SimTime,
        receiver: NodeId,
        content: ContentId,
        log: bool,
    ) -> StrategyResult<()> {
        net.start_session(time, receiver, content, log);
        let source = source_of(net, content)?;
        let path = path_between(net, receiver, source)?;
        let onpath_hops = path.len() - 1;
        let mut quota = onpath_hops as f64 + self.params.extra_quota as f64;

        let mut trails: Vec<Vec<NodeId>> = Vec::new();

        'onpath: for hop in 1..path.len() {
            let (u, v) = (path[hop - 1], path[hop]);
            net.forward_request_hop(u, v, true);
            quota -= 1.0;
            if v == source {
                fetch_at_source(net, source, content)?;
                trails.push(path.clone());
                break 'onpath;
            }
            if net.has_cache(v) && net.get_content(v) {
                trails.push(path[..=hop].to_vec());
                break 'onpath;
            }
            let remaining = (onpath_hops - hop) as f64;
            let mut available = quota - remaining;
            if available <= 0.0 {
                continue;
            }
            let exclude: HashSet<NodeId> = [u, path[hop + 1]].into_iter().collect();
            for first_hop in self.candidates(net, v, content, &exclude) {
                if available <= 0.0 {
                    break;
                }
                let walk = self.follow_crumbs(net, content, source, v, first_hop, &exclude)?;
                let success = walk.outcome != ForwardOutcome::Exhausted;
                let cost = walk.hops as f64;
                quota -= cost;
                available -= cost;
                net.record_detour(cost, success);
                if success {
                    let mut full = path[..hop].to_vec();
                    full.extend_from_slice(&walk.trail);
                    trails.push(full);
                }
            }
            if !trails.is_empty() {
                break 'onpath;
            }
        }

        trails.sort_by_key(|t| t.len());
        let mut visited: HashSet<(NodeId, NodeId)> = HashSet::new();
        let mut placed = false;
        for (i, trail) in trails.into_iter().enumerate() {
            self.deliver(net, content, &trail, i == 0, &mut visited, &mut placed);
        }
        net.end_session(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hintnet_model::{InMemoryNetwork, NetworkView, TraceEvent};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> Box<dyn RngCore> {
        Box::new(StdRng::seed_from_u64(11))
    }

    const CONTENT: ContentId = ContentId(8);

    /// 0 - 1 - 2(source), off-path caches 3 and 4 both adjacent to 1
    fn crumb_network() -> InMemoryNetwork {
        InMemoryNetwork::builder()
            .link(NodeId(0), NodeId(1))
            .link(NodeId(1), NodeId(2))
            .link(NodeId(1), NodeId(3))
            .link(NodeId(1), NodeId(4))
            .cache(NodeId(3), 4)
            .cache(NodeId(4), 4)
            .source(NodeId(2), [CONTENT])
            .capture_trace()
            .build()
    }

    fn seed_entry_hint(
        net: &mut InMemoryNetwork,
        node: NodeId,
        nexthop: NodeId,
        now: f64,
        used: bool,
    ) {
        net.hint_entry_or_insert(node, CONTENT, 40.0, 120.0)
            .insert(nexthop, nexthop, 1, now, used);
    }

    #[test]
    fn test_crumbs_lead_to_off_path_copy() {
        let mut net = crumb_network();
        net.cache_insert(NodeId(3), CONTENT);
        seed_entry_hint(&mut net, NodeId(1), NodeId(3), 0.0, false);

        let mut s = Breadcrumb::new(false, StrategyParams::default(), rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        assert_eq!(net.stats().cache_hits, 1);
        assert_eq!(net.stats().detour_successes, 1);
        // the trail hint is now marked used
        let used = net
            .hint_entry(NodeId(1), CONTENT)
            .and_then(|e| e.lookup(NodeId(3)).map(|h| h.used))
            .unwrap();
        assert!(used);
    }

    #[test]
    fn test_dead_end_reverses_and_invalidates() {
        let mut net = crumb_network();
        seed_entry_hint(&mut net, NodeId(1), NodeId(3), 0.0, false);

        let mut s = Breadcrumb::new(false, StrategyParams::default(), rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        // entry invalidated once its only hint died
        assert!(net.hint_entry(NodeId(1), CONTENT).is_none());
        assert_eq!(net.stats().source_hits, 1);
        // on-path 2 hops, detour out 1, reverse 1
        assert_eq!(net.stats().request_hops, 4);
    }

    #[test]
    fn test_hybrid_prefers_proven_hint() {
        let mut net = crumb_network();
        net.cache_insert(NodeId(3), CONTENT);
        net.cache_insert(NodeId(4), CONTENT);
        // the hint toward 3 is younger, but the one toward 4 is proven
        seed_entry_hint(&mut net, NodeId(1), NodeId(3), 0.9, false);
        seed_entry_hint(&mut net, NodeId(1), NodeId(4), 0.5, true);

        let mut s = Breadcrumb::new(true, StrategyParams::default(), rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        let trace = net.take_trace();
        assert!(trace.contains(&TraceEvent::CacheHit { node: NodeId(4) }));
        assert!(!trace.contains(&TraceEvent::CacheHit { node: NodeId(3) }));
    }

    #[test]
    fn test_delivery_drops_breadcrumbs() {
        let mut net = crumb_network();
        let mut s = Breadcrumb::new(false, StrategyParams::default(), rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        // content flowed 2 -> 1 -> 0, each upstream node keeps a crumb
        let h = net
            .hint_entry(NodeId(2), CONTENT)
            .and_then(|e| e.lookup(NodeId(1)).cloned())
            .unwrap();
        assert_eq!(h.destination, NodeId(0));
        assert_eq!(h.distance, 2);
        let h = net
            .hint_entry(NodeId(1), CONTENT)
            .and_then(|e| e.lookup(NodeId(0)).cloned())
            .unwrap();
        assert_eq!(h.distance, 1);
    }
}

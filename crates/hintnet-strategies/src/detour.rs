//! Soft-state detour engine
//!
//! The shared state machine behind the DFIB/TFIB families and the
//! metacaching detour variants. A request walks the shortest path toward
//! the source; at each miss the node's hint store is consulted for
//! off-path candidates, each followed hop by hop through chained hints
//! until a copy, a loop, a dead end, or the detour horizon. Loops and dead
//! ends invalidate every traversed link. Exploration is bounded by a quota
//! that reserves enough budget to finish the on-path walk; what detours
//! may spend is only the surplus (`extra_quota`, plus whatever AIMD has
//! granted in the dynamic-cost variants).
//!
//! The hint store comes in three shapes: a ranked table keyed by the
//! candidate neighbor (DFIB_SC/OPH, TFIB), a ranked table with one hint
//! per content (metacaching variants), and per-content hint entries
//! (DFIB).
//!
//! The return phase replays every successful trail shortest-first,
//! deduplicating hops already delivered, installing hints (toward users
//! for DFIB, toward caches for TFIB), and applying the configured
//! placement rule.

use std::collections::HashSet;

use rand::{Rng, RngCore};
use tracing::{debug, trace};

use hintnet_core::{ContentId, NodeId, SimTime, StrategyResult};
use hintnet_model::NetworkController;
use hintnet_routing::{HintKey, PendingForwards};

use crate::params::{MetaCaching, StrategyParams};
use crate::placement::ProbCacheWalk;
use crate::strategy::{fetch_at_source, path_between, source_of, ForwardOutcome, Strategy};

/// Which way delivered content leaves hints behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintDirection {
    /// Hints point downstream, toward where the content was delivered
    TowardUsers,
    /// Hints point upstream, toward the cache that served it
    TowardCaches,
}

/// Shape of the hint store consulted at each miss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableKind {
    /// Ranked table keyed by content plus candidate neighbor
    Keyed,
    /// Ranked table with a single via-less hint per content
    Single,
    /// Per-content hint entry with freshness windows
    Entry,
}

/// One off-path walk through chained hints
struct TrailWalk {
    /// Nodes traversed, detour point first
    trail: Vec<NodeId>,
    /// The ranked-table links that led each step, for invalidation and
    /// promotion (empty in entry mode)
    links: Vec<(NodeId, HintKey)>,
    /// Table position consulted at each lookup, for the AIMD feedback
    positions: Vec<(NodeId, usize)>,
    /// How the walk ended: a serving cache, the source itself, or nothing
    outcome: ForwardOutcome,
    /// Hops actually walked
    hops: usize,
}

/// Configurable detour strategy over soft-state hint stores
pub struct DetourEngine {
    table: TableKind,
    /// Charge detours the AIMD position quota instead of 1 per attempt
    dynamic_cost: bool,
    /// Reverse-walk failed trails at request time (breadcrumb style)
    breadcrumb: bool,
    direction: HintDirection,
    /// Hand evicted copies one hop onward through the pending map
    metacache_evictions: bool,
    /// Restrict source-branch placement to interior hops
    source_interior_only: bool,
    params: StrategyParams,
    pending: PendingForwards,
    rng: Box<dyn RngCore>,
}

impl DetourEngine {
    #[allow(clippy::too_many_arguments)]
    fn new(
        table: TableKind,
        dynamic_cost: bool,
        breadcrumb: bool,
        direction: HintDirection,
        metacache_evictions: bool,
        source_interior_only: bool,
        params: StrategyParams,
        rng: Box<dyn RngCore>,
    ) -> Self {
        Self {
            table,
            dynamic_cost,
            breadcrumb,
            direction,
            metacache_evictions,
            source_interior_only,
            params,
            pending: PendingForwards::new(),
            rng,
        }
    }

    /// DFIB: per-content entry store, user-directed hints, flat cost of 1
    /// per detour attempt, Bernoulli placement
    pub fn dfib(mut params: StrategyParams, rng: Box<dyn RngCore>) -> Self {
        params.metacaching = MetaCaching::Bernoulli;
        Self::new(
            TableKind::Entry,
            false,
            false,
            HintDirection::TowardUsers,
            false,
            false,
            params,
            rng,
        )
    }

    /// Keyed-table DFIB with a flat cost of 1 per detour attempt
    pub fn dfib_static(params: StrategyParams, rng: Box<dyn RngCore>) -> Self {
        Self::new(
            TableKind::Keyed,
            false,
            false,
            HintDirection::TowardUsers,
            false,
            false,
            params,
            rng,
        )
    }

    /// Keyed-table DFIB with AIMD detour cost, bounded to one replica
    /// placed only at interior hops of a source delivery
    pub fn dfib_onpath_hint(mut params: StrategyParams, rng: Box<dyn RngCore>) -> Self {
        params.limit_replica = true;
        Self::new(
            TableKind::Keyed,
            true,
            false,
            HintDirection::TowardUsers,
            false,
            true,
            params,
            rng,
        )
    }

    /// TFIB: cache-directed hints, flat detour cost, ProbCache placement
    pub fn tfib_static(mut params: StrategyParams, rng: Box<dyn RngCore>) -> Self {
        params.metacaching = MetaCaching::ProbCache;
        Self::new(
            TableKind::Keyed,
            false,
            false,
            HintDirection::TowardCaches,
            false,
            false,
            params,
            rng,
        )
    }

    /// TFIB with dynamic AIMD detour cost
    pub fn tfib_dynamic(mut params: StrategyParams, rng: Box<dyn RngCore>) -> Self {
        params.metacaching = MetaCaching::ProbCache;
        Self::new(
            TableKind::Keyed,
            true,
            false,
            HintDirection::TowardCaches,
            false,
            false,
            params,
            rng,
        )
    }

    /// TFIB exploring breadcrumb-style: single candidate, failed trails
    /// walked back before resuming on-path
    pub fn tfib_breadcrumb(mut params: StrategyParams, rng: Box<dyn RngCore>) -> Self {
        params.fan_out = 1;
        params.metacaching = MetaCaching::ProbCache;
        Self::new(
            TableKind::Keyed,
            false,
            true,
            HintDirection::TowardCaches,
            false,
            false,
            params,
            rng,
        )
    }

    /// Metacaching detour: one hint per content, evicted copies handed
    /// one hop onward, placement per `params.metacaching`
    pub fn metacache(params: StrategyParams, rng: Box<dyn RngCore>) -> Self {
        Self::new(
            TableKind::Single,
            false,
            false,
            HintDirection::TowardUsers,
            true,
            false,
            params,
            rng,
        )
    }

    fn hint_key(&self, content: ContentId, via: NodeId) -> HintKey {
        match self.table {
            TableKind::Keyed => HintKey::new(content, Some(via)),
            _ => HintKey::new(content, None),
        }
    }

    /// Detour candidates at `node`, best first, capped at `fan_out`.
    ///
    /// `exclude` carries the upstream hop and the on-path nexthop — a
    /// candidate the route would take anyway is no detour. The keyed scan
    /// also skips the session endpoints (`ends`): the receiver and the
    /// source never hold a table worth chasing.
    fn candidates(
        &mut self,
        net: &mut dyn NetworkController,
        node: NodeId,
        content: ContentId,
        exclude: &[NodeId],
        ends: [NodeId; 2],
    ) -> Vec<(Option<HintKey>, NodeId, usize)> {
        let mut found = Vec::new();
        match self.table {
            TableKind::Keyed => {
                for n in net.neighbors(node) {
                    if exclude.contains(&n) || ends.contains(&n) {
                        continue;
                    }
                    let key = HintKey::new(content, Some(n));
                    if net.ranked_peek(node, &key).is_some() {
                        let pos = net.ranked_position(node, &key).unwrap_or(usize::MAX);
                        found.push((Some(key), n, pos));
                    }
                }
                found.sort_by_key(|&(_, _, pos)| pos);
                found.truncate(self.params.fan_out);
            }
            TableKind::Single => {
                let key = HintKey::new(content, None);
                if let Some(hint) = net.ranked_peek(node, &key) {
                    if !exclude.contains(&hint.nexthop) {
                        let pos = net.ranked_position(node, &key).unwrap_or(usize::MAX);
                        found.push((Some(key), hint.nexthop, pos));
                    }
                }
            }
            TableKind::Entry => {
                let now = net.now();
                let Some(entry) = net.hint_entry(node, content) else {
                    return found;
                };
                let hints = entry.top_k_freshest(now, None, self.params.fan_out + exclude.len());
                found.extend(
                    hints
                        .into_iter()
                        .filter(|h| !exclude.contains(&h.nexthop))
                        .map(|h| (None, h.nexthop, 0)),
                );
                found.truncate(self.params.fan_out);
            }
        }
        found
    }

    /// Next chained hint at `cur` while walking a trail
    fn trail_next(
        &mut self,
        net: &mut dyn NetworkController,
        cur: NodeId,
        content: ContentId,
        prev: NodeId,
        ends: [NodeId; 2],
    ) -> Option<(Option<HintKey>, NodeId, usize)> {
        match self.table {
            TableKind::Keyed => {
                let mut best: Option<(HintKey, NodeId, usize)> = None;
                for n in net.neighbors(cur) {
                    if n == prev || ends.contains(&n) {
                        continue;
                    }
                    let key = HintKey::new(content, Some(n));
                    if net.ranked_peek(cur, &key).is_some() {
                        let pos = net.ranked_position(cur, &key).unwrap_or(usize::MAX);
                        if best.map(|(_, _, bp)| pos < bp).unwrap_or(true) {
                            best = Some((key, n, pos));
                        }
                    }
                }
                best.map(|(key, n, pos)| (Some(key), n, pos))
            }
            TableKind::Single => {
                let key = HintKey::new(content, None);
                let hint = net.ranked_peek(cur, &key)?;
                let pos = net.ranked_position(cur, &key).unwrap_or(usize::MAX);
                Some((Some(key), hint.nexthop, pos))
            }
            TableKind::Entry => {
                let now = net.now();
                net.hint_entry(cur, content)
                    .and_then(|e| e.freshest(now, Some(prev)))
                    .map(|h| (None, h.nexthop, 0))
            }
        }
    }

    fn invalidate_walk(
        &self,
        net: &mut dyn NetworkController,
        walk: &TrailWalk,
        content: ContentId,
    ) -> StrategyResult<()> {
        if self.table == TableKind::Entry {
            net.invalidate_trail(&walk.trail, content)
        } else {
            for (node, key) in &walk.links {
                net.ranked_remove(*node, key);
            }
            Ok(())
        }
    }

    /// Follow one off-path trail starting at `start` through `first_hop`.
    ///
    /// Dead ends and loops invalidate every traversed link; hitting the
    /// detour horizon stops without invalidating (the hints beyond it
    /// were never checked).
    #[allow(clippy::too_many_arguments)]
    fn follow_trail(
        &mut self,
        net: &mut dyn NetworkController,
        content: ContentId,
        source: NodeId,
        ends: [NodeId; 2],
        start: NodeId,
        first: (Option<HintKey>, NodeId, usize),
    ) -> StrategyResult<TrailWalk> {
        let (first_key, first_hop, first_pos) = first;
        let mut walk = TrailWalk {
            trail: vec![start, first_hop],
            links: first_key.map(|k| vec![(start, k)]).unwrap_or_default(),
            positions: vec![(start, first_pos)],
            outcome: ForwardOutcome::Exhausted,
            hops: 1,
        };
        net.forward_request_hop(start, first_hop, false);
        let mut prev = start;
        let mut cur = first_hop;
        loop {
            if net.get_content(cur) {
                walk.outcome = if cur == source {
                    ForwardOutcome::ReachedSource
                } else {
                    ForwardOutcome::Hit(cur)
                };
                // promote every ranked link that contributed to the hit
                for (node, key) in &walk.links {
                    net.ranked_touch(*node, key);
                }
                return Ok(walk);
            }
            if walk.hops >= self.params.max_detour {
                trace!(%cur, "detour horizon reached");
                return Ok(walk);
            }
            match self.trail_next(net, cur, content, prev, ends) {
                None => {
                    debug!(%cur, "trail dead end");
                    self.invalidate_walk(net, &walk, content)?;
                    return Ok(walk);
                }
                Some((key, nexthop, pos)) => {
                    walk.positions.push((cur, pos));
                    if walk.trail.contains(&nexthop) {
                        debug!(%cur, %nexthop, "trail loop");
                        if let Some(key) = key {
                            walk.links.push((cur, key));
                        }
                        self.invalidate_walk(net, &walk, content)?;
                        return Ok(walk);
                    }
                    net.forward_request_hop(cur, nexthop, false);
                    if let Some(key) = key {
                        walk.links.push((cur, key));
                    }
                    walk.trail.push(nexthop);
                    walk.hops += 1;
                    prev = cur;
                    cur = nexthop;
                }
            }
        }
    }

    /// Actuate and consume the forwards parked by earlier evictions
    fn flush_pending(&mut self, net: &mut dyn NetworkController) {
        for ((node, content), nexthop) in self.pending.drain() {
            net.forward_content_hop(node, nexthop, false);
            // cascaded evictions are dropped for real
            net.cache_insert(nexthop, content);
            net.ranked_put(node, HintKey::new(content, None), nexthop);
        }
    }

    /// Install the hints one delivered hop leaves behind
    #[allow(clippy::too_many_arguments)]
    fn install_hints(
        &mut self,
        net: &mut dyn NetworkController,
        content: ContentId,
        ret: &[NodeId],
        hop: usize,
        from_source: bool,
        placed: bool,
        now: SimTime,
    ) {
        let (u, v) = (ret[hop - 1], ret[hop]);
        match self.direction {
            HintDirection::TowardUsers => {
                if self.table == TableKind::Entry {
                    let distance = (ret.len() - hop) as u32;
                    net.hint_entry_or_insert(
                        u,
                        content,
                        self.params.fresh_window,
                        self.params.expiry_ttl,
                    )
                    .insert(v, v, distance, now, false);
                    // refresh a reverse hint only where one already exists
                    if let Some(entry) = net.hint_entry(v, content) {
                        if entry.lookup(u).is_some() {
                            entry.insert(u, u, distance, now, false);
                        }
                    }
                } else {
                    net.ranked_put(u, self.hint_key(content, v), v);
                }
            }
            HintDirection::TowardCaches => {
                if from_source {
                    // hints run ahead of the copy until it lands, then
                    // point back toward where it landed
                    if placed {
                        net.ranked_put(v, self.hint_key(content, u), u);
                    } else {
                        net.ranked_put(u, self.hint_key(content, v), v);
                    }
                } else if hop + 1 < ret.len() {
                    net.ranked_put(v, self.hint_key(content, u), u);
                }
            }
        }
    }

    /// Replay one successful trail back to the receiver
    #[allow(clippy::too_many_arguments)]
    fn deliver_trail(
        &mut self,
        net: &mut dyn NetworkController,
        content: ContentId,
        trail: &[NodeId],
        from_source: bool,
        main: bool,
        visited: &mut HashSet<(NodeId, NodeId)>,
        placed: &mut bool,
    ) -> StrategyResult<()> {
        let ret: Vec<NodeId> = trail.iter().rev().copied().collect();
        let mut walk = ProbCacheWalk::new(net, &ret, self.params.t_tw);
        let chosen = self.choose_for_trail(net, &ret);
        let now = net.now();
        for hop in 1..ret.len() {
            let (u, v) = (ret[hop - 1], ret[hop]);
            if !visited.insert((u, v)) {
                // a shorter trail already delivered over this hop
                walk.step(net, &ret, hop);
                continue;
            }
            net.forward_content_hop(u, v, main);
            self.install_hints(net, content, &ret, hop, from_source, *placed, now);
            let prob = walk.step(net, &ret, hop);
            let place = match self.direction {
                // cache-directed hints place once on the source branch,
                // falling back to the receiver-side hop when the law
                // never fired; a replica delivery just forwards
                HintDirection::TowardCaches => {
                    from_source
                        && !*placed
                        && net.has_cache(v)
                        && (self.should_place(net, &ret, hop, from_source, *placed, chosen, prob)
                            || hop + 1 == ret.len())
                }
                HintDirection::TowardUsers => {
                    self.should_place(net, &ret, hop, from_source, *placed, chosen, prob)
                }
            };
            if place {
                let evicted = net.put_content(v);
                *placed = true;
                if self.table == TableKind::Single {
                    // the holder needs no pointer elsewhere
                    net.ranked_remove(v, &HintKey::new(content, None));
                }
                if self.metacache_evictions {
                    if let Some(e) = evicted {
                        if hop + 1 < ret.len() {
                            self.pending.insert(v, e, ret[hop + 1]);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// One-shot designation for the uniform-choice placement mode
    fn choose_for_trail(
        &mut self,
        net: &dyn NetworkController,
        ret: &[NodeId],
    ) -> Option<NodeId> {
        if self.params.metacaching != MetaCaching::Choice || ret.len() < 3 {
            return None;
        }
        let candidates: Vec<NodeId> = ret[1..ret.len() - 1]
            .iter()
            .copied()
            .filter(|&v| net.has_cache(v))
            .collect();
        if candidates.is_empty() {
            None
        } else {
            Some(candidates[self.rng.random_range(0..candidates.len())])
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn should_place(
        &mut self,
        net: &dyn NetworkController,
        ret: &[NodeId],
        hop: usize,
        from_source: bool,
        placed: bool,
        chosen: Option<NodeId>,
        prob_cache: f64,
    ) -> bool {
        let v = ret[hop];
        if !net.has_cache(v) {
            return false;
        }
        if self.params.limit_replica && placed {
            return false;
        }
        if from_source && self.source_interior_only && !(hop >= 2 && hop + 1 < ret.len()) {
            return false;
        }
        match self.params.metacaching {
            MetaCaching::Lce => true,
            MetaCaching::Lcd => hop == 1,
            MetaCaching::Bernoulli => self.rng.random::<f64>() < self.params.p,
            MetaCaching::Choice => chosen == Some(v),
            MetaCaching::ProbCache => {
                prob_cache > 0.0 && self.rng.random::<f64>() < prob_cache
            }
            MetaCaching::None => false,
        }
    }
}

impl Strategy for DetourEngine {
    fn process_event(
        &mut self,
        net: &mut dyn NetworkController,
        time: SimTime,
        receiver: NodeId,
        content: ContentId,
        log: bool,
    ) -> StrategyResult<()> {
        net.start_session(time, receiver, content, log);
        if self.metacache_evictions {
            self.flush_pending(net);
        }
        let source = source_of(net, content)?;
        let ends = [receiver, source];
        let path = path_between(net, receiver, source)?;
        let onpath_hops = path.len() - 1;
        let mut quota = onpath_hops as f64 + self.params.extra_quota as f64;

        // trails collected by the forward phase, each receiver-first and
        // ending at its serving node
        let mut trails: Vec<(Vec<NodeId>, bool)> = Vec::new();

        'onpath: for hop in 1..path.len() {
            let (u, v) = (path[hop - 1], path[hop]);
            net.forward_request_hop(u, v, true);
            quota -= 1.0;
            if v == source {
                fetch_at_source(net, source, content)?;
                trails.push((path.clone(), true));
                break 'onpath;
            }
            if net.has_cache(v) && net.get_content(v) {
                trails.push((path[..=hop].to_vec(), false));
                break 'onpath;
            }
            // surplus beyond what finishing the on-path walk still needs
            let remaining = (onpath_hops - hop) as f64;
            if quota - remaining <= 0.0 {
                continue;
            }
            let next_on_path = path[hop + 1];
            let exclude = [u, next_on_path];
            let mut available = quota - remaining;
            for first in self.candidates(net, v, content, &exclude, ends) {
                if available <= 0.0 {
                    break;
                }
                let cost = if self.dynamic_cost {
                    net.ranked_quota(v, first.2)
                } else {
                    1.0
                };
                let walk = self.follow_trail(net, content, source, ends, v, first)?;
                let success = walk.outcome != ForwardOutcome::Exhausted;
                quota -= cost;
                available -= cost;
                net.record_detour(cost, success);
                if self.dynamic_cost {
                    // feed the outcome back at every consulted position
                    for &(node, pos) in &walk.positions {
                        net.ranked_record(node, pos, success, self.params.quota_increment);
                    }
                }
                if success {
                    let mut full = path[..hop].to_vec();
                    full.extend_from_slice(&walk.trail);
                    let from_source = walk.outcome == ForwardOutcome::ReachedSource;
                    trails.push((full, from_source));
                } else if self.breadcrumb {
                    // walk the request back out of the failed trail
                    for w in walk.trail.windows(2).rev() {
                        net.forward_request_hop(w[1], w[0], false);
                    }
                }
            }
            if !trails.is_empty() {
                // the content was found off path; no need to reach the source
                break 'onpath;
            }
        }

        // shortest trail first; it is the primary delivery branch
        trails.sort_by_key(|(t, _)| t.len());
        let mut visited: HashSet<(NodeId, NodeId)> = HashSet::new();
        let mut placed = false;
        for (i, (trail, from_source)) in trails.into_iter().enumerate() {
            self.deliver_trail(
                net,
                content,
                &trail,
                from_source,
                i == 0,
                &mut visited,
                &mut placed,
            )?;
        }
        net.end_session(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hintnet_model::{InMemoryNetwork, NetworkView};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> Box<dyn RngCore> {
        Box::new(StdRng::seed_from_u64(7))
    }

    /// Every f64 draw comes out 0.0, so any positive probability fires
    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }
    }

    /// Every f64 draw comes out just under 1.0, so no realistic
    /// probability fires
    struct MaxRng;

    impl RngCore for MaxRng {
        fn next_u32(&mut self) -> u32 {
            u32::MAX
        }
        fn next_u64(&mut self) -> u64 {
            u64::MAX
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0xff);
        }
    }

    const CONTENT: ContentId = ContentId(5);

    /// 0 - 1 - 2(source), with an off-path cache 3 hanging off node 1
    fn detour_network() -> InMemoryNetwork {
        InMemoryNetwork::builder()
            .link(NodeId(0), NodeId(1))
            .link(NodeId(1), NodeId(2))
            .link(NodeId(1), NodeId(3))
            .cache(NodeId(3), 4)
            .source(NodeId(2), [CONTENT])
            .build()
    }

    fn seed_hint(net: &mut InMemoryNetwork, node: NodeId, via: Option<NodeId>, nexthop: NodeId) {
        net.start_session(0.0, NodeId(0), CONTENT, false);
        net.ranked_put(node, HintKey::new(CONTENT, via), nexthop);
        net.end_session(true);
    }

    fn seed_entry_hint(net: &mut InMemoryNetwork, node: NodeId, nexthop: NodeId) {
        net.hint_entry_or_insert(node, CONTENT, 40.0, 120.0)
            .insert(nexthop, nexthop, 1, 0.0, false);
    }

    #[test]
    fn test_entry_hint_leads_to_off_path_copy() {
        let mut net = detour_network();
        net.cache_insert(NodeId(3), CONTENT);
        seed_entry_hint(&mut net, NodeId(1), NodeId(3));

        let mut s = DetourEngine::dfib(StrategyParams::default(), rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        assert_eq!(net.stats().cache_hits, 1);
        assert_eq!(net.stats().source_hits, 0);
        assert_eq!(net.stats().detour_successes, 1);
    }

    #[test]
    fn test_entry_dead_end_invalidates_link() {
        let mut net = detour_network();
        // hint points at node 3 but nothing is cached there
        seed_entry_hint(&mut net, NodeId(1), NodeId(3));

        let mut s = DetourEngine::dfib(StrategyParams::default(), rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        assert_eq!(net.stats().source_hits, 1);
        assert_eq!(net.stats().detours, 1);
        assert_eq!(net.stats().detour_successes, 0);
        // the stale hint toward 3 is gone, the delivery crumb toward 0
        // replaced it
        let entry = net.hint_entry(NodeId(1), CONTENT).unwrap();
        assert!(entry.lookup(NodeId(3)).is_none());
        assert!(entry.lookup(NodeId(0)).is_some());
    }

    #[test]
    fn test_entry_delivery_refreshes_existing_reverse_hint() {
        let mut net = detour_network();
        // stale hint at node 1 pointing up toward node 2
        net.hint_entry_or_insert(NodeId(1), CONTENT, 40.0, 120.0)
            .insert(NodeId(2), NodeId(2), 3, 0.0, false);

        let mut s = DetourEngine::dfib(StrategyParams::default(), rng());
        s.process_event(&mut net, 5.0, NodeId(0), CONTENT, true)
            .unwrap();
        // the delivery 2 -> 1 refreshed the pre-existing reverse hint
        let h = net
            .hint_entry(NodeId(1), CONTENT)
            .and_then(|e| e.lookup(NodeId(2)).cloned())
            .unwrap();
        assert_eq!(h.inserted_at, 5.0);
        assert_eq!(h.distance, 2);
        // no reverse hint materializes where none existed
        assert!(net.hint_entry(NodeId(0), CONTENT).is_none());
    }

    #[test]
    fn test_dead_end_invalidates_and_falls_back() {
        let mut net = detour_network();
        // hint points at node 3 but nothing is cached there
        seed_hint(&mut net, NodeId(1), Some(NodeId(3)), NodeId(3));

        let mut s = DetourEngine::dfib_static(StrategyParams::default(), rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        // served on path from the source
        assert_eq!(net.stats().source_hits, 1);
        assert_eq!(net.stats().detours, 1);
        assert_eq!(net.stats().detour_successes, 0);
        // the stale link is gone
        net.start_session(2.0, NodeId(0), CONTENT, false);
        assert!(net
            .ranked_peek(NodeId(1), &HintKey::new(CONTENT, Some(NodeId(3))))
            .is_none());
        net.end_session(true);
    }

    #[test]
    fn test_loop_terminates_and_invalidates_every_link() {
        // ring 1 - 3 - 4 - 1 of hints with no copy anywhere off path
        let mut net = InMemoryNetwork::builder()
            .link(NodeId(0), NodeId(1))
            .link(NodeId(1), NodeId(2))
            .link(NodeId(1), NodeId(3))
            .link(NodeId(3), NodeId(4))
            .link(NodeId(4), NodeId(1))
            .cache(NodeId(3), 4)
            .cache(NodeId(4), 4)
            .source(NodeId(2), [CONTENT])
            .build();
        seed_hint(&mut net, NodeId(1), Some(NodeId(3)), NodeId(3));
        seed_hint(&mut net, NodeId(3), Some(NodeId(4)), NodeId(4));
        seed_hint(&mut net, NodeId(4), Some(NodeId(1)), NodeId(1));

        let mut params = StrategyParams::default();
        params.extra_quota = 10;
        params.max_detour = 10;
        let mut s = DetourEngine::dfib_static(params, rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();

        // the walk looped 1 -> 3 -> 4 -> 1 and removed all three links
        net.start_session(2.0, NodeId(0), CONTENT, false);
        for (node, via) in [
            (NodeId(1), NodeId(3)),
            (NodeId(3), NodeId(4)),
            (NodeId(4), NodeId(1)),
        ] {
            assert!(net
                .ranked_peek(node, &HintKey::new(CONTENT, Some(via)))
                .is_none());
        }
        net.end_session(true);
        assert_eq!(net.stats().source_hits, 1);
    }

    #[test]
    fn test_keyed_lookup_skips_session_endpoints() {
        // triangle 0 - 1 - 3 - 0 with the source 2 off node 1; the hint
        // at 3 points at the receiver and must not be chased
        let mut net = InMemoryNetwork::builder()
            .link(NodeId(0), NodeId(1))
            .link(NodeId(1), NodeId(2))
            .link(NodeId(1), NodeId(3))
            .link(NodeId(3), NodeId(0))
            .cache(NodeId(3), 4)
            .source(NodeId(2), [CONTENT])
            .build();
        seed_hint(&mut net, NodeId(1), Some(NodeId(3)), NodeId(3));
        seed_hint(&mut net, NodeId(3), Some(NodeId(0)), NodeId(0));

        let mut s = DetourEngine::dfib_static(StrategyParams::default(), rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        // the walk dead-ends at 3 instead of circling through the receiver
        assert_eq!(net.stats().detours, 1);
        assert_eq!(net.stats().detour_successes, 0);
        net.start_session(2.0, NodeId(0), CONTENT, false);
        // only the link actually walked was invalidated
        assert!(net
            .ranked_peek(NodeId(1), &HintKey::new(CONTENT, Some(NodeId(3))))
            .is_none());
        assert!(net
            .ranked_peek(NodeId(3), &HintKey::new(CONTENT, Some(NodeId(0))))
            .is_some());
        net.end_session(true);
    }

    #[test]
    fn test_zero_extra_quota_never_detours() {
        let mut net = detour_network();
        net.cache_insert(NodeId(3), CONTENT);
        seed_hint(&mut net, NodeId(1), Some(NodeId(3)), NodeId(3));

        let mut params = StrategyParams::default();
        params.extra_quota = 0;
        let mut s = DetourEngine::dfib_static(params, rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        // identical to plain shortest-path forwarding
        assert_eq!(net.stats().detours, 0);
        assert_eq!(net.stats().source_hits, 1);
        assert_eq!(net.stats().request_hops, 2);
    }

    #[test]
    fn test_static_cost_charges_one_per_attempt() {
        // hint chain 1 -> 3 -> 4 two hops long, copy at the far end
        let mut net = InMemoryNetwork::builder()
            .link(NodeId(0), NodeId(1))
            .link(NodeId(1), NodeId(2))
            .link(NodeId(1), NodeId(3))
            .link(NodeId(3), NodeId(4))
            .cache(NodeId(4), 4)
            .source(NodeId(2), [CONTENT])
            .build();
        net.cache_insert(NodeId(4), CONTENT);
        seed_hint(&mut net, NodeId(1), Some(NodeId(3)), NodeId(3));
        seed_hint(&mut net, NodeId(3), Some(NodeId(4)), NodeId(4));

        let mut s = DetourEngine::dfib_static(StrategyParams::default(), rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        assert_eq!(net.stats().detour_successes, 1);
        // two hops walked, one unit of quota charged
        assert_eq!(net.stats().detour_cost, 1.0);
    }

    #[test]
    fn test_aimd_quota_updates_on_outcome() {
        let mut net = detour_network();
        seed_hint(&mut net, NodeId(1), Some(NodeId(3)), NodeId(3));

        // failing detour: quota halves with floor 1
        let mut s = DetourEngine::dfib_onpath_hint(StrategyParams::default(), rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        assert_eq!(net.ranked_quota(NodeId(1), 0), 1.0);

        // successful detour: quota grows by the increment
        net.cache_insert(NodeId(3), CONTENT);
        seed_hint(&mut net, NodeId(1), Some(NodeId(3)), NodeId(3));
        s.process_event(&mut net, 2.0, NodeId(0), CONTENT, true)
            .unwrap();
        assert_eq!(net.ranked_quota(NodeId(1), 0), 2.0);
    }

    #[test]
    fn test_aimd_feedback_reaches_every_consulted_node() {
        // chained hints 1 -> 3 -> 4 with a copy at 4: both tables that
        // were consulted on the way earn quota
        let mut net = InMemoryNetwork::builder()
            .link(NodeId(0), NodeId(1))
            .link(NodeId(1), NodeId(2))
            .link(NodeId(1), NodeId(3))
            .link(NodeId(3), NodeId(4))
            .cache(NodeId(4), 4)
            .source(NodeId(2), [CONTENT])
            .build();
        net.cache_insert(NodeId(4), CONTENT);
        seed_hint(&mut net, NodeId(1), Some(NodeId(3)), NodeId(3));
        seed_hint(&mut net, NodeId(3), Some(NodeId(4)), NodeId(4));

        let mut s = DetourEngine::tfib_dynamic(StrategyParams::default(), rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        assert_eq!(net.stats().detour_successes, 1);
        assert_eq!(net.ranked_quota(NodeId(1), 0), 2.0);
        assert_eq!(net.ranked_quota(NodeId(3), 0), 2.0);
    }

    #[test]
    fn test_delivery_installs_hints_toward_users() {
        let mut net = detour_network();
        let mut s = DetourEngine::dfib_static(StrategyParams::default(), rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        // content flowed 2 -> 1 -> 0; the hints point downstream
        net.start_session(2.0, NodeId(0), CONTENT, false);
        let hint = net
            .ranked_peek(NodeId(2), &HintKey::new(CONTENT, Some(NodeId(1))))
            .unwrap();
        assert_eq!(hint.nexthop, NodeId(1));
        let hint = net
            .ranked_peek(NodeId(1), &HintKey::new(CONTENT, Some(NodeId(0))))
            .unwrap();
        assert_eq!(hint.nexthop, NodeId(0));
        net.end_session(true);
    }

    #[test]
    fn test_cache_hints_flip_at_the_placement_node() {
        // 0 - 1 - 2 - 3(source) with the only cache at 1; a forced zero
        // draw places the copy there
        let mut net = InMemoryNetwork::builder()
            .link(NodeId(0), NodeId(1))
            .link(NodeId(1), NodeId(2))
            .link(NodeId(2), NodeId(3))
            .cache(NodeId(1), 4)
            .source(NodeId(3), [CONTENT])
            .build();
        let mut s = DetourEngine::tfib_static(StrategyParams::default(), Box::new(ZeroRng));
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        assert!(net.cache_peek(NodeId(1), CONTENT));

        net.start_session(2.0, NodeId(0), CONTENT, false);
        // upstream of the copy the hint runs forward, toward it
        let hint = net
            .ranked_peek(NodeId(2), &HintKey::new(CONTENT, Some(NodeId(1))))
            .unwrap();
        assert_eq!(hint.nexthop, NodeId(1));
        assert!(net
            .ranked_peek(NodeId(2), &HintKey::new(CONTENT, Some(NodeId(3))))
            .is_none());
        // downstream of the copy the hint points back at it
        let hint = net
            .ranked_peek(NodeId(0), &HintKey::new(CONTENT, Some(NodeId(1))))
            .unwrap();
        assert_eq!(hint.nexthop, NodeId(1));
        net.end_session(true);
    }

    #[test]
    fn test_tfib_places_by_the_law_not_everywhere() {
        // suppressed draws: the law fires nowhere, and the cacheless
        // receiver leaves the fallback put without a home
        let mut net = InMemoryNetwork::builder()
            .link(NodeId(0), NodeId(1))
            .link(NodeId(1), NodeId(2))
            .link(NodeId(2), NodeId(3))
            .link(NodeId(3), NodeId(4))
            .cache(NodeId(1), 4)
            .cache(NodeId(2), 4)
            .cache(NodeId(3), 4)
            .source(NodeId(4), [CONTENT])
            .build();
        let mut s = DetourEngine::tfib_static(StrategyParams::default(), Box::new(MaxRng));
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        for v in [NodeId(1), NodeId(2), NodeId(3)] {
            assert!(!net.cache_peek(v, CONTENT));
        }
    }

    #[test]
    fn test_limit_replica_places_at_most_once() {
        let mut net = InMemoryNetwork::builder()
            .link(NodeId(0), NodeId(1))
            .link(NodeId(1), NodeId(2))
            .link(NodeId(2), NodeId(3))
            .link(NodeId(3), NodeId(4))
            .cache(NodeId(1), 4)
            .cache(NodeId(2), 4)
            .cache(NodeId(3), 4)
            .source(NodeId(4), [CONTENT])
            .build();
        let mut s = DetourEngine::dfib_onpath_hint(StrategyParams::default(), rng());
        s.process_event(&mut net, 1.0, NodeId(0), CONTENT, true)
            .unwrap();
        let copies = [NodeId(1), NodeId(2), NodeId(3)]
            .iter()
            .filter(|&&v| net.cache_peek(v, CONTENT))
            .count();
        assert_eq!(copies, 1);
        // interior restriction: not the hop right below the source
        assert!(!net.cache_peek(NodeId(3), CONTENT));
    }

    #[test]
    fn test_metacache_parks_and_flushes_evictions() {
        // tiny caches so the second delivery evicts the first content
        let mut net = InMemoryNetwork::builder()
            .link(NodeId(0), NodeId(1))
            .link(NodeId(1), NodeId(2))
            .cache(NodeId(0), 4)
            .cache(NodeId(1), 1)
            .source(NodeId(2), [ContentId(5), ContentId(6)])
            .build();
        let mut params = StrategyParams::default();
        params.metacaching = MetaCaching::Lcd;
        let mut s = DetourEngine::metacache(params, rng());
        s.process_event(&mut net, 1.0, NodeId(0), ContentId(5), true)
            .unwrap();
        assert!(net.cache_peek(NodeId(1), ContentId(5)));
        assert!(!net.cache_peek(NodeId(0), ContentId(5)));
        // delivering content 6 evicts 5 at node 1; the copy is parked
        s.process_event(&mut net, 2.0, NodeId(0), ContentId(6), true)
            .unwrap();
        assert!(net.cache_peek(NodeId(1), ContentId(6)));
        // next event flushes the parked copy one hop toward the receiver
        s.process_event(&mut net, 3.0, NodeId(0), ContentId(6), true)
            .unwrap();
        assert!(net.cache_peek(NodeId(0), ContentId(5)));
        // and node 1 keeps a hint to where the copy went
        net.start_session(4.0, NodeId(0), ContentId(5), false);
        let hint = net
            .ranked_peek(NodeId(1), &HintKey::new(ContentId(5), None))
            .unwrap();
        assert_eq!(hint.nexthop, NodeId(0));
        net.end_session(true);
    }
}

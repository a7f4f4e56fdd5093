//! On-path placement strategies
//!
//! The request walks the shortest path toward the source, stopping at the
//! first cache hit. The strategies in this module differ only in which
//! caches get a copy on the way back: none, all, one hop down, random,
//! centrality-designated, or the ProbCache law. No soft state is kept.

use rand::{Rng, RngCore};

use hintnet_core::{ContentId, NodeId, SimTime, StrategyResult};
use hintnet_model::NetworkController;

use crate::placement::ProbCacheWalk;
use crate::strategy::{fetch_at_source, path_between, source_of, Strategy};

/// Placement rule applied while content walks back to the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnPathPlacement {
    /// Never cache
    Never,
    /// Cache at every capable node
    Everywhere,
    /// Cache only one hop downstream of the serving node
    OneDownstream,
    /// Cache at each capable node with flat probability `p`
    Bernoulli,
    /// Cache at exactly one uniformly chosen capable node
    UniformChoice,
    /// Cache at the capable node of maximum betweenness centrality
    Betweenness,
    /// Cache per the ProbCache law
    ProbCache,
}

/// Applies one placement rule along a delivery path.
///
/// Shared by the on-path family and nearest-replica routing.
pub(crate) struct Placer<'a> {
    pub placement: OnPathPlacement,
    pub p: f64,
    pub t_tw: f64,
    pub use_ego: bool,
    /// Stop after the first placement
    pub single: bool,
    /// ProbCache only: place at the last capable hop if nothing stuck
    pub force_last: bool,
    /// ProbCache only: never draw for the receiver's own cache
    pub skip_receiver: bool,
    pub rng: &'a mut dyn RngCore,
}

impl Placer<'_> {
    /// Forward content along `ret_path` (serving node first, receiver
    /// last), applying the placement rule at each hop.
    pub fn deliver(
        &mut self,
        net: &mut dyn NetworkController,
        ret_path: &[NodeId],
    ) -> StrategyResult<()> {
        let designated = self.designate(net, ret_path);
        let mut walk = ProbCacheWalk::new(net, ret_path, self.t_tw);
        let mut placed = false;
        for hop in 1..ret_path.len() {
            let (u, v) = (ret_path[hop - 1], ret_path[hop]);
            net.forward_content_hop(u, v, true);
            let cache_here = match self.placement {
                OnPathPlacement::Never => false,
                OnPathPlacement::Everywhere => net.has_cache(v),
                OnPathPlacement::OneDownstream => hop == 1 && net.has_cache(v),
                OnPathPlacement::Bernoulli => {
                    net.has_cache(v) && self.rng.random::<f64>() < self.p
                }
                OnPathPlacement::UniformChoice | OnPathPlacement::Betweenness => {
                    designated == Some(v)
                }
                OnPathPlacement::ProbCache => {
                    let prob = walk.step(net, ret_path, hop);
                    let last = hop + 1 == ret_path.len();
                    let law = prob > 0.0
                        && !(self.skip_receiver && last)
                        && self.rng.random::<f64>() < prob;
                    net.has_cache(v) && (law || self.force_last && last && !placed)
                }
            };
            if cache_here && !(self.single && placed) {
                net.put_content(v);
                placed = true;
            }
        }
        Ok(())
    }

    /// Pick the single designated node for the whole-path rules
    fn designate(&mut self, net: &dyn NetworkController, ret_path: &[NodeId]) -> Option<NodeId> {
        match self.placement {
            OnPathPlacement::UniformChoice => {
                // interior nodes only; the serving node already has a copy
                let candidates: Vec<NodeId> = ret_path[1..ret_path.len().saturating_sub(1)]
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
            OnPathPlacement::Betweenness => {
                let centrality = |v: NodeId| {
                    if self.use_ego {
                        net.ego_betweenness(v)
                    } else {
                        net.betweenness(v)
                    }
                };
                // iterate from the receiver end so ties resolve to the
                // node closest to the receiver
                let mut best: Option<(NodeId, f64)> = None;
                for &v in ret_path[1..].iter().rev() {
                    if !net.has_cache(v) {
                        continue;
                    }
                    let c = centrality(v);
                    if best.map(|(_, bc)| c > bc).unwrap_or(true) {
                        best = Some((v, c));
                    }
                }
                best.map(|(v, _)| v)
            }
            _ => None,
        }
    }
}

/// Request walk toward the source with a per-hop cache check.
///
/// Returns the serving node (a cache, or the source itself).
pub(crate) fn walk_to_copy(
    net: &mut dyn NetworkController,
    path: &[NodeId],
    check_caches: bool,
) -> StrategyResult<NodeId> {
    let source = path[path.len() - 1];
    for hop in 1..path.len() {
        let (u, v) = (path[hop - 1], path[hop]);
        net.forward_request_hop(u, v, true);
        if v == source {
            break;
        }
        if check_caches && net.has_cache(v) && net.get_content(v) {
            return Ok(v);
        }
    }
    let content = net.session_content();
    fetch_at_source(net, source, content)?;
    Ok(source)
}

/// The whole on-path roster behind one struct: placement rule plus
/// whether intermediate caches are consulted at all
pub struct OnPath {
    placement: OnPathPlacement,
    check_caches: bool,
    p: f64,
    t_tw: f64,
    use_ego: bool,
    single: bool,
    force_last: bool,
    skip_receiver: bool,
    rng: Box<dyn RngCore>,
}

impl OnPath {
    pub fn new(
        placement: OnPathPlacement,
        check_caches: bool,
        p: f64,
        t_tw: f64,
        use_ego: bool,
        rng: Box<dyn RngCore>,
    ) -> Self {
        Self {
            placement,
            check_caches,
            p,
            t_tw,
            use_ego,
            single: false,
            force_last: false,
            skip_receiver: false,
            rng,
        }
    }

    /// Stop after the first copy placed on the return path
    pub fn with_single_placement(mut self) -> Self {
        self.single = true;
        self
    }

    /// Guarantee a copy at the hop next to the receiver when the
    /// placement law fired nowhere else (ProbCache only)
    pub fn with_forced_edge(mut self) -> Self {
        self.force_last = true;
        self
    }

    /// Leave the receiver's own cache out of the ProbCache draw
    pub fn without_receiver_placement(mut self) -> Self {
        self.skip_receiver = true;
        self
    }
}

impl Strategy for OnPath {
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
        let serving = walk_to_copy(net, &path, self.check_caches)?;
        let serving_idx = path.iter().position(|&n| n == serving).expect("on path");
        let ret_path: Vec<NodeId> = path[..=serving_idx].iter().rev().copied().collect();
        let mut placer = Placer {
            placement: self.placement,
            p: self.p,
            t_tw: self.t_tw,
            use_ego: self.use_ego,
            single: self.single,
            force_last: self.force_last,
            skip_receiver: self.skip_receiver,
            rng: self.rng.as_mut(),
        };
        placer.deliver(net, &ret_path)?;
        net.end_session(true);
        Ok(())
    }
}

/// Edge caching: only the first cache out from the receiver is consulted
/// and populated
pub struct EdgeCache;

impl Strategy for EdgeCache {
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
        let edge = path.iter().copied().find(|&v| net.has_cache(v));

        let mut serving = source;
        for hop in 1..path.len() {
            let (u, v) = (path[hop - 1], path[hop]);
            net.forward_request_hop(u, v, true);
            if Some(v) == edge && v != source && net.get_content(v) {
                serving = v;
                break;
            }
        }
        if serving == source {
            fetch_at_source(net, source, content)?;
        }
        let serving_idx = path.iter().position(|&n| n == serving).expect("on path");
        let ret_path: Vec<NodeId> = path[..=serving_idx].iter().rev().copied().collect();
        net.forward_content_path(&ret_path, true);
        if serving == source {
            if let Some(edge) = edge {
                net.put_content(edge);
            }
        }
        net.end_session(true);
        Ok(())
    }
}

/// Nearest-replica routing: forward straight to the closest copy, then
/// apply a placement rule on the way back
pub struct NearestReplica {
    placement: OnPathPlacement,
    p: f64,
    t_tw: f64,
    /// Rank replicas by path delay instead of hop count
    metric_delay: bool,
    rng: Box<dyn RngCore>,
}

impl NearestReplica {
    pub fn new(
        placement: OnPathPlacement,
        p: f64,
        t_tw: f64,
        metric_delay: bool,
        rng: Box<dyn RngCore>,
    ) -> Self {
        Self {
            placement,
            p,
            t_tw,
            metric_delay,
            rng,
        }
    }

    fn nearest(
        &self,
        net: &dyn NetworkController,
        receiver: NodeId,
        content: ContentId,
        source: NodeId,
    ) -> Option<(NodeId, Vec<NodeId>)> {
        let locations = net.content_locations(content);
        // under the delay metric, replicas win over the source outright
        let skip_source = self.metric_delay && locations.iter().any(|&loc| loc != source);
        let mut best: Option<(f64, NodeId, Vec<NodeId>)> = None;
        for loc in locations {
            if skip_source && loc == source {
                continue;
            }
            let Some(path) = net.shortest_path(receiver, loc) else {
                continue;
            };
            let cost = if self.metric_delay {
                net.path_delay(&path)
            } else {
                (path.len() - 1) as f64
            };
            if best.as_ref().map(|(bc, _, _)| cost < *bc).unwrap_or(true) {
                best = Some((cost, loc, path));
            }
        }
        best.map(|(_, loc, path)| (loc, path))
    }
}

impl Strategy for NearestReplica {
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
        let (target, path) = match self.nearest(net, receiver, content, source) {
            Some(found) => found,
            None => {
                let path = path_between(net, receiver, source)?;
                (source, path)
            }
        };
        net.forward_request_path(&path, true);
        if target == source {
            fetch_at_source(net, source, content)?;
        } else if !net.get_content(target) {
            // the view said a copy was here; single-writer makes this a
            // bookkeeping violation
            return Err(hintnet_core::StrategyError::ContentMissingAtSource {
                node: target,
                content,
            });
        }
        let ret_path: Vec<NodeId> = path.iter().rev().copied().collect();
        // the ProbCache law only applies when the copy came from the
        // source; a replica delivery just forwards
        let probcache = self.placement == OnPathPlacement::ProbCache;
        let placement = if probcache && target != source {
            OnPathPlacement::Never
        } else {
            self.placement
        };
        let mut placer = Placer {
            placement,
            p: self.p,
            t_tw: self.t_tw,
            use_ego: false,
            single: probcache,
            force_last: false,
            skip_receiver: probcache,
            rng: self.rng.as_mut(),
        };
        placer.deliver(net, &ret_path)?;
        net.end_session(true);
        Ok(())
    }
}

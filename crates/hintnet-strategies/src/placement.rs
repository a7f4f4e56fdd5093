//! ProbCache placement law
//!
//! Probabilistic placement weighted toward the receiver end of the
//! delivery path and inversely to local cache capacity: nodes late in the
//! walk, with small caches on capacity-rich remainders, cache more often.

use hintnet_core::NodeId;
use hintnet_model::NetworkView;

/// Running state of one ProbCache walk down a delivery path.
///
/// Create once per return path, then call [`step`](ProbCacheWalk::step)
/// at every hop in order; it advances the visited-capable counter as a
/// side effect.
#[derive(Debug)]
pub struct ProbCacheWalk {
    t_tw: f64,
    /// Cache-capable nodes on the whole path
    c: f64,
    /// Capable nodes visited so far, including the current hop
    x: f64,
}

impl ProbCacheWalk {
    pub fn new<V: NetworkView + ?Sized>(net: &V, path: &[NodeId], t_tw: f64) -> Self {
        let c = path.iter().filter(|&&v| net.has_cache(v)).count() as f64;
        Self { t_tw, c, x: 0.0 }
    }

    /// Placement probability at `path[hop]`.
    ///
    /// Returns 0 for nodes without a cache (while still keeping the walk
    /// counters consistent). `hop` must be at least 1 and visited in
    /// ascending order.
    pub fn step<V: NetworkView + ?Sized>(&mut self, net: &V, path: &[NodeId], hop: usize) -> f64 {
        let v = path[hop];
        if !net.has_cache(v) {
            return 0.0;
        }
        self.x += 1.0;
        if self.c == 0.0 {
            return 0.0;
        }
        // capacity downstream of the previous hop, inclusive
        let n: usize = path[hop - 1..]
            .iter()
            .filter_map(|&u| net.cache_capacity(u))
            .sum();
        let capacity = net.cache_capacity(v).unwrap_or(1).max(1) as f64;
        (n as f64 / (self.t_tw * capacity)) * (self.x / self.c).powf(self.c)
    }
}

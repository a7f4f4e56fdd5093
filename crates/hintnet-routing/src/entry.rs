//! Per-content hint entry
//!
//! A [`HintEntry`] owns the set of forwarding hints a node keeps for one
//! content, unique by nexthop. Every accessor prunes expired hints first,
//! so a stale hint is never observable from the outside. The freshness
//! window and expiry TTL are fixed when the entry is created and apply to
//! every hint in it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use hintnet_core::{NodeId, SimTime};

use crate::hint::NexthopHint;

/// Set of forwarding hints for one content at one node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HintEntry {
    nexthops: Vec<NexthopHint>,
    fresh_window: SimTime,
    expiry_ttl: SimTime,
}

impl Default for HintEntry {
    fn default() -> Self {
        Self::new(f64::INFINITY, f64::INFINITY)
    }
}

impl HintEntry {
    /// Create an entry with the given freshness window and expiry TTL
    pub fn new(fresh_window: SimTime, expiry_ttl: SimTime) -> Self {
        Self {
            nexthops: Vec::new(),
            fresh_window,
            expiry_ttl,
        }
    }

    /// Freshness window applied to all hints of this entry
    pub fn fresh_window(&self) -> SimTime {
        self.fresh_window
    }

    /// Expiry TTL applied to all hints of this entry
    pub fn expiry_ttl(&self) -> SimTime {
        self.expiry_ttl
    }

    /// Number of live hints (without pruning)
    pub fn len(&self) -> usize {
        self.nexthops.len()
    }

    /// True once every hint has been pruned or deleted
    pub fn is_empty(&self) -> bool {
        self.nexthops.is_empty()
    }

    /// Drop every hint whose age exceeds the expiry TTL
    pub fn prune(&mut self, now: SimTime) {
        let ttl = self.expiry_ttl;
        self.nexthops.retain(|h| !h.is_expired(now, ttl));
    }

    /// Insert a hint, or refresh it in place if `nexthop` is already present.
    ///
    /// Expired hints are pruned first. Returns the resulting hint.
    pub fn insert(
        &mut self,
        nexthop: NodeId,
        destination: NodeId,
        distance: u32,
        now: SimTime,
        used: bool,
    ) -> &NexthopHint {
        self.prune(now);
        if let Some(pos) = self.nexthops.iter().position(|h| h.nexthop == nexthop) {
            let hint = &mut self.nexthops[pos];
            hint.destination = destination;
            hint.distance = distance;
            hint.inserted_at = now;
            hint.used = used;
            return &self.nexthops[pos];
        }
        self.nexthops.push(NexthopHint {
            nexthop,
            destination,
            distance,
            inserted_at: now,
            used,
        });
        self.nexthops.last().expect("just pushed")
    }

    /// Delete the hint whose nexthop is `nexthop`, if present
    pub fn delete(&mut self, nexthop: NodeId) {
        self.nexthops.retain(|h| h.nexthop != nexthop);
    }

    /// Fetch the hint whose nexthop is `nexthop`
    pub fn lookup(&self, nexthop: NodeId) -> Option<&NexthopHint> {
        self.nexthops.iter().find(|h| h.nexthop == nexthop)
    }

    /// Mark the hint toward `nexthop` as used, if present
    pub fn mark_used(&mut self, nexthop: NodeId) {
        if let Some(h) = self.nexthops.iter_mut().find(|h| h.nexthop == nexthop) {
            h.mark_used();
        }
    }

    /// Freshest live hint, optionally skipping one nexthop.
    ///
    /// Ties break by stable iteration order (first inserted wins).
    pub fn freshest(&mut self, now: SimTime, exclude: Option<NodeId>) -> Option<NexthopHint> {
        self.prune(now);
        self.nexthops
            .iter()
            .filter(|h| Some(h.nexthop) != exclude)
            .min_by(|a, b| {
                a.age(now)
                    .partial_cmp(&b.age(now))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
    }

    /// Freshest live hint whose nexthop is in none of `exclude`.
    ///
    /// Ties break by stable iteration order (first inserted wins).
    pub fn freshest_excluding_many(
        &mut self,
        now: SimTime,
        exclude: &HashSet<NodeId>,
    ) -> Option<NexthopHint> {
        self.prune(now);
        self.nexthops
            .iter()
            .filter(|h| !exclude.contains(&h.nexthop))
            .min_by(|a, b| {
                a.age(now)
                    .partial_cmp(&b.age(now))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
    }

    /// Up to `k` most recently inserted live hints, excluding one nexthop
    pub fn top_k_freshest(
        &mut self,
        now: SimTime,
        exclude: Option<NodeId>,
        k: usize,
    ) -> Vec<NexthopHint> {
        self.prune(now);
        let mut hints: Vec<NexthopHint> = self
            .nexthops
            .iter()
            .filter(|h| Some(h.nexthop) != exclude)
            .cloned()
            .collect();
        hints.sort_by(|a, b| {
            b.inserted_at
                .partial_cmp(&a.inserted_at)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hints.truncate(k);
        hints
    }

    /// Up to `k` live hints, preferring hints proven to work.
    ///
    /// Hints that are both used and fresh fill the result first, most
    /// recently inserted ahead; remaining slots are padded with the most
    /// recent of the rest. Hints previously used for a successful retrieval
    /// carry more predictive weight than merely-recent ones.
    pub fn best_k(&mut self, now: SimTime, exclude: Option<NodeId>, k: usize) -> Vec<NexthopHint> {
        self.prune(now);
        let window = self.fresh_window;
        let mut proven: Vec<NexthopHint> = self
            .nexthops
            .iter()
            .filter(|h| h.is_used_and_fresh(now, window) && Some(h.nexthop) != exclude)
            .cloned()
            .collect();
        proven.sort_by(|a, b| {
            b.inserted_at
                .partial_cmp(&a.inserted_at)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        proven.truncate(k);
        if proven.len() < k {
            let mut rest: Vec<NexthopHint> = self
                .nexthops
                .iter()
                .filter(|h| !h.is_used_and_fresh(now, window) && Some(h.nexthop) != exclude)
                .cloned()
                .collect();
            rest.sort_by(|a, b| {
                b.inserted_at
                    .partial_cmp(&a.inserted_at)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            rest.truncate(k - proven.len());
            proven.extend(rest);
        }
        proven
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> HintEntry {
        HintEntry::new(5.0, 10.0)
    }

    #[test]
    fn test_insert_lookup_roundtrip() {
        let mut e = entry();
        e.insert(NodeId(1), NodeId(9), 4, 2.0, false);
        let h = e.lookup(NodeId(1)).unwrap();
        assert_eq!(h.nexthop, NodeId(1));
        assert_eq!(h.destination, NodeId(9));
        assert_eq!(h.distance, 4);
        assert_eq!(h.inserted_at, 2.0);
    }

    #[test]
    fn test_no_duplicate_nexthops() {
        let mut e = entry();
        for t in 0..5 {
            e.insert(NodeId(1), NodeId(9), 4, t as f64, false);
            e.insert(NodeId(2), NodeId(8), 2, t as f64, false);
        }
        assert_eq!(e.len(), 2);
        // re-insertion refreshed in place
        assert_eq!(e.lookup(NodeId(1)).unwrap().inserted_at, 4.0);
    }

    #[test]
    fn test_prune_on_insert() {
        let mut e = entry();
        e.insert(NodeId(1), NodeId(9), 4, 0.0, false);
        // inserting at t=20 prunes the t=0 hint (ttl 10)
        e.insert(NodeId(2), NodeId(8), 2, 20.0, false);
        assert!(e.lookup(NodeId(1)).is_none());
        assert_eq!(e.len(), 1);
    }

    #[test]
    fn test_freshest_skips_single_exclusion() {
        let mut e = entry();
        e.insert(NodeId(1), NodeId(9), 4, 3.0, false);
        e.insert(NodeId(2), NodeId(8), 2, 1.0, false);
        assert_eq!(e.freshest(4.0, None).unwrap().nexthop, NodeId(1));
        assert_eq!(
            e.freshest(4.0, Some(NodeId(1))).unwrap().nexthop,
            NodeId(2)
        );
        assert!(e.freshest(20.0, None).is_none());
    }

    #[test]
    fn test_freshest_excludes_nodes() {
        let mut e = entry();
        e.insert(NodeId(1), NodeId(9), 4, 3.0, false);
        e.insert(NodeId(2), NodeId(8), 2, 1.0, false);
        let h = e
            .freshest_excluding_many(4.0, &HashSet::from([NodeId(1)]))
            .unwrap();
        assert_eq!(h.nexthop, NodeId(2));
        // without exclusion the younger hint wins
        let h = e.freshest_excluding_many(4.0, &HashSet::new()).unwrap();
        assert_eq!(h.nexthop, NodeId(1));
    }

    #[test]
    fn test_freshest_all_excluded() {
        let mut e = entry();
        e.insert(NodeId(1), NodeId(9), 4, 0.0, false);
        assert!(e
            .freshest_excluding_many(1.0, &HashSet::from([NodeId(1)]))
            .is_none());
    }

    #[test]
    fn test_top_k_bounds() {
        let mut e = entry();
        for i in 0..6u32 {
            e.insert(NodeId(i), NodeId(9), 1, i as f64, false);
        }
        let hints = e.top_k_freshest(6.0, Some(NodeId(5)), 3);
        assert_eq!(hints.len(), 3);
        assert!(hints.iter().all(|h| h.nexthop != NodeId(5)));
        // most recently inserted first
        assert_eq!(hints[0].nexthop, NodeId(4));
    }

    #[test]
    fn test_top_k_never_returns_expired() {
        let mut e = entry();
        e.insert(NodeId(1), NodeId(9), 1, 0.0, false);
        e.insert(NodeId(2), NodeId(9), 1, 8.0, false);
        let hints = e.top_k_freshest(12.0, None, 10);
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].nexthop, NodeId(2));
    }

    #[test]
    fn test_best_k_prefers_used_and_fresh() {
        let mut e = entry();
        e.insert(NodeId(1), NodeId(9), 1, 7.0, false);
        e.insert(NodeId(2), NodeId(9), 1, 6.0, true);
        e.insert(NodeId(3), NodeId(9), 1, 8.0, false);
        let hints = e.best_k(9.0, None, 2);
        assert_eq!(hints.len(), 2);
        // the used-and-fresh hint ranks first despite being older
        assert_eq!(hints[0].nexthop, NodeId(2));
        assert_eq!(hints[1].nexthop, NodeId(3));
    }

    #[test]
    fn test_best_k_used_but_stale_falls_back() {
        let mut e = entry();
        // used at t=0, fresh window is 5: stale by t=9
        e.insert(NodeId(1), NodeId(9), 1, 0.0, true);
        e.insert(NodeId(2), NodeId(9), 1, 8.0, false);
        let hints = e.best_k(9.0, None, 1);
        assert_eq!(hints[0].nexthop, NodeId(2));
    }

    #[test]
    fn test_delete_and_empty() {
        let mut e = entry();
        e.insert(NodeId(1), NodeId(9), 1, 0.0, false);
        e.delete(NodeId(1));
        assert!(e.is_empty());
    }
}

//! Bounded keyed hint store with rank-based exploration quotas
//!
//! A [`RankedHintTable`] holds at most `maxlen` hints in recency order:
//! position 0 is the most recently touched key. Each *position* (not each
//! key) carries an exploration quota plus lookup/success counters, adjusted
//! AIMD-style: a success at a position adds a fixed increment to its quota,
//! a failure halves it, never below 1. A hint that keeps delivering climbs
//! to the hot front positions and earns a larger detour budget; a hint that
//! keeps failing sinks and is explored more cheaply.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use hintnet_core::{ContentId, NodeId, SimTime};

/// Lookup key of a ranked hint table.
///
/// `via` distinguishes hints learned from different upstream neighbors for
/// the same content; tables that keep a single hint per content use `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HintKey {
    pub content: ContentId,
    pub via: Option<NodeId>,
}

impl HintKey {
    pub fn new(content: ContentId, via: Option<NodeId>) -> Self {
        Self { content, via }
    }
}

/// Value stored under a [`HintKey`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedHint {
    /// Neighbor to forward to
    pub nexthop: NodeId,
    /// Logical time of insertion or last refresh
    pub inserted_at: SimTime,
}

/// Bounded recency-ordered hint store with per-position AIMD quotas
#[derive(Debug, Clone)]
pub struct RankedHintTable {
    maxlen: usize,
    expiry_ttl: SimTime,
    entries: HashMap<HintKey, RankedHint>,
    /// Keys in recency order, most recently touched first
    order: Vec<HintKey>,
    quota: Vec<f64>,
    nlookups: Vec<u64>,
    nsuccess: Vec<u64>,
}

impl RankedHintTable {
    /// Create a table holding at most `maxlen` hints, each expiring
    /// `expiry_ttl` after its last refresh. Quotas start at 1.
    pub fn new(maxlen: usize, expiry_ttl: SimTime) -> Self {
        assert!(maxlen > 0, "ranked hint table must hold at least one hint");
        Self {
            maxlen,
            expiry_ttl,
            entries: HashMap::new(),
            order: Vec::with_capacity(maxlen),
            quota: vec![1.0; maxlen],
            nlookups: vec![0; maxlen],
            nsuccess: vec![0; maxlen],
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn is_expired(&self, hint: &RankedHint, now: SimTime) -> bool {
        now - hint.inserted_at > self.expiry_ttl
    }

    /// Read the hint for `key` without promoting it.
    ///
    /// An expired hint is removed and reported as absent.
    pub fn peek(&mut self, key: &HintKey, now: SimTime) -> Option<RankedHint> {
        let hint = *self.entries.get(key)?;
        if self.is_expired(&hint, now) {
            self.remove(key);
            return None;
        }
        Some(hint)
    }

    /// Read the hint for `key` and promote it to position 0.
    ///
    /// The lookup counter of the position the key was found at is bumped,
    /// so quota statistics reflect where hits actually happen.
    pub fn touch(&mut self, key: &HintKey, now: SimTime) -> Option<RankedHint> {
        let hint = *self.entries.get(key)?;
        if self.is_expired(&hint, now) {
            self.remove(key);
            return None;
        }
        let pos = self.position(key).expect("key present in entries");
        self.nlookups[pos] += 1;
        self.order.remove(pos);
        self.order.insert(0, *key);
        Some(hint)
    }

    /// Insert or refresh the hint for `key`, promoting it to position 0.
    ///
    /// If the table is full the least recently touched key is evicted and
    /// returned.
    pub fn put(&mut self, key: HintKey, nexthop: NodeId, now: SimTime) -> Option<HintKey> {
        let hint = RankedHint {
            nexthop,
            inserted_at: now,
        };
        if self.entries.insert(key, hint).is_some() {
            let pos = self.position(&key).expect("key present in entries");
            self.order.remove(pos);
            self.order.insert(0, key);
            return None;
        }
        self.order.insert(0, key);
        if self.order.len() > self.maxlen {
            let evicted = self.order.pop().expect("over capacity");
            self.entries.remove(&evicted);
            trace!(?evicted, "ranked hint table evicted tail");
            return Some(evicted);
        }
        None
    }

    /// Remove the hint for `key`, if present
    pub fn remove(&mut self, key: &HintKey) -> Option<RankedHint> {
        let hint = self.entries.remove(key)?;
        let pos = self
            .order
            .iter()
            .position(|k| k == key)
            .expect("order and entries in sync");
        self.order.remove(pos);
        Some(hint)
    }

    /// Current recency position of `key` (0 = most recent)
    pub fn position(&self, key: &HintKey) -> Option<usize> {
        self.order.iter().position(|k| k == key)
    }

    /// Exploration quota of recency position `pos`
    pub fn quota_at(&self, pos: usize) -> f64 {
        self.quota[pos]
    }

    /// Lookup and success counters of recency position `pos`
    pub fn stats_at(&self, pos: usize) -> (u64, u64) {
        (self.nlookups[pos], self.nsuccess[pos])
    }

    /// Feed back the outcome of a retrieval that consulted position `pos`.
    ///
    /// Success adds `quota_increment` to the position's quota; failure
    /// halves the quota, with 1 as the floor.
    pub fn record_result(&mut self, pos: usize, success: bool, quota_increment: f64) {
        if success {
            self.nsuccess[pos] += 1;
            self.quota[pos] += quota_increment;
        } else {
            self.quota[pos] = (self.quota[pos] / 2.0).max(1.0);
        }
    }
}

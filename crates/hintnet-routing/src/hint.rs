//! A single soft-state forwarding hint
//!
//! A hint says "content was last seen flowing toward `destination`, reach
//! it via `nexthop`, `distance` hops away". The insertion timestamp is
//! refreshed whenever the hint is confirmed by another delivery, so age
//! measures time since the last confirmation, not since first creation.

use serde::{Deserialize, Serialize};

use hintnet_core::{NodeId, SimTime};

/// One nexthop entry of a hint table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NexthopHint {
    /// Neighbor to forward to in order to reach the destination
    pub nexthop: NodeId,
    /// The remote node the trail is believed to end at
    pub destination: NodeId,
    /// Hop distance to the destination
    pub distance: u32,
    /// Logical time of insertion or last confirmed use
    pub inserted_at: SimTime,
    /// Whether this hint has ever led to a successful retrieval
    pub used: bool,
}

impl NexthopHint {
    /// Create a new hint
    pub fn new(nexthop: NodeId, destination: NodeId, distance: u32, now: SimTime) -> Self {
        Self {
            nexthop,
            destination,
            distance,
            inserted_at: now,
            used: false,
        }
    }

    /// Age of the hint at logical time `now`.
    ///
    /// Callers must never query with `now` earlier than the insertion time;
    /// the logical clock is monotone across events.
    pub fn age(&self, now: SimTime) -> SimTime {
        let age = now - self.inserted_at;
        debug_assert!(age >= 0.0, "logical clock moved backwards");
        age
    }

    /// True once the hint's age exceeds `ttl`.
    ///
    /// Monotonic in `now`: once expired, expired for every later time.
    pub fn is_expired(&self, now: SimTime, ttl: SimTime) -> bool {
        self.age(now) > ttl
    }

    /// True while the hint's age is within the freshness window
    pub fn is_fresh(&self, now: SimTime, window: SimTime) -> bool {
        self.age(now) <= window
    }

    /// True if the hint was used for a successful retrieval and is still fresh
    pub fn is_used_and_fresh(&self, now: SimTime, window: SimTime) -> bool {
        self.used && self.is_fresh(now, window)
    }

    /// Mark the hint as having led to a successful retrieval
    pub fn mark_used(&mut self) {
        self.used = true;
    }
}

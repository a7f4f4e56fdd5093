//! # Hintnet Routing
//!
//! Soft-state forwarding tables for the hintnet decision engine.
//!
//! Every table in this crate works on logical time: an entry carries the
//! timestamp of its insertion (or last confirmed use) and is pruned lazily,
//! on every read or write, once its age exceeds the expiry TTL. No entry is
//! ever returned stale.
//!
//! ## Core Components
//!
//! - [`NexthopHint`]: one forwarding hint with insertion time and a
//!   used-before flag
//! - [`HintEntry`]: per-content set of hints, unique by nexthop, with
//!   fresh/expiry windows fixed at construction
//! - [`RankedHintTable`]: bounded keyed store whose LRU positions carry
//!   AIMD-adjusted exploration quotas
//! - [`PendingForwards`]: explicitly lifecycled `(node, content) -> nexthop`
//!   map used by metacaching-on-evict strategies
//!
//! ## Single-writer invariant
//!
//! Tables are mutated through `&mut` only. One request is processed at a
//! time per network instance, so prune-then-select and update-in-place
//! sequences need no interior locking.

pub mod entry;
pub mod hint;
pub mod pending;
pub mod ranked;

// Re-export main types
pub use entry::HintEntry;
pub use hint::NexthopHint;
pub use pending::PendingForwards;
pub use ranked::{HintKey, RankedHint, RankedHintTable};

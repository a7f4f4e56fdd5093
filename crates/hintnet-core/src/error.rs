//! Strategy error types
//!
//! Only two runtime conditions are fatal: a content missing at its
//! designated source, and invalidation of a trail link that has no
//! corresponding hint. Both signal violated invariants of the network
//! model, not recoverable conditions. Cache misses, detour dead ends,
//! loops, and quota exhaustion are ordinary control flow and never appear
//! here. Configuration problems are raised at construction time.

use thiserror::Error;

use crate::ids::{ContentId, NodeId};

/// Errors raised by the forwarding/caching decision engine
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The forward phase reached the designated source but the content was
    /// not there. Placement or topology bookkeeping is broken.
    #[error("content {content} not found at its designated source {node}")]
    ContentMissingAtSource { node: NodeId, content: ContentId },

    /// A trail link was invalidated but no hint backed it.
    #[error("trail invalidation at {node} found no hint toward {nexthop}")]
    TrailBookkeeping { node: NodeId, nexthop: NodeId },

    /// A request was issued for a content no source serves.
    #[error("content {0} has no designated source")]
    UnknownContent(ContentId),

    /// Two nodes the engine must route between are disconnected.
    #[error("no route between {from} and {to}")]
    NoRoute { from: NodeId, to: NodeId },

    /// Unknown metacaching mode string (construction-time configuration error)
    #[error("unsupported metacaching mode: {0}")]
    UnknownMetaCaching(String),

    /// Unknown strategy name (construction-time configuration error)
    #[error("unknown strategy name: {0}")]
    UnknownStrategy(String),
}

/// Result type for strategy operations
pub type StrategyResult<T> = Result<T, StrategyError>;

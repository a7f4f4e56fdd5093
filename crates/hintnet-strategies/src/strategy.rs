//! The strategy contract
//!
//! A strategy is one state machine invoked once per request. It reads the
//! network through the view, actuates it through the controller, and keeps
//! no per-request state beyond the call; hint tables and the pending
//! forward map are the only state that persists across events.

use hintnet_core::{ContentId, NodeId, SimTime, StrategyError, StrategyResult};
use hintnet_model::NetworkController;

/// Outcome of a forward phase.
///
/// "Fell off the end of the path" is never implicit: every forward walk
/// ends in exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// A node answered from its cache
    Hit(NodeId),
    /// The walk reached the content's designated source
    ReachedSource,
    /// The exploration budget ran out before any copy was found
    Exhausted,
}

impl core::fmt::Debug for dyn Strategy + '_ {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("dyn Strategy")
    }
}

/// A forwarding/caching decision engine, driven one request at a time
pub trait Strategy {
    /// Process one content request.
    ///
    /// `time` is logical and monotonically non-decreasing across calls.
    /// `log` selects whether this session counts toward cumulative stats
    /// (warmup requests pass false).
    fn process_event(
        &mut self,
        net: &mut dyn NetworkController,
        time: SimTime,
        receiver: NodeId,
        content: ContentId,
        log: bool,
    ) -> StrategyResult<()>;
}

/// Designated source of a content, or the fatal error if none exists
pub fn source_of(
    net: &dyn NetworkController,
    content: ContentId,
) -> StrategyResult<NodeId> {
    net.content_source(content)
        .ok_or(StrategyError::UnknownContent(content))
}

/// Retrieve the session content at the designated source.
///
/// A miss here is a violated placement invariant, not a runtime condition.
pub fn fetch_at_source(
    net: &mut dyn NetworkController,
    source: NodeId,
    content: ContentId,
) -> StrategyResult<()> {
    if net.get_content(source) {
        Ok(())
    } else {
        Err(StrategyError::ContentMissingAtSource {
            node: source,
            content,
        })
    }
}

/// Shortest path between two nodes; a disconnected pair is a topology
/// invariant violation, not a runtime condition.
pub fn path_between(
    net: &dyn NetworkController,
    from: NodeId,
    to: NodeId,
) -> StrategyResult<Vec<NodeId>> {
    net.shortest_path(from, to)
        .ok_or(StrategyError::NoRoute { from, to })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_outcome_is_tristate() {
        let outcomes = [
            ForwardOutcome::Hit(NodeId(3)),
            ForwardOutcome::ReachedSource,
            ForwardOutcome::Exhausted,
        ];
        assert_ne!(outcomes[0], outcomes[1]);
        assert_ne!(outcomes[1], outcomes[2]);
    }
}

//! End-to-end request scenarios across the strategy roster

use rand::RngCore;

use hintnet_core::{ContentId, NodeId};
use hintnet_model::{InMemoryNetwork, NetworkController, NetworkView};
use hintnet_routing::HintKey;
use hintnet_strategies::{
    build_strategy, OnPath, OnPathPlacement, Strategy, StrategyParams, STRATEGY_NAMES,
};

/// RNG whose every draw is zero, for forcing probabilistic placements
struct ZeroRng;

impl RngCore for ZeroRng {
    fn next_u32(&mut self) -> u32 {
        0
    }
    fn next_u64(&mut self) -> u64 {
        0
    }
    fn fill_bytes(&mut self, dst: &mut [u8]) {
        dst.fill(0);
    }
}

#[test]
fn test_symmetric_hashrouting_three_node_line() {
    // receiver - cache - source, content initially uncached
    let content = ContentId(3);
    let mut net = InMemoryNetwork::builder()
        .link(NodeId(0), NodeId(1))
        .link(NodeId(1), NodeId(2))
        .cache(NodeId(1), 4)
        .source(NodeId(2), [content])
        .build();
    let mut s = build_strategy("HR_SYMM", StrategyParams::default()).unwrap();

    // first request: miss at the cache, hit at the source, copy left behind
    s.process_event(&mut net, 0.0, NodeId(0), content, true)
        .unwrap();
    assert!(net.cache_peek(NodeId(1), content));
    assert_eq!(net.stats().source_hits, 1);
    assert_eq!(net.stats().cache_hits, 0);
    assert_eq!(net.stats().request_hops, 2);
    assert_eq!(net.stats().content_hops, 2);

    // identical second request: served at the cache, no source traffic
    s.process_event(&mut net, 1.0, NodeId(0), content, true)
        .unwrap();
    assert_eq!(net.stats().source_hits, 1);
    assert_eq!(net.stats().cache_hits, 1);
    assert_eq!(net.stats().request_hops, 3);
    assert_eq!(net.stats().content_hops, 3);
}

#[test]
fn test_probcache_forced_draw_places_copy() {
    // single cache of capacity 1 on the path, t_tw = 10: the placement
    // probability is 0.1, and a forced zero draw must place the copy
    let content = ContentId(1);
    let mut net = InMemoryNetwork::builder()
        .link(NodeId(0), NodeId(1))
        .link(NodeId(1), NodeId(2))
        .cache(NodeId(1), 1)
        .source(NodeId(2), [content])
        .build();
    let mut s = OnPath::new(
        OnPathPlacement::ProbCache,
        true,
        1.0,
        10.0,
        false,
        Box::new(ZeroRng),
    );
    s.process_event(&mut net, 0.0, NodeId(0), content, true)
        .unwrap();
    assert!(net.cache_peek(NodeId(1), content));
}

#[test]
fn test_zero_extra_quota_matches_plain_forwarding() {
    // a hint and an off-path copy exist, but with no surplus budget the
    // walk must behave exactly like shortest-path forwarding
    let content = ContentId(4);
    let mut net = InMemoryNetwork::builder()
        .link(NodeId(0), NodeId(1))
        .link(NodeId(1), NodeId(2))
        .link(NodeId(1), NodeId(3))
        .cache(NodeId(3), 4)
        .source(NodeId(2), [content])
        .build();
    net.cache_insert(NodeId(3), content);
    net.start_session(0.0, NodeId(0), content, false);
    net.ranked_put(NodeId(1), HintKey::new(content, Some(NodeId(3))), NodeId(3));
    net.end_session(true);

    let mut params = StrategyParams::default();
    params.extra_quota = 0;
    let mut s = build_strategy("DFIB_SC", params).unwrap();
    s.process_event(&mut net, 1.0, NodeId(0), content, true)
        .unwrap();
    assert_eq!(net.stats().detours, 0);
    assert_eq!(net.stats().request_hops, 2);
    assert_eq!(net.stats().source_hits, 1);
}

#[test]
fn test_detour_strategy_learns_from_deliveries() {
    // two receivers behind a shared router: once the first delivery has
    // left hints and a copy at the edge, the second receiver's request is
    // served without touching the source
    let content = ContentId(2);
    let mut net = InMemoryNetwork::builder()
        .link(NodeId(0), NodeId(2))
        .link(NodeId(1), NodeId(2))
        .link(NodeId(2), NodeId(3))
        .link(NodeId(3), NodeId(4))
        .cache(NodeId(0), 4)
        .cache(NodeId(1), 4)
        .cache(NodeId(2), 4)
        .source(NodeId(4), [content])
        .build();
    let mut params = StrategyParams::default();
    params.extra_quota = 4;
    let mut s = build_strategy("DFIB", params).unwrap();

    s.process_event(&mut net, 0.0, NodeId(0), content, true)
        .unwrap();
    assert_eq!(net.stats().source_hits, 1);
    // the placement draw cached the copy at the shared router
    assert!(net.cache_peek(NodeId(2), content));

    s.process_event(&mut net, 1.0, NodeId(1), content, true)
        .unwrap();
    assert_eq!(net.stats().source_hits, 1);
    assert_eq!(net.stats().cache_hits, 1);
}

#[test]
fn test_whole_roster_smoke() {
    // every registered strategy must process a burst of requests without
    // erroring, on a topology with caches, a source, and spare links
    for name in STRATEGY_NAMES {
        let mut net = InMemoryNetwork::builder()
            .link(NodeId(0), NodeId(1))
            .link(NodeId(1), NodeId(2))
            .link(NodeId(2), NodeId(3))
            .link(NodeId(1), NodeId(4))
            .cache(NodeId(1), 2)
            .cache(NodeId(2), 2)
            .cache(NodeId(4), 2)
            .source(NodeId(3), (0..4).map(ContentId))
            .build();
        let mut s = build_strategy(name, StrategyParams::default()).unwrap();
        let mut time = 0.0;
        for round in 0..3 {
            for c in 0..4u64 {
                let log = round > 0;
                s.process_event(&mut net, time, NodeId(0), ContentId(c), log)
                    .unwrap_or_else(|e| panic!("{name} failed: {e}"));
                time += 1.0;
            }
        }
        assert_eq!(net.stats().sessions, 8, "{name}");
    }
}

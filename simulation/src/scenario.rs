//! Topology scenarios
//!
//! Builders for the cache networks experiments run on, plus the bookkeeping
//! of which nodes issue requests. Sources sit at the far end of the network
//! and hold the whole catalog; caches sit on the interior.

use hintnet_core::{ContentId, NodeId};
use hintnet_model::{content_range, InMemoryNetwork};

/// A built network together with its request-issuing nodes
pub struct Scenario {
    pub network: InMemoryNetwork,
    pub receivers: Vec<NodeId>,
    pub catalog: Vec<ContentId>,
}

/// Line of `nodes` nodes: receiver at one end, source at the other, a cache
/// of `cache_size` at every interior node
pub fn line(nodes: u32, cache_size: usize, contents: u64) -> Scenario {
    assert!(nodes >= 3, "a line needs a receiver, a cache, and a source");
    let catalog: Vec<ContentId> = content_range(contents).collect();
    let source = NodeId(nodes - 1);
    let mut builder = InMemoryNetwork::builder().source(source, catalog.clone());
    for i in 1..nodes {
        builder = builder.link(NodeId(i - 1), NodeId(i));
    }
    for i in 1..nodes - 1 {
        builder = builder.cache(NodeId(i), cache_size);
    }
    Scenario {
        network: builder.build(),
        receivers: vec![NodeId(0)],
        catalog,
    }
}

/// Complete `arity`-ary tree of the given depth: source at the root, caches
/// at every interior node, receivers at the leaves.
///
/// With `cross_links`, consecutive nodes of each interior level are also
/// connected, which opens off-path trails for the hint-following strategies.
pub fn tree(depth: u32, arity: u32, cache_size: usize, contents: u64, cross_links: bool) -> Scenario {
    assert!(depth >= 1 && arity >= 1);
    let mut levels: Vec<Vec<NodeId>> = vec![vec![NodeId(0)]];
    let mut next = 1u32;
    for _ in 0..depth {
        let parents = levels.last().unwrap().clone();
        let mut level = Vec::new();
        for _ in 0..parents.len() as u32 * arity {
            level.push(NodeId(next));
            next += 1;
        }
        levels.push(level);
    }

    let catalog: Vec<ContentId> = content_range(contents).collect();
    let mut builder = InMemoryNetwork::builder().source(NodeId(0), catalog.clone());
    for d in 1..levels.len() {
        for (i, &child) in levels[d].iter().enumerate() {
            let parent = levels[d - 1][i / arity as usize];
            builder = builder.link(parent, child);
        }
    }
    for level in &levels[1..levels.len() - 1] {
        for &node in level {
            builder = builder.cache(node, cache_size);
        }
        if cross_links {
            for pair in level.windows(2) {
                builder = builder.link(pair[0], pair[1]);
            }
        }
    }
    Scenario {
        network: builder.build(),
        receivers: levels.last().unwrap().clone(),
        catalog,
    }
}

//! # Hintnet Model
//!
//! Network state behind the decision engine: topology, caches, hint
//! stores, and the view/controller boundary strategies act through.
//!
//! ## Core Components
//!
//! - [`Topology`]: undirected graph with link delays, BFS shortest paths,
//!   diameter, and betweenness centrality
//! - [`LruCache`]: fixed-capacity content cache reporting evictions
//! - [`NetworkView`] / [`NetworkController`]: the read-only and mutating
//!   surfaces the strategies consume
//! - [`InMemoryNetwork`]: concrete model with session trace and
//!   cumulative stats
//!
//! Strategies hold no network state of their own beyond their hint table
//! parameters; everything observable lives behind these types.

pub mod cache;
pub mod model;
pub mod network;
pub mod topology;

// Re-export main types
pub use cache::LruCache;
pub use model::{content_range, InMemoryNetwork, NetworkBuilder, NetworkStats, TraceEvent};
pub use network::{NetworkController, NetworkView};
pub use topology::Topology;

//! # Hintnet Simulation
//!
//! Request-driven experiments over the strategy roster: build a cache
//! network, draw a Zipf workload, warm the caches, and measure.
//!
//! - **Scenarios** (`scenario.rs`): line and tree topologies with caches,
//!   a source, and the nodes that issue requests
//! - **Workload** (`workload.rs`): seeded Zipf request generator
//! - **Experiment** (`experiment.rs`): warmup + measured run of one
//!   strategy over one scenario

pub mod experiment;
pub mod scenario;
pub mod workload;

// Re-export main types
pub use experiment::{summarize, Experiment};
pub use scenario::{line, tree, Scenario};
pub use workload::ZipfWorkload;

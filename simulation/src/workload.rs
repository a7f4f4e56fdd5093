//! Request workloads
//!
//! Draws (receiver, content) request pairs: receivers uniformly, contents
//! from a Zipf popularity law over the catalog.

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use hintnet_core::{ContentId, NodeId};

/// Zipf request generator over a fixed catalog and receiver set
pub struct ZipfWorkload {
    receivers: Vec<NodeId>,
    catalog: Vec<ContentId>,
    popularity: WeightedIndex<f64>,
    rng: StdRng,
}

impl ZipfWorkload {
    /// `alpha` is the Zipf skew; 0 degenerates to a uniform workload
    pub fn new(receivers: Vec<NodeId>, catalog: Vec<ContentId>, alpha: f64, seed: u64) -> Self {
        assert!(!receivers.is_empty() && !catalog.is_empty());
        let weights: Vec<f64> = (1..=catalog.len())
            .map(|rank| 1.0 / (rank as f64).powf(alpha))
            .collect();
        let popularity = WeightedIndex::new(weights).expect("catalog weights are positive");
        Self {
            receivers,
            catalog,
            popularity,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_request(&mut self) -> (NodeId, ContentId) {
        let receiver = self.receivers[self.rng.random_range(0..self.receivers.len())];
        let content = self.catalog[self.popularity.sample(&mut self.rng)];
        (receiver, content)
    }
}

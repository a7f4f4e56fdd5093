//! Strategy configuration
//!
//! One flat parameter struct covers the whole roster; each strategy reads
//! the fields it cares about and ignores the rest. All fields are fixed at
//! construction — nothing here changes while requests are in flight.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use hintnet_core::{SimTime, StrategyError};

/// Cache placement rule applied on the content return path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MetaCaching {
    /// Cache at every capable node
    #[default]
    Lce,
    /// Cache only one hop downstream of the serving node
    Lcd,
    /// Cache at each capable node with flat probability `p`
    Bernoulli,
    /// Cache at one uniformly chosen capable node
    Choice,
    /// Cache per the ProbCache law
    ProbCache,
    /// Never cache
    None,
}

impl FromStr for MetaCaching {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LCE" => Ok(Self::Lce),
            "LCD" => Ok(Self::Lcd),
            "BERNOULLI" => Ok(Self::Bernoulli),
            "CHOICE" => Ok(Self::Choice),
            "PROB_CACHE" => Ok(Self::ProbCache),
            "NONE" => Ok(Self::None),
            other => Err(StrategyError::UnknownMetaCaching(other.to_string())),
        }
    }
}

/// Immutable per-strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Flat caching probability (Bernoulli placement, probabilistic NDN)
    pub p: f64,
    /// ProbCache time window
    pub t_tw: f64,
    /// Exploration budget beyond the on-path hop count
    pub extra_quota: u32,
    /// Detour candidates consulted per on-path hop
    pub fan_out: usize,
    /// Additive quota step on detour success
    pub quota_increment: f64,
    /// Hint freshness window
    pub fresh_window: SimTime,
    /// Hint expiry TTL
    pub expiry_ttl: SimTime,
    /// Maximum hops a single off-path trail may walk
    pub max_detour: usize,
    /// Placement rule applied on the return path
    pub metacaching: MetaCaching,
    /// Cap placements at one per delivered content
    pub limit_replica: bool,
    /// CL4M: use the ego-graph betweenness approximation
    pub use_ego_betweenness: bool,
    /// NRR: rank replicas by path delay instead of hop count
    pub metric_delay: bool,
    /// Hash-routing hybrid-AM: multicast stretch as a fraction of diameter
    pub max_stretch: f64,
    /// RNG seed for the probabilistic placement draws
    pub seed: u64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            p: 1.0,
            t_tw: 10.0,
            extra_quota: 1,
            fan_out: 1,
            quota_increment: 1.0,
            fresh_window: 40.0,
            expiry_ttl: 120.0,
            max_detour: 3,
            metacaching: MetaCaching::Lce,
            limit_replica: false,
            use_ego_betweenness: false,
            metric_delay: false,
            max_stretch: 0.2,
            seed: 0,
        }
    }
}

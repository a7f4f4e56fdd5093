//! Experiment driver
//!
//! Runs one strategy over one scenario: a warmup phase that fills caches and
//! hint tables without touching the counters, then a measured phase.

use tracing::info;

use hintnet_core::StrategyResult;
use hintnet_model::NetworkStats;
use hintnet_strategies::{build_strategy, StrategyParams};

use crate::scenario::Scenario;
use crate::workload::ZipfWorkload;

pub struct Experiment {
    pub strategy: String,
    pub params: StrategyParams,
    pub warmup: usize,
    pub requests: usize,
    pub alpha: f64,
}

impl Experiment {
    /// Consume `scenario` and return its measured counters
    pub fn run(&self, mut scenario: Scenario) -> StrategyResult<NetworkStats> {
        let mut strategy = build_strategy(&self.strategy, self.params.clone())?;
        let mut workload = ZipfWorkload::new(
            scenario.receivers.clone(),
            scenario.catalog.clone(),
            self.alpha,
            self.params.seed,
        );
        let net = &mut scenario.network;

        let mut time = 0.0;
        for _ in 0..self.warmup {
            let (receiver, content) = workload.next_request();
            strategy.process_event(net, time, receiver, content, false)?;
            time += 1.0;
        }
        info!(strategy = %self.strategy, warmup = self.warmup, "warmup done");

        for _ in 0..self.requests {
            let (receiver, content) = workload.next_request();
            strategy.process_event(net, time, receiver, content, true)?;
            time += 1.0;
        }
        Ok(net.stats().clone())
    }
}

/// One-line result summary in the shape experiment logs are grepped for
pub fn summarize(strategy: &str, stats: &NetworkStats) -> String {
    format!(
        "{strategy:<18} hit_ratio={:.4} latency={:.1} req_hops={} content_hops={} \
         detours={} detour_success={:.3} detour_cost={:.1}",
        stats.cache_hit_ratio(),
        stats.latency,
        stats.request_hops,
        stats.content_hops,
        stats.detours,
        stats.detour_success_ratio(),
        stats.detour_cost,
    )
}

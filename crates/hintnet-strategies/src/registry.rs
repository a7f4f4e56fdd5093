//! Strategy registry
//!
//! A strategy is identified to the outside world by a name string plus a
//! [`StrategyParams`] set; this module is the single place that pairing is
//! resolved into a concrete state machine.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use hintnet_core::{StrategyError, StrategyResult};

use crate::breadcrumb::Breadcrumb;
use crate::detour::DetourEngine;
use crate::hashrouting::{HashRouting, HashVariant};
use crate::onpath::{EdgeCache, NearestReplica, OnPath, OnPathPlacement};
use crate::params::{MetaCaching, StrategyParams};
use crate::strategy::Strategy;

/// Every registered strategy name
pub const STRATEGY_NAMES: &[&str] = &[
    "HR_SYMM",
    "HR_ASYMM",
    "HR_MULTICAST",
    "HR_HYBRID_AM",
    "HR_HYBRID_SM",
    "NO_CACHE",
    "EDGE",
    "LCE",
    "LCD",
    "PROB_CACHE",
    "CL4M",
    "RAND_BERNOULLI",
    "RAND_CHOICE",
    "NDN",
    "NDN_PROB",
    "NRR",
    "NRR_PROB",
    "BC",
    "BC_HYBRID",
    "DFIB",
    "DFIB_SC",
    "DFIB_OPH",
    "TFIB_SC",
    "TFIB_DC",
    "TFIB_BC",
    "DETOUR_LCE",
    "DETOUR_CHOICE",
    "DETOUR_PROB_CACHE",
];

fn placement_for(mode: MetaCaching) -> OnPathPlacement {
    match mode {
        MetaCaching::Lce => OnPathPlacement::Everywhere,
        MetaCaching::Lcd => OnPathPlacement::OneDownstream,
        MetaCaching::Bernoulli => OnPathPlacement::Bernoulli,
        MetaCaching::Choice => OnPathPlacement::UniformChoice,
        MetaCaching::ProbCache => OnPathPlacement::ProbCache,
        MetaCaching::None => OnPathPlacement::Never,
    }
}

/// Build the strategy registered under `name`.
///
/// Unknown names are a construction-time configuration error; nothing
/// here can fail once the simulation is running.
pub fn build_strategy(name: &str, params: StrategyParams) -> StrategyResult<Box<dyn Strategy>> {
    let rng: Box<dyn RngCore> = Box::new(StdRng::seed_from_u64(params.seed));
    let (p, t_tw, use_ego) = (params.p, params.t_tw, params.use_ego_betweenness);
    let onpath = move |placement, check_caches, rng| {
        OnPath::new(placement, check_caches, p, t_tw, use_ego, rng)
    };
    let strategy: Box<dyn Strategy> = match name {
        "HR_SYMM" => Box::new(HashRouting::new(HashVariant::Symmetric, params.max_stretch)),
        "HR_ASYMM" => Box::new(HashRouting::new(HashVariant::Asymmetric, params.max_stretch)),
        "HR_MULTICAST" => Box::new(HashRouting::new(HashVariant::Multicast, params.max_stretch)),
        "HR_HYBRID_AM" => Box::new(HashRouting::new(HashVariant::HybridAm, params.max_stretch)),
        "HR_HYBRID_SM" => Box::new(HashRouting::new(HashVariant::HybridSm, params.max_stretch)),
        "NO_CACHE" => Box::new(onpath(OnPathPlacement::Never, false, rng)),
        "EDGE" => Box::new(EdgeCache),
        "LCE" => Box::new(onpath(OnPathPlacement::Everywhere, true, rng)),
        "LCD" => Box::new(onpath(OnPathPlacement::OneDownstream, true, rng)),
        "PROB_CACHE" => Box::new(
            onpath(OnPathPlacement::ProbCache, true, rng).without_receiver_placement(),
        ),
        "CL4M" => Box::new(onpath(OnPathPlacement::Betweenness, true, rng)),
        "RAND_BERNOULLI" => Box::new(onpath(OnPathPlacement::Bernoulli, true, rng)),
        "RAND_CHOICE" => Box::new(onpath(OnPathPlacement::UniformChoice, true, rng)),
        "NDN" => {
            // plain forwarding plus downstream hints on delivery; the
            // hints are installed but never explored
            let mut params = params;
            params.extra_quota = 0;
            Box::new(Breadcrumb::new(false, params, rng))
        }
        "NDN_PROB" => Box::new(
            onpath(OnPathPlacement::ProbCache, true, rng)
                .with_single_placement()
                .with_forced_edge(),
        ),
        "NRR" => {
            if !matches!(params.metacaching, MetaCaching::Lce | MetaCaching::Lcd) {
                return Err(StrategyError::UnknownMetaCaching(format!(
                    "{:?} (NRR supports LCE and LCD)",
                    params.metacaching
                )));
            }
            Box::new(NearestReplica::new(
                placement_for(params.metacaching),
                params.p,
                params.t_tw,
                params.metric_delay,
                rng,
            ))
        }
        "NRR_PROB" => Box::new(NearestReplica::new(
            OnPathPlacement::ProbCache,
            params.p,
            params.t_tw,
            true,
            rng,
        )),
        "BC" => Box::new(Breadcrumb::new(false, params, rng)),
        "BC_HYBRID" => Box::new(Breadcrumb::new(true, params, rng)),
        "DFIB" => Box::new(DetourEngine::dfib(params, rng)),
        "DFIB_SC" => Box::new(DetourEngine::dfib_static(params, rng)),
        "DFIB_OPH" => Box::new(DetourEngine::dfib_onpath_hint(params, rng)),
        "TFIB_SC" => Box::new(DetourEngine::tfib_static(params, rng)),
        "TFIB_DC" => Box::new(DetourEngine::tfib_dynamic(params, rng)),
        "TFIB_BC" => Box::new(DetourEngine::tfib_breadcrumb(params, rng)),
        "DETOUR_LCE" => {
            let mut params = params;
            params.metacaching = MetaCaching::Lce;
            Box::new(DetourEngine::metacache(params, rng))
        }
        "DETOUR_CHOICE" => {
            let mut params = params;
            params.metacaching = MetaCaching::Choice;
            Box::new(DetourEngine::metacache(params, rng))
        }
        "DETOUR_PROB_CACHE" => {
            let mut params = params;
            params.metacaching = MetaCaching::ProbCache;
            Box::new(DetourEngine::metacache(params, rng))
        }
        other => return Err(StrategyError::UnknownStrategy(other.to_string())),
    };
    Ok(strategy)
}

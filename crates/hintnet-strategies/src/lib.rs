//! # Hintnet Strategies
//!
//! The forwarding/caching decision engine: one polymorphic
//! [`Strategy::process_event`] call per request, a registry resolving
//! name + parameters into a concrete state machine, and three strategy
//! families behind it.
//!
//! ## Strategy Families
//!
//! - [`HashRouting`]: deterministic authoritative-cache placement with
//!   symmetric, asymmetric, multicast, and hybrid return policies
//! - [`OnPath`] / [`EdgeCache`] / [`NearestReplica`]: shortest-path
//!   forwarding with fixed placement rules, no soft state
//! - [`DetourEngine`] / [`Breadcrumb`]: soft-state off-path search over
//!   per-node hint tables, with AIMD exploration quotas, loop rollback,
//!   and multi-trail delivery
//!
//! Strategies never own network state; everything flows through the
//! view/controller boundary of `hintnet-model`.

pub mod breadcrumb;
pub mod detour;
pub mod hashrouting;
pub mod onpath;
pub mod params;
pub mod placement;
pub mod registry;
pub mod strategy;

// Re-export main types
pub use breadcrumb::Breadcrumb;
pub use detour::{DetourEngine, HintDirection};
pub use hashrouting::{HashRouting, HashVariant};
pub use onpath::{EdgeCache, NearestReplica, OnPath, OnPathPlacement};
pub use params::{MetaCaching, StrategyParams};
pub use placement::ProbCacheWalk;
pub use registry::{build_strategy, STRATEGY_NAMES};
pub use strategy::{ForwardOutcome, Strategy};

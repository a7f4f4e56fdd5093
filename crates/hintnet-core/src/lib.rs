//! # Hintnet Core
//!
//! Foundational types for the hintnet caching and forwarding simulator.
//!
//! This crate provides the identifiers, the logical clock convention, and
//! the shared error types used by every other crate in the workspace.
//!
//! ## Key Types
//!
//! - [`NodeId`]: Opaque identifier for a network node
//! - [`ContentId`]: Opaque identifier for a named content item
//! - [`SimTime`]: Logical, monotonically non-decreasing event time
//! - [`StrategyError`]: Fatal and configuration errors of the decision engine
//!
//! ## Time model
//!
//! Time is a logical value supplied by the calling harness per event. It is
//! never read from a wall clock; "expiration" of soft state is purely a
//! comparison between stored logical timestamps and the current event time.

pub mod error;
pub mod ids;

// Re-export main types
pub use error::*;
pub use ids::*;

//! Playout Core - environment abstraction and shared types
//!
//! This crate defines the narrow interface the search engine consumes from
//! a game simulator, plus value types shared by the engine and its callers.
//!
//! # Types
//!
//! - [`Environment`] - Trait for simulated environments
//! - [`Step`] - Result of simulating one action
//! - [`ActionDistribution`] - Probability distribution over actions (sums to 1.0)

mod environment;
mod error;
mod types;

pub use environment::{ActionId, Environment, Step};
pub use error::{DistributionError, EnvironmentError, Result};
pub use types::{ActionDistribution, DISTRIBUTION_SUM_TOLERANCE};

//! Monte Carlo Tree Search decision engine.
//!
//! This crate provides a generic MCTS implementation that can be used with
//! any environment implementing the `playout_core::Environment` trait.
//!
//! # Features
//!
//! - **Generic**: Works with any `Environment` implementation
//! - **UCT Selection**: Unvisited children first, then value plus prior-weighted exploration
//! - **Estimator Abstraction**: Random rollouts by default, or priors and values from an `Estimator`
//! - **Dirichlet Noise**: Adds exploration noise at the root node
//! - **Temperature Sampling**: Visit counts to a distribution, sampled or argmaxed
//! - **Tree Reuse**: Re-root at the action actually played
//! - **Self-Play**: Iterator of training examples with back-filled outcomes
//!
//! # Example
//!
//! ```
//! use playout_core::Environment;
//! use playout_mcts::{games::TwoArm, Mcts, MctsConfig};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let env = TwoArm::default();
//! let state = env.initial_state();
//!
//! let config = MctsConfig::with_simulations(50).with_temperature(0.0);
//! let rng = ChaCha8Rng::seed_from_u64(42);
//! let mut mcts = Mcts::new(config, rng).unwrap();
//!
//! let action = mcts.search(&env, &state).unwrap();
//! assert_eq!(action, Some(0));
//!
//! let stats = mcts.statistics().unwrap();
//! println!("Best value: {}", stats.best_value);
//! ```

pub mod config;
pub mod distribution;
pub mod estimator;
pub mod games;
mod node;
pub mod noise;
mod rollout;
pub mod search;
pub mod selfplay;
pub mod tree;

pub use config::{ConfigError, MctsConfig};
pub use distribution::{sample_action, visit_distribution};
pub use estimator::{Estimate, Estimator, EstimatorError, NoEstimator, UniformEstimator};
pub use node::{Node, NodeId};
pub use rollout::rollout;
pub use search::{Mcts, SearchError, SearchResult, SearchStatistics};
pub use selfplay::{EpisodeSummary, SelfPlay, SelfPlayConfig, TrainingExample};
pub use tree::{Tree, TreeError};

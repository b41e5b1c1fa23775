//! MCTS configuration parameters.
//!
//! These parameters control the behavior of the Monte Carlo Tree Search algorithm.
//! A config is validated when the search agent is built, so an agent never runs
//! with out-of-range settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for invalid configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("num_simulations must be at least 1")]
    NoSimulations,

    #[error("exploration_constant must be finite and non-negative, got {0}")]
    InvalidExplorationConstant(f64),

    #[error("discount must be in (0, 1], got {0}")]
    InvalidDiscount(f64),

    #[error("dirichlet_alpha must be finite and non-negative, got {0}")]
    InvalidDirichletAlpha(f64),

    #[error("dirichlet_epsilon must be in [0, 1], got {0}")]
    InvalidDirichletEpsilon(f64),

    #[error("temperature must be finite and non-negative, got {0}")]
    InvalidTemperature(f64),

    #[error("use_estimator is set but no estimator was provided")]
    MissingEstimator,
}

/// MCTS configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// Number of simulations per search.
    pub num_simulations: usize,

    /// Exploration constant of the UCT formula.
    /// Higher values encourage exploration, lower values favor exploitation.
    pub exploration_constant: f64,

    /// Per-step discount applied to rewards inside rollouts.
    pub discount: f64,

    /// Maximum number of steps in a single rollout.
    pub max_depth: usize,

    /// Dirichlet noise alpha for root exploration. 0 disables noise.
    pub dirichlet_alpha: f64,

    /// Fraction of the root prior replaced with Dirichlet noise.
    /// 0 = no exploration noise, 1 = pure noise.
    pub dirichlet_epsilon: f64,

    /// Temperature for action selection after search.
    /// - 0.0: always pick highest visit count (greedy)
    /// - 1.0: sample proportional to visit counts
    /// - <1.0: more peaked distribution
    pub temperature: f64,

    /// Move number at which temperature drops to 0 during self-play.
    /// Set to 0 to always use the configured temperature.
    pub temperature_drop_move: usize,

    /// Whether leaf values and priors come from the attached estimator
    /// instead of uniform priors and random rollouts.
    pub use_estimator: bool,

    /// Optional wall-clock budget per search, in milliseconds.
    /// Checked once per simulation, never inside one.
    pub time_budget_ms: Option<u64>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: 800,
            exploration_constant: std::f64::consts::SQRT_2,
            discount: 0.99,
            max_depth: 100,
            dirichlet_alpha: 0.3,
            dirichlet_epsilon: 0.25,
            temperature: 1.0,
            temperature_drop_move: 0,
            use_estimator: false,
            time_budget_ms: None,
        }
    }
}

impl MctsConfig {
    /// Create a new config with the specified number of simulations.
    pub fn with_simulations(num_simulations: usize) -> Self {
        Self {
            num_simulations,
            ..Default::default()
        }
    }

    /// Create a config for evaluation (greedy action selection, no noise).
    pub fn for_evaluation(num_simulations: usize) -> Self {
        Self {
            num_simulations,
            temperature: 0.0,
            dirichlet_alpha: 0.0,
            dirichlet_epsilon: 0.0,
            ..Default::default()
        }
    }

    /// Create a config for self-play training: root noise, proportional
    /// sampling for the opening moves, greedy afterwards.
    pub fn for_training(num_simulations: usize) -> Self {
        Self {
            num_simulations,
            temperature_drop_move: 30,
            ..Default::default()
        }
    }

    /// Builder pattern: set exploration constant.
    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration_constant = c;
        self
    }

    /// Builder pattern: set temperature.
    pub fn with_temperature(mut self, t: f64) -> Self {
        self.temperature = t;
        self
    }

    /// Builder pattern: set Dirichlet noise parameters.
    pub fn with_noise(mut self, alpha: f64, epsilon: f64) -> Self {
        self.dirichlet_alpha = alpha;
        self.dirichlet_epsilon = epsilon;
        self
    }

    /// Builder pattern: set rollout discount and depth.
    pub fn with_rollout(mut self, discount: f64, max_depth: usize) -> Self {
        self.discount = discount;
        self.max_depth = max_depth;
        self
    }

    /// Builder pattern: enable or disable the estimator.
    pub fn with_estimator(mut self, enabled: bool) -> Self {
        self.use_estimator = enabled;
        self
    }

    /// Builder pattern: set the per-search time budget.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget_ms = Some(budget.as_millis() as u64);
        self
    }

    /// Per-search time budget, if any.
    pub fn budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }

    /// Get the effective temperature for a given move number.
    pub fn effective_temperature(&self, move_number: usize) -> f64 {
        if self.temperature_drop_move > 0 && move_number >= self.temperature_drop_move {
            0.0
        } else {
            self.temperature
        }
    }

    /// Check every parameter against its valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_simulations == 0 {
            return Err(ConfigError::NoSimulations);
        }
        if !self.exploration_constant.is_finite() || self.exploration_constant < 0.0 {
            return Err(ConfigError::InvalidExplorationConstant(
                self.exploration_constant,
            ));
        }
        if !(self.discount > 0.0 && self.discount <= 1.0) {
            return Err(ConfigError::InvalidDiscount(self.discount));
        }
        if !self.dirichlet_alpha.is_finite() || self.dirichlet_alpha < 0.0 {
            return Err(ConfigError::InvalidDirichletAlpha(self.dirichlet_alpha));
        }
        if !(0.0..=1.0).contains(&self.dirichlet_epsilon) {
            return Err(ConfigError::InvalidDirichletEpsilon(self.dirichlet_epsilon));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        Ok(())
    }
}

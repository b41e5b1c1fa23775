//! Estimator abstraction for MCTS.
//!
//! An `Estimator` replaces two parts of plain MCTS when it is enabled:
//! - Expansion: children get the estimator's priors instead of uniform ones
//! - Evaluation: leaves get the estimator's value instead of a random rollout
//!
//! Estimator output is checked against the legal actions before the search
//! uses it. A malformed estimate aborts the search.

use std::collections::HashMap;

use playout_core::{ActionId, Environment};
use thiserror::Error;

/// Tolerance for the sum of estimator priors.
pub const PRIOR_SUM_TOLERANCE: f64 = 1e-3;

/// Errors from an estimator call or from checking its output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimatorError {
    #[error("Estimator failed: {0}")]
    Failed(String),

    #[error("Priors sum to {sum}, expected 1.0")]
    PriorsNotNormalized { sum: f64 },

    #[error("No prior for legal action {0}")]
    MissingPrior(ActionId),

    #[error("Prior given for action {0}, which is not legal")]
    UnexpectedAction(ActionId),

    #[error("Prior for action {action} is {prior}, expected a finite value in [0, 1]")]
    InvalidPrior { action: ActionId, prior: f64 },

    #[error("Estimated value is not finite: {0}")]
    NonFiniteValue(f64),
}

/// Estimator output: prior over the legal actions plus a value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Estimate {
    /// Prior probability for each legal action, summing to 1.0.
    pub priors: HashMap<ActionId, f64>,

    /// Value of the state, higher is better for the acting player.
    pub value: f64,
}

impl Estimate {
    /// Uniform priors over `legal` with the given value.
    pub fn uniform(legal: &[ActionId], value: f64) -> Self {
        let prior = if legal.is_empty() {
            0.0
        } else {
            1.0 / legal.len() as f64
        };
        Self {
            priors: legal.iter().map(|&a| (a, prior)).collect(),
            value,
        }
    }

    /// Check this estimate against the legal actions of the evaluated state.
    ///
    /// Terminal states (no legal actions) accept an empty prior map.
    pub fn validate(&self, legal: &[ActionId]) -> Result<(), EstimatorError> {
        if !self.value.is_finite() {
            return Err(EstimatorError::NonFiniteValue(self.value));
        }
        if legal.is_empty() && self.priors.is_empty() {
            return Ok(());
        }

        for &action in legal {
            if !self.priors.contains_key(&action) {
                return Err(EstimatorError::MissingPrior(action));
            }
        }
        for (&action, &prior) in &self.priors {
            if !legal.contains(&action) {
                return Err(EstimatorError::UnexpectedAction(action));
            }
            if !prior.is_finite() || !(0.0..=1.0 + PRIOR_SUM_TOLERANCE).contains(&prior) {
                return Err(EstimatorError::InvalidPrior { action, prior });
            }
        }

        let sum: f64 = self.priors.values().sum();
        if (sum - 1.0).abs() > PRIOR_SUM_TOLERANCE {
            return Err(EstimatorError::PriorsNotNormalized { sum });
        }
        Ok(())
    }

    /// Priors in `legal` order. Call after `validate`.
    pub fn priors_for(&self, legal: &[ActionId]) -> Vec<f64> {
        legal
            .iter()
            .map(|a| self.priors.get(a).copied().unwrap_or(0.0))
            .collect()
    }
}

/// Trait for evaluating states with a learned (or hand-written) model.
///
/// This abstraction allows MCTS to swap random rollouts for a policy/value
/// estimator without touching the search loop.
pub trait Estimator<E: Environment> {
    /// Evaluate a state, returning priors over its legal actions and a value.
    ///
    /// Priors must cover exactly the legal actions and sum to 1.0 (±1e-3).
    fn evaluate(&self, env: &E, state: &E::State) -> Result<Estimate, EstimatorError>;
}

impl<E: Environment, T: Estimator<E> + ?Sized> Estimator<E> for &T {
    fn evaluate(&self, env: &E, state: &E::State) -> Result<Estimate, EstimatorError> {
        (**self).evaluate(env, state)
    }
}

/// Placeholder estimator type for agents that only use rollouts.
///
/// Uninhabited: an agent typed with `NoEstimator` can never hold one.
#[derive(Clone, Copy, Debug)]
pub enum NoEstimator {}

impl<E: Environment> Estimator<E> for NoEstimator {
    fn evaluate(&self, _env: &E, _state: &E::State) -> Result<Estimate, EstimatorError> {
        match *self {}
    }
}

/// Estimator with uniform priors and a constant value.
///
/// Useful as a baseline and for exercising the estimator path without a model.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UniformEstimator {
    value: f64,
}

impl UniformEstimator {
    /// Create an estimator returning `value` for every state.
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl<E: Environment> Estimator<E> for UniformEstimator {
    fn evaluate(&self, env: &E, state: &E::State) -> Result<Estimate, EstimatorError> {
        let legal = env
            .legal_actions(state)
            .map_err(|e| EstimatorError::Failed(e.to_string()))?;
        Ok(Estimate::uniform(&legal, self.value))
    }
}

use thiserror::Error;

use crate::ActionId;

/// Errors raised by an environment while answering search queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvironmentError {
    #[error("Illegal action {action} for the given state")]
    IllegalAction { action: ActionId },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Simulator failure: {0}")]
    Simulator(String),
}

/// Errors raised when building an action distribution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistributionError {
    #[error("Distribution cannot be empty")]
    Empty,

    #[error("Action {action} has invalid probability {probability}")]
    InvalidProbability { action: ActionId, probability: f64 },

    #[error("Action {0} appears more than once")]
    DuplicateAction(ActionId),

    #[error("Probabilities sum to {sum}, expected 1.0")]
    NotNormalized { sum: f64 },
}

/// Convenience Result type for environment operations
pub type Result<T> = std::result::Result<T, EnvironmentError>;

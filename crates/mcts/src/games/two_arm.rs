//! Two-armed bandit with a single decision.

use playout_core::{ActionId, Environment, EnvironmentError, Result, Step};
use serde::{Deserialize, Serialize};

/// State of a [`TwoArm`] episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TwoArmState {
    /// No arm pulled yet.
    Start,
    /// The given arm was pulled; the episode is over.
    Pulled(ActionId),
}

/// One decision between arm 0 and arm 1, each ending the episode.
///
/// The arms carry no step reward; their worth is the terminal value of the
/// state they lead to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TwoArm {
    values: [f64; 2],
}

impl TwoArm {
    /// Create a bandit whose arms are worth `a` and `b`.
    pub fn new(a: f64, b: f64) -> Self {
        Self { values: [a, b] }
    }
}

impl Default for TwoArm {
    /// Arm 0 wins (+1), arm 1 loses (-1).
    fn default() -> Self {
        Self::new(1.0, -1.0)
    }
}

impl Environment for TwoArm {
    type State = TwoArmState;

    fn initial_state(&self) -> Self::State {
        TwoArmState::Start
    }

    fn legal_actions(&self, state: &Self::State) -> Result<Vec<ActionId>> {
        Ok(match state {
            TwoArmState::Start => vec![0, 1],
            TwoArmState::Pulled(_) => Vec::new(),
        })
    }

    fn simulate_step(&self, state: &Self::State, action: ActionId) -> Result<Step<Self::State>> {
        match (state, action) {
            (TwoArmState::Start, 0 | 1) => Ok(Step {
                reward: 0.0,
                next_state: TwoArmState::Pulled(action),
                done: true,
            }),
            _ => Err(EnvironmentError::IllegalAction { action }),
        }
    }

    fn terminal_value(&self, state: &Self::State) -> Result<f64> {
        match state {
            TwoArmState::Pulled(arm) => self
                .values
                .get(*arm as usize)
                .copied()
                .ok_or_else(|| EnvironmentError::InvalidState(format!("unknown arm {arm}"))),
            TwoArmState::Start => Err(EnvironmentError::InvalidState(
                "no arm pulled yet".to_string(),
            )),
        }
    }
}

//! One-dimensional corridor walk.
//!
//! The agent starts at cell 0 and must reach the goal at cell `length`.
//! Every step costs a little, so the shortest walk (always right) is optimal:
//! - MCTS should prefer `RIGHT` from every cell
//! - Self-play episodes with a greedy agent take exactly `length` moves

use std::fmt;

use playout_core::{ActionId, Environment, EnvironmentError, Result, Step};
use serde::{Deserialize, Serialize};

/// Move one cell towards 0 (staying put at the wall).
pub const LEFT: ActionId = 0;

/// Move one cell towards the goal.
pub const RIGHT: ActionId = 1;

/// Reward of every step.
pub const STEP_COST: f64 = -0.01;

/// Extra reward for arriving at the goal.
pub const GOAL_REWARD: f64 = 1.0;

/// Position in the corridor plus steps taken so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorridorState {
    pub position: u32,
    pub steps: u32,
}

/// Corridor of cells `0..=length` with an episode step cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Corridor {
    length: u32,
    max_steps: u32,
}

impl Corridor {
    /// Create a corridor with the goal at `length`, ending episodes after
    /// `max_steps` moves.
    pub fn new(length: u32, max_steps: u32) -> Self {
        Self { length, max_steps }
    }

    /// Goal cell.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Step cap.
    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Whether `state` is the goal.
    pub fn at_goal(&self, state: &CorridorState) -> bool {
        state.position >= self.length
    }

    fn is_done(&self, state: &CorridorState) -> bool {
        self.at_goal(state) || state.steps >= self.max_steps
    }
}

impl Default for Corridor {
    fn default() -> Self {
        Self::new(5, 20)
    }
}

impl Environment for Corridor {
    type State = CorridorState;

    fn initial_state(&self) -> Self::State {
        CorridorState::default()
    }

    fn legal_actions(&self, state: &Self::State) -> Result<Vec<ActionId>> {
        if state.position > self.length {
            return Err(EnvironmentError::InvalidState(format!(
                "position {} beyond goal {}",
                state.position, self.length
            )));
        }
        if self.is_done(state) {
            Ok(Vec::new())
        } else {
            Ok(vec![LEFT, RIGHT])
        }
    }

    fn simulate_step(&self, state: &Self::State, action: ActionId) -> Result<Step<Self::State>> {
        if self.is_done(state) {
            return Err(EnvironmentError::IllegalAction { action });
        }

        let position = match action {
            LEFT => state.position.saturating_sub(1),
            RIGHT => state.position + 1,
            _ => return Err(EnvironmentError::IllegalAction { action }),
        };
        let next_state = CorridorState {
            position,
            steps: state.steps + 1,
        };

        let mut reward = STEP_COST;
        if self.at_goal(&next_state) {
            reward += GOAL_REWARD;
        }

        Ok(Step {
            reward,
            done: self.is_done(&next_state),
            next_state,
        })
    }

    fn terminal_value(&self, state: &Self::State) -> Result<f64> {
        Ok(if self.at_goal(state) { 1.0 } else { 0.0 })
    }
}

impl fmt::Display for CorridorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell {} after {} steps", self.position, self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let env = Corridor::new(3, 10);
        let state = env.initial_state();
        assert_eq!(state.position, 0);
        assert_eq!(state.steps, 0);
        assert_eq!(env.legal_actions(&state).unwrap(), vec![LEFT, RIGHT]);
    }

    #[test]
    fn test_left_at_wall_stays() {
        let env = Corridor::new(3, 10);
        let step = env.simulate_step(&env.initial_state(), LEFT).unwrap();
        assert_eq!(step.next_state.position, 0);
        assert_eq!(step.next_state.steps, 1);
        assert!((step.reward - STEP_COST).abs() < 1e-12);
        assert!(!step.done);
    }

    #[test]
    fn test_reach_goal() {
        let env = Corridor::new(2, 10);
        let mut state = env.initial_state();
        let mut total = 0.0;
        let mut done = false;
        while !done {
            let step = env.simulate_step(&state, RIGHT).unwrap();
            total += step.reward;
            done = step.done;
            state = step.next_state;
        }

        assert_eq!(state.position, 2);
        assert!((total - (2.0 * STEP_COST + GOAL_REWARD)).abs() < 1e-12);
        assert!(env.legal_actions(&state).unwrap().is_empty());
        assert_eq!(env.terminal_value(&state).unwrap(), 1.0);
    }

    #[test]
    fn test_step_cap_ends_episode() {
        let env = Corridor::new(5, 2);
        let first = env.simulate_step(&env.initial_state(), LEFT).unwrap();
        let second = env.simulate_step(&first.next_state, RIGHT).unwrap();

        assert!(second.done);
        assert_eq!(env.terminal_value(&second.next_state).unwrap(), 0.0);
        assert_eq!(
            env.simulate_step(&second.next_state, RIGHT),
            Err(EnvironmentError::IllegalAction { action: RIGHT })
        );
    }

    #[test]
    fn test_unknown_action() {
        let env = Corridor::default();
        assert_eq!(
            env.simulate_step(&env.initial_state(), 7),
            Err(EnvironmentError::IllegalAction { action: 7 })
        );
    }

    #[test]
    fn test_display() {
        let state = CorridorState {
            position: 2,
            steps: 4,
        };
        assert_eq!(state.to_string(), "cell 2 after 4 steps");
    }
}

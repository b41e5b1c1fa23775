//! Random rollouts for leaf evaluation.

use playout_core::{Environment, Result};
use rand::Rng;

/// Play uniformly random legal actions from `state` and return the
/// discounted reward sum.
///
/// Stops after `max_depth` steps, when a step reports `done`, or when the
/// reached state has no legal actions. The reward of the step taken at
/// depth `d` is weighted by `discount^d`.
pub fn rollout<E, R>(
    env: &E,
    state: &E::State,
    max_depth: usize,
    discount: f64,
    rng: &mut R,
) -> Result<f64>
where
    E: Environment,
    R: Rng,
{
    let mut state = state.clone();
    let mut total = 0.0;
    let mut weight = 1.0;

    for _ in 0..max_depth {
        let legal = env.legal_actions(&state)?;
        if legal.is_empty() {
            break;
        }

        let action = legal[rng.gen_range(0..legal.len())];
        let step = env.simulate_step(&state, action)?;
        total += step.reward * weight;
        weight *= discount;

        if step.done {
            break;
        }
        state = step.next_state;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{Corridor, TwoArm};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_rollout_zero_depth() {
        let env = Corridor::new(3, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let value = rollout(&env, &env.initial_state(), 0, 0.9, &mut rng).unwrap();
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_rollout_stops_on_done() {
        // One step from the goal: moving right ends the episode, moving left
        // costs a step. Either way the walk is bounded by the step cap.
        let env = Corridor::new(1, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            let value = rollout(&env, &env.initial_state(), 100, 1.0, &mut rng).unwrap();
            assert!(value <= 1.0);
            assert!(value >= -0.04 - 1e-12);
        }
    }

    #[test]
    fn test_rollout_discounts_by_depth() {
        // Length 2 corridor with only rightward moves succeeding after two
        // steps: -0.01 at depth 0, then +1.0 - 0.01 at depth 1.
        let env = Corridor::new(2, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut seen_goal = false;
        for _ in 0..50 {
            let value = rollout(&env, &env.initial_state(), 10, 0.5, &mut rng).unwrap();
            if value > 0.0 {
                assert!((value - (-0.01 + 0.5 * 0.99)).abs() < 1e-12);
                seen_goal = true;
            }
        }
        assert!(seen_goal);
    }

    #[test]
    fn test_rollout_from_terminal_state() {
        let env = TwoArm::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let step = env.simulate_step(&env.initial_state(), 0).unwrap();
        let value = rollout(&env, &step.next_state, 10, 0.99, &mut rng).unwrap();
        assert_eq!(value, 0.0);
    }
}

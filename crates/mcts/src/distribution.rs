//! Visit counts to action distributions, and sampling from them.

use playout_core::{ActionDistribution, ActionId, DistributionError};
use rand::Rng;

/// Build the action distribution for root visit counts under `temperature`.
///
/// - `temperature == 0`: all mass on the most visited action, ties going to
///   the first in order.
/// - `temperature > 0`: `visits^(1/T)` normalized over the visited actions.
///   Unvisited actions get no entry. Falls back to the greedy rule when every
///   count is zero, or when `1/T` overflows.
///
/// Weights are computed relative to the largest count so small temperatures
/// cannot overflow.
pub fn visit_distribution(
    visits: &[(ActionId, u32)],
    temperature: f64,
) -> Result<ActionDistribution, DistributionError> {
    let greedy = greedy_action(visits).ok_or(DistributionError::Empty)?;
    let max_visits = visits.iter().map(|(_, n)| *n).max().unwrap_or(0);

    let inv_temp = 1.0 / temperature;
    if temperature <= 0.0 || max_visits == 0 || inv_temp.is_infinite() {
        return Ok(ActionDistribution::deterministic(greedy));
    }

    let max_ln = (max_visits as f64).ln();
    let weights = visits
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|&(action, n)| (action, (((n as f64).ln() - max_ln) * inv_temp).exp()))
        .collect();
    ActionDistribution::from_weights(weights)
}

/// Most visited action, ties going to the first in order.
pub fn greedy_action(visits: &[(ActionId, u32)]) -> Option<ActionId> {
    let mut best: Option<(ActionId, u32)> = None;
    for &(action, n) in visits {
        match best {
            Some((_, best_n)) if n <= best_n => {}
            _ => best = Some((action, n)),
        }
    }
    best.map(|(action, _)| action)
}

/// Sample an action from `dist`.
///
/// Draws `u` in [0, 1) and returns the first action whose cumulative
/// probability exceeds it, or the last action if rounding leaves the total
/// short of `u`.
pub fn sample_action<R: Rng>(dist: &ActionDistribution, rng: &mut R) -> ActionId {
    let u: f64 = rng.gen();
    let mut cumulative = 0.0;
    let mut last = None;
    for &(action, p) in dist {
        cumulative += p;
        if cumulative > u {
            return action;
        }
        last = Some(action);
    }
    // A distribution is never empty, so `last` is set
    last.unwrap_or_else(|| dist.argmax())
}

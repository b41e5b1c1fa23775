//! Shared value types with enforced invariants.
//!
//! - ActionDistribution: probability distribution over actions summing to 1.0

use serde::{Deserialize, Serialize};

use crate::{ActionId, DistributionError};

/// Tolerance for distribution sum validation.
pub const DISTRIBUTION_SUM_TOLERANCE: f64 = 1e-6;

/// A probability distribution over a set of actions.
///
/// Invariant: non-empty, no duplicate actions, every probability is finite
/// and in [0, 1], and the probabilities sum to 1.0 (±1e-6).
/// Entries keep the order they were built in, which is the order sampling
/// walks them.
///
/// # Example
/// ```
/// use playout_core::ActionDistribution;
///
/// let dist = ActionDistribution::new(vec![(0, 0.25), (3, 0.75)]).unwrap();
/// assert_eq!(dist.probability(3), 0.75);
/// assert_eq!(dist.probability(1), 0.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(ActionId, f64)>", into = "Vec<(ActionId, f64)>")]
pub struct ActionDistribution(Vec<(ActionId, f64)>);

impl ActionDistribution {
    /// Create a distribution from `(action, probability)` pairs.
    ///
    /// # Errors
    /// Returns a `DistributionError` if the pairs are empty, contain a
    /// duplicate action, an out-of-range probability, or do not sum to 1.0.
    pub fn new(entries: Vec<(ActionId, f64)>) -> Result<Self, DistributionError> {
        check_entries(&entries)?;

        let sum: f64 = entries.iter().map(|(_, p)| p).sum();
        if (sum - 1.0).abs() > DISTRIBUTION_SUM_TOLERANCE {
            return Err(DistributionError::NotNormalized { sum });
        }

        Ok(Self(entries))
    }

    /// Create a distribution from non-negative weights, normalizing them.
    ///
    /// # Errors
    /// Returns an error if the weights are empty, negative, non-finite,
    /// duplicated, or all zero.
    pub fn from_weights(weights: Vec<(ActionId, f64)>) -> Result<Self, DistributionError> {
        if weights.is_empty() {
            return Err(DistributionError::Empty);
        }
        for &(action, weight) in &weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(DistributionError::InvalidProbability {
                    action,
                    probability: weight,
                });
            }
        }

        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if sum <= 0.0 || !sum.is_finite() {
            return Err(DistributionError::NotNormalized { sum });
        }

        let normalized = weights.into_iter().map(|(a, w)| (a, w / sum)).collect();
        Self::new(normalized)
    }

    /// A distribution putting all mass on a single action.
    pub fn deterministic(action: ActionId) -> Self {
        Self(vec![(action, 1.0)])
    }

    /// Probability assigned to `action`, 0.0 if the action is not represented.
    pub fn probability(&self, action: ActionId) -> f64 {
        self.0
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, p)| *p)
            .unwrap_or(0.0)
    }

    /// Number of represented actions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed distribution.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all probabilities (should be ~1.0).
    pub fn sum(&self) -> f64 {
        self.0.iter().map(|(_, p)| p).sum()
    }

    /// Action with the highest probability. Ties go to the earliest entry.
    pub fn argmax(&self) -> ActionId {
        let mut best = self.0[0];
        for &(action, p) in &self.0[1..] {
            if p > best.1 {
                best = (action, p);
            }
        }
        best.0
    }

    /// Iterate over the actions in entry order.
    pub fn actions(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.0.iter().map(|(a, _)| *a)
    }

    /// Iterate over `(action, probability)` pairs in entry order.
    pub fn iter(&self) -> impl Iterator<Item = &(ActionId, f64)> {
        self.0.iter()
    }

    /// Get a reference to the underlying pairs.
    pub fn as_slice(&self) -> &[(ActionId, f64)] {
        &self.0
    }

    /// Get the underlying pairs (consumes self).
    pub fn into_inner(self) -> Vec<(ActionId, f64)> {
        self.0
    }
}

fn check_entries(entries: &[(ActionId, f64)]) -> Result<(), DistributionError> {
    if entries.is_empty() {
        return Err(DistributionError::Empty);
    }

    for (i, &(action, probability)) in entries.iter().enumerate() {
        let in_range = (0.0..=1.0 + DISTRIBUTION_SUM_TOLERANCE).contains(&probability);
        if !probability.is_finite() || !in_range {
            return Err(DistributionError::InvalidProbability {
                action,
                probability,
            });
        }
        if entries[..i].iter().any(|(a, _)| *a == action) {
            return Err(DistributionError::DuplicateAction(action));
        }
    }

    Ok(())
}

impl TryFrom<Vec<(ActionId, f64)>> for ActionDistribution {
    type Error = DistributionError;

    fn try_from(entries: Vec<(ActionId, f64)>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<ActionDistribution> for Vec<(ActionId, f64)> {
    fn from(dist: ActionDistribution) -> Self {
        dist.0
    }
}

impl<'a> IntoIterator for &'a ActionDistribution {
    type Item = &'a (ActionId, f64);
    type IntoIter = std::slice::Iter<'a, (ActionId, f64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

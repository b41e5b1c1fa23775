//! Dirichlet exploration noise for the root priors.

use rand::Rng;
use rand_distr::Exp1;

use crate::tree::Tree;

/// Sample `n` noise weights summing to 1.0.
///
/// Each weight is `(-ln U)^(1/alpha)` for uniform `U`, normalized. `-ln U`
/// is drawn as a unit exponential. Falls back to uniform weights if the
/// draws underflow or overflow.
pub fn dirichlet_noise<R: Rng>(n: usize, alpha: f64, rng: &mut R) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }

    let inv_alpha = 1.0 / alpha;
    let raw: Vec<f64> = (0..n)
        .map(|_| {
            let e: f64 = rng.sample(Exp1);
            e.powf(inv_alpha)
        })
        .collect();

    let sum: f64 = raw.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return vec![1.0 / n as f64; n];
    }
    raw.into_iter().map(|x| x / sum).collect()
}

/// Mix Dirichlet noise into the priors of the root's children.
///
/// `prior = (1 - epsilon) * prior + epsilon * noise`. Does nothing when the
/// root has no children.
pub fn apply_root_noise<S, R: Rng>(
    tree: &mut Tree<S>,
    alpha: f64,
    epsilon: f64,
    rng: &mut R,
) {
    let children: Vec<_> = tree
        .root_node()
        .children
        .iter()
        .map(|(_, id)| *id)
        .collect();
    if children.is_empty() {
        return;
    }

    let noise = dirichlet_noise(children.len(), alpha, rng);
    for (id, eta) in children.into_iter().zip(noise) {
        let child = tree.get_mut(id);
        child.prior = (1.0 - epsilon) * child.prior + epsilon * eta;
    }
}

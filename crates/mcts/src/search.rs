//! Monte Carlo Tree Search implementation.
//!
//! Every simulation runs the four classic phases:
//! SELECT (UCT descent) -> EXPAND (one child per legal action) ->
//! EVALUATE (terminal value, estimator value or random rollout) ->
//! BACKPROPAGATE (same value up to the root).

use std::time::Instant;

use playout_core::{ActionDistribution, ActionId, DistributionError, Environment, EnvironmentError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{
    config::{ConfigError, MctsConfig},
    distribution::{sample_action, visit_distribution},
    estimator::{Estimator, EstimatorError, NoEstimator},
    node::NodeId,
    noise::apply_root_noise,
    rollout::rollout,
    tree::{Tree, TreeError},
};

/// Errors that abort a search.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("Estimator error: {0}")]
    Estimator(#[from] EstimatorError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("Distribution error: {0}")]
    Distribution(#[from] DistributionError),
}

/// Result of an MCTS search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Selected action (sampled, or greedy at temperature 0).
    pub action: ActionId,

    /// Distribution the action was drawn from.
    pub distribution: ActionDistribution,

    /// Visit count for each root child, in legal-action order.
    pub visit_counts: Vec<(ActionId, u32)>,

    /// Mean value backpropagated through the root.
    pub root_value: f64,

    /// Simulations actually run (fewer than configured if the deadline hit).
    pub simulations: usize,
}

/// Summary of the most recent search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchStatistics {
    /// Simulations run.
    pub simulations: usize,

    /// Depth of the deepest node below the root.
    pub max_depth: u32,

    /// Nodes in the tree.
    pub node_count: usize,

    /// Visits through the root (includes visits kept from a reused tree).
    pub root_visits: u32,

    /// Most visited root action (None when the root is terminal).
    pub best_action: Option<ActionId>,

    /// Mean value of the most visited root child.
    pub best_value: f64,
}

impl SearchStatistics {
    /// Summarize `tree` after running `simulations` simulations.
    pub fn from_tree<S>(tree: &Tree<S>, simulations: usize) -> Self {
        let best = tree.most_visited_child();
        Self {
            simulations,
            max_depth: tree.max_depth(),
            node_count: tree.len(),
            root_visits: tree.root_node().visit_count,
            best_action: best.map(|(action, _)| action),
            best_value: best.map(|(_, node)| node.value()).unwrap_or(0.0),
        }
    }
}

/// Monte Carlo Tree Search agent with UCT selection.
///
/// Generic over:
/// - `E`: The environment being searched
/// - `R`: The random number generator (noise, rollouts, sampling)
/// - `P`: The optional estimator ([`NoEstimator`] for rollout-only agents)
///
/// The agent owns its tree between calls so the subtree of the action
/// actually played can be reused via [`Mcts::update_root`].
pub struct Mcts<E: Environment, R, P = NoEstimator> {
    config: MctsConfig,
    estimator: Option<P>,
    rng: R,
    tree: Option<Tree<E::State>>,
    last_stats: Option<SearchStatistics>,
}

impl<E, R> Mcts<E, R, NoEstimator>
where
    E: Environment,
    R: Rng,
{
    /// Create a rollout-only MCTS agent.
    ///
    /// # Errors
    /// Returns `ConfigError` if the config is invalid, or if it asks for an
    /// estimator.
    pub fn new(config: MctsConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.use_estimator {
            return Err(ConfigError::MissingEstimator);
        }
        Ok(Self {
            config,
            estimator: None,
            rng,
            tree: None,
            last_stats: None,
        })
    }
}

impl<E, R, P> Mcts<E, R, P>
where
    E: Environment,
    R: Rng,
    P: Estimator<E>,
{
    /// Create an MCTS agent with an estimator.
    ///
    /// The estimator is only consulted when `config.use_estimator` is set.
    pub fn with_estimator(config: MctsConfig, estimator: P, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            estimator: Some(estimator),
            rng,
            tree: None,
            last_stats: None,
        })
    }

    /// Get the config.
    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Statistics of the last completed search.
    ///
    /// None before the first search, after [`reset`](Self::reset), and after
    /// a search that failed.
    pub fn statistics(&self) -> Option<&SearchStatistics> {
        self.last_stats.as_ref()
    }

    /// Tree retained from the last search, if any.
    pub fn tree(&self) -> Option<&Tree<E::State>> {
        self.tree.as_ref()
    }

    /// Discard the retained tree and statistics.
    pub fn reset(&mut self) {
        self.tree = None;
        self.last_stats = None;
    }

    /// Re-root the retained tree at the child for `action`.
    ///
    /// Returns false (and drops the tree) if there is no such child; the next
    /// search then starts from a fresh root.
    pub fn update_root(&mut self, action: ActionId) -> bool {
        self.tree = self.tree.take().and_then(|tree| tree.re_root(action));
        self.tree.is_some()
    }

    /// Search from `state` and return the selected action.
    ///
    /// Returns `Ok(None)` when `state` has no legal actions.
    pub fn search(&mut self, env: &E, state: &E::State) -> Result<Option<ActionId>, SearchError> {
        Ok(self.analyze(env, state)?.map(|result| result.action))
    }

    /// Search from `state` with the configured temperature.
    pub fn analyze(&mut self, env: &E, state: &E::State) -> Result<Option<SearchResult>, SearchError> {
        let temperature = self.config.temperature;
        self.analyze_with_temperature(env, state, temperature)
    }

    /// Search from `state`, selecting the action under `temperature`.
    pub fn analyze_with_temperature(
        &mut self,
        env: &E,
        state: &E::State,
        temperature: f64,
    ) -> Result<Option<SearchResult>, SearchError> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(ConfigError::InvalidTemperature(temperature).into());
        }
        let started = Instant::now();
        let deadline = self.config.budget().map(|budget| started + budget);

        // Cleared until this search completes; an error leaves neither tree
        // nor statistics behind
        self.last_stats = None;
        let mut tree = match self.tree.take() {
            Some(tree) if tree.root_node().state == *state => tree,
            _ => Tree::new(state.clone()),
        };

        let root = tree.root();
        if !tree.root_node().expanded {
            self.expand(env, &mut tree, root)?;
        }
        if tree.root_node().terminal {
            self.last_stats = Some(SearchStatistics::from_tree(&tree, 0));
            self.tree = Some(tree);
            debug!("Root has no legal actions");
            return Ok(None);
        }

        if self.config.dirichlet_alpha > 0.0 {
            apply_root_noise(
                &mut tree,
                self.config.dirichlet_alpha,
                self.config.dirichlet_epsilon,
                &mut self.rng,
            );
        }

        let mut simulations = 0;
        while simulations < self.config.num_simulations {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    warn!(
                        simulations,
                        requested = self.config.num_simulations,
                        "Search deadline reached"
                    );
                    break;
                }
            }
            self.simulate(env, &mut tree)?;
            simulations += 1;
        }

        let visit_counts = tree.root_visits();
        let distribution = visit_distribution(&visit_counts, temperature)?;
        let action = if temperature <= 0.0 {
            distribution.argmax()
        } else {
            sample_action(&distribution, &mut self.rng)
        };

        let stats = SearchStatistics::from_tree(&tree, simulations);
        debug!(
            simulations,
            nodes = stats.node_count,
            max_depth = stats.max_depth,
            action,
            root_value = tree.root_node().value(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search complete"
        );

        let result = SearchResult {
            action,
            distribution,
            visit_counts,
            root_value: tree.root_node().value(),
            simulations,
        };
        self.last_stats = Some(stats);
        self.tree = Some(tree);
        Ok(Some(result))
    }

    /// Run a single simulation: select -> expand -> evaluate -> backpropagate.
    fn simulate(&mut self, env: &E, tree: &mut Tree<E::State>) -> Result<(), SearchError> {
        let c = self.config.exploration_constant;

        // SELECT: descend while the node is expanded and not terminal
        let mut current = tree.root();
        let mut depth = 0u32;
        while !tree.get(current).is_leaf() {
            match tree.select_child(current, c) {
                Some(child) => {
                    current = child;
                    depth += 1;
                }
                None => break,
            }
        }

        // EXPAND: then step into one of the new children
        if !tree.get(current).terminal {
            if !tree.get(current).expanded {
                self.expand(env, tree, current)?;
            }
            if let Some(child) = tree.select_child(current, c) {
                current = child;
                depth += 1;
            }
        }

        // EVALUATE
        let value = self.evaluate(env, tree, current)?;
        trace!(depth, value, "Simulation");

        // BACKPROPAGATE
        tree.backpropagate(current, value);
        Ok(())
    }

    /// Create one child per legal action of `id`.
    ///
    /// A node without legal actions is marked terminal instead.
    fn expand(&mut self, env: &E, tree: &mut Tree<E::State>, id: NodeId) -> Result<(), SearchError> {
        let legal = env.legal_actions(&tree.get(id).state)?;
        if legal.is_empty() {
            let node = tree.get_mut(id);
            node.terminal = true;
            node.expanded = true;
            return Ok(());
        }

        let priors = match self.active_estimator() {
            Some(estimator) => {
                let estimate = estimator.evaluate(env, &tree.get(id).state)?;
                estimate.validate(&legal)?;
                estimate.priors_for(&legal)
            }
            None => vec![1.0 / legal.len() as f64; legal.len()],
        };

        for (action, prior) in legal.into_iter().zip(priors) {
            let step = env.simulate_step(&tree.get(id).state, action)?;
            let child = tree.add_child(id, action, step.next_state, prior)?;
            if step.done {
                let node = tree.get_mut(child);
                node.terminal = true;
                node.expanded = true;
            }
        }

        tree.get_mut(id).expanded = true;
        Ok(())
    }

    /// Value of the node reached by a simulation.
    fn evaluate(&mut self, env: &E, tree: &Tree<E::State>, id: NodeId) -> Result<f64, SearchError> {
        let node = tree.get(id);
        if node.terminal {
            return Ok(env.terminal_value(&node.state)?);
        }

        if let Some(estimator) = self.active_estimator() {
            let legal = env.legal_actions(&node.state)?;
            let estimate = estimator.evaluate(env, &node.state)?;
            estimate.validate(&legal)?;
            return Ok(estimate.value);
        }

        Ok(rollout(
            env,
            &node.state,
            self.config.max_depth,
            self.config.discount,
            &mut self.rng,
        )?)
    }

    fn active_estimator(&self) -> Option<&P> {
        if self.config.use_estimator {
            self.estimator.as_ref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{Estimate, UniformEstimator};
    use crate::games::{Corridor, TwoArm, TwoArmState, RIGHT};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn agent<E: Environment>(config: MctsConfig) -> Mcts<E, ChaCha8Rng> {
        Mcts::new(config, ChaCha8Rng::seed_from_u64(42)).unwrap()
    }

    #[test]
    fn test_mcts_basic() {
        let env = Corridor::new(3, 12);
        let mut mcts = agent(MctsConfig::with_simulations(100));

        let result = mcts.analyze(&env, &env.initial_state()).unwrap().unwrap();

        // Distribution should sum to ~1.0
        assert!((result.distribution.sum() - 1.0).abs() < 1e-9);

        // Every simulation passes through the root exactly once
        let total_visits: u32 = result.visit_counts.iter().map(|(_, c)| *c).sum();
        assert_eq!(total_visits, 100);
        assert_eq!(result.simulations, 100);

        let stats = mcts.statistics().unwrap();
        assert_eq!(stats.root_visits, 100);
        assert_eq!(stats.simulations, 100);
        assert!(stats.node_count > 2);
    }

    #[test]
    fn test_mcts_deterministic() {
        let env = Corridor::new(4, 16);
        let config = MctsConfig::with_simulations(50);

        let run_search = |seed: u64| {
            let mut mcts: Mcts<Corridor, _> =
                Mcts::new(config.clone(), ChaCha8Rng::seed_from_u64(seed)).unwrap();
            mcts.analyze(&env, &env.initial_state()).unwrap().unwrap()
        };

        // Same seed should produce same results
        assert_eq!(run_search(12345), run_search(12345));
    }

    #[test]
    fn test_two_arm_prefers_winning_arm() {
        let env = TwoArm::default();
        let config = MctsConfig::with_simulations(50)
            .with_exploration(1.414)
            .with_temperature(0.0);
        let mut mcts = agent(config);

        assert_eq!(mcts.search(&env, &env.initial_state()).unwrap(), Some(0));
        let stats = mcts.statistics().unwrap();
        assert_eq!(stats.best_action, Some(0));
        assert!((stats.best_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_terminal_root_returns_none() {
        let env = TwoArm::default();
        let mut mcts = agent(MctsConfig::with_simulations(10));
        let state = env.simulate_step(&env.initial_state(), 1).unwrap().next_state;

        assert_eq!(mcts.search(&env, &state).unwrap(), None);
        let stats = mcts.statistics().unwrap();
        assert_eq!(stats.simulations, 0);
        assert_eq!(stats.best_action, None);
    }

    #[test]
    fn test_tree_reuse_keeps_visits() {
        let env = Corridor::new(4, 16);
        let config = MctsConfig::for_evaluation(64);
        let mut mcts = agent(config);
        let state = env.initial_state();

        let action = mcts.search(&env, &state).unwrap().unwrap();
        let next = env.simulate_step(&state, action).unwrap().next_state;
        let kept = {
            let tree = mcts.tree().unwrap();
            let child = tree.root_node().child(action).unwrap();
            tree.get(child).visit_count
        };
        assert!(mcts.update_root(action));
        assert_eq!(mcts.tree().unwrap().root_node().state, next);

        mcts.search(&env, &next).unwrap();
        assert_eq!(mcts.statistics().unwrap().root_visits, kept + 64);
    }

    #[test]
    fn test_mismatched_root_is_rebuilt() {
        let env = Corridor::new(4, 16);
        let mut mcts = agent(MctsConfig::for_evaluation(32));
        mcts.search(&env, &env.initial_state()).unwrap();

        let elsewhere = env.simulate_step(&env.initial_state(), RIGHT).unwrap().next_state;
        let elsewhere = env.simulate_step(&elsewhere, RIGHT).unwrap().next_state;
        mcts.search(&env, &elsewhere).unwrap();

        assert_eq!(mcts.statistics().unwrap().root_visits, 32);
    }

    #[test]
    fn test_update_root_missing_child() {
        let env = TwoArm::default();
        let mut mcts = agent(MctsConfig::for_evaluation(8));
        assert!(!mcts.update_root(0)); // No tree yet

        mcts.search(&env, &env.initial_state()).unwrap();
        assert!(!mcts.update_root(9));
        assert!(mcts.tree().is_none());
    }

    #[test]
    fn test_reset() {
        let env = TwoArm::default();
        let mut mcts = agent(MctsConfig::for_evaluation(8));
        mcts.search(&env, &env.initial_state()).unwrap();
        assert!(mcts.statistics().is_some());

        mcts.reset();
        assert!(mcts.statistics().is_none());
        assert!(mcts.tree().is_none());
    }

    #[test]
    fn test_new_rejects_estimator_config() {
        let config = MctsConfig::with_simulations(8).with_estimator(true);
        let result: Result<Mcts<TwoArm, _>, _> = Mcts::new(config, ChaCha8Rng::seed_from_u64(0));
        assert!(matches!(result, Err(ConfigError::MissingEstimator)));
    }

    #[test]
    fn test_estimator_value_is_used() {
        let env = Corridor::new(50, 100);
        let config = MctsConfig::for_evaluation(20).with_estimator(true);
        let mut mcts = Mcts::with_estimator(
            config,
            UniformEstimator::new(0.5),
            ChaCha8Rng::seed_from_u64(1),
        )
        .unwrap();

        let result = mcts.analyze(&env, &env.initial_state()).unwrap().unwrap();
        // Goal out of reach: every leaf is scored 0.5
        assert!((result.root_value - 0.5).abs() < 1e-12);
    }

    struct BrokenEstimator;

    impl Estimator<TwoArm> for BrokenEstimator {
        fn evaluate(&self, _env: &TwoArm, _state: &TwoArmState) -> Result<Estimate, EstimatorError> {
            Ok(Estimate {
                priors: [(0, 0.9), (1, 0.9)].into_iter().collect(),
                value: 0.0,
            })
        }
    }

    #[test]
    fn test_malformed_estimate_aborts_search() {
        let env = TwoArm::default();
        let config = MctsConfig::for_evaluation(8).with_estimator(true);
        let mut mcts =
            Mcts::with_estimator(config, BrokenEstimator, ChaCha8Rng::seed_from_u64(0)).unwrap();

        let err = mcts.search(&env, &env.initial_state()).unwrap_err();
        assert!(matches!(
            err,
            SearchError::Estimator(EstimatorError::PriorsNotNormalized { .. })
        ));
    }

    #[test]
    fn test_estimator_ignored_when_disabled() {
        let env = TwoArm::default();
        let config = MctsConfig::for_evaluation(8);
        let mut mcts =
            Mcts::with_estimator(config, BrokenEstimator, ChaCha8Rng::seed_from_u64(0)).unwrap();

        assert_eq!(mcts.search(&env, &env.initial_state()).unwrap(), Some(0));
    }

    #[test]
    fn test_zero_time_budget_still_returns_action() {
        let env = Corridor::new(3, 12);
        let config = MctsConfig::for_evaluation(1000).with_time_budget(std::time::Duration::ZERO);
        let mut mcts = agent(config);

        let result = mcts.analyze(&env, &env.initial_state()).unwrap().unwrap();
        assert_eq!(result.simulations, 0);
        // All counts zero: greedy fallback picks the first legal action
        assert_eq!(result.action, 0);
    }

    fn root_priors<S>(tree: &Tree<S>) -> Vec<f64> {
        tree.root_node()
            .children
            .iter()
            .map(|(_, id)| tree.get(*id).prior)
            .collect()
    }

    #[test]
    fn test_root_noise_mixed_once_per_search() {
        let env = Corridor::new(6, 30);
        let state = env.initial_state();
        let mut mcts = agent(MctsConfig::with_simulations(16).with_noise(0.3, 0.25));
        mcts.search(&env, &state).unwrap();

        let priors = root_priors(mcts.tree().unwrap());
        assert_eq!(priors.len(), 2);
        assert!((priors.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(priors.iter().any(|p| (p - 0.5).abs() > 1e-9));

        // One mixing into uniform priors, drawn first from the agent's stream
        let mut expected = Tree::new(state.clone());
        for action in env.legal_actions(&state).unwrap() {
            let next = env.simulate_step(&state, action).unwrap().next_state;
            expected.add_child(expected.root(), action, next, 0.5).unwrap();
        }
        apply_root_noise(&mut expected, 0.3, 0.25, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(priors, root_priors(&expected));
    }

    #[test]
    fn test_no_noise_keeps_uniform_priors() {
        let env = Corridor::new(6, 30);
        let mut mcts = agent(MctsConfig::with_simulations(16).with_noise(0.0, 0.25));
        mcts.search(&env, &env.initial_state()).unwrap();

        assert_eq!(root_priors(mcts.tree().unwrap()), vec![0.5, 0.5]);
    }

    /// Start position 0 has one action; position 1 cannot be expanded.
    struct Flaky;

    impl Environment for Flaky {
        type State = u8;

        fn initial_state(&self) -> u8 {
            0
        }

        fn legal_actions(&self, state: &u8) -> playout_core::Result<Vec<ActionId>> {
            match state {
                0 => Ok(vec![0]),
                1 => Err(EnvironmentError::Simulator("lost connection".to_string())),
                _ => Ok(Vec::new()),
            }
        }

        fn simulate_step(&self, _state: &u8, _action: ActionId) -> playout_core::Result<playout_core::Step<u8>> {
            Ok(playout_core::Step {
                reward: 0.0,
                next_state: 2,
                done: true,
            })
        }

        fn terminal_value(&self, _state: &u8) -> playout_core::Result<f64> {
            Ok(1.0)
        }
    }

    #[test]
    fn test_failed_search_clears_statistics() {
        let mut mcts = agent(MctsConfig::for_evaluation(4));
        assert_eq!(mcts.search(&Flaky, &0).unwrap(), Some(0));
        assert!(mcts.statistics().is_some());

        let err = mcts.search(&Flaky, &1).unwrap_err();
        assert!(matches!(err, SearchError::Environment(_)));
        assert!(mcts.statistics().is_none());
        assert!(mcts.tree().is_none());
    }

    #[test]
    fn test_statistics_serde_roundtrip() {
        let env = TwoArm::default();
        let mut mcts = agent(MctsConfig::for_evaluation(16));
        mcts.search(&env, &env.initial_state()).unwrap();

        let stats = mcts.statistics().unwrap();
        let json = serde_json::to_string(stats).unwrap();
        let back: SearchStatistics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.best_action, stats.best_action);
        assert_eq!(back.best_value, stats.best_value);
    }
}

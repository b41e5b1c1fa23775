//! Self-play driver producing training examples.
//!
//! The driver plays whole episodes with one agent: search, record the visit
//! distribution, step the environment with the chosen action, re-root the
//! tree. When an episode ends every example recorded in it is stamped with
//! the same outcome, `terminal_value(final_state)`, and handed out one at a
//! time from [`SelfPlay::next_example`].

use std::collections::VecDeque;

use playout_core::{ActionDistribution, ActionId, Environment};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{estimator::Estimator, search::SearchError, Mcts};

/// One searched position from a self-play episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample<S> {
    /// Position that was searched.
    pub state: S,

    /// Visit distribution at the root.
    pub distribution: ActionDistribution,

    /// Action actually played.
    pub action: ActionId,

    /// Zero-based move number within the episode.
    pub move_number: usize,

    /// Terminal value of the episode's final state.
    pub outcome: f64,
}

/// Self-play settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfPlayConfig {
    /// Episodes to play before the driver is exhausted.
    pub episodes: usize,

    /// Moves after which an episode is cut off. The outcome of a cut-off
    /// episode is `terminal_value` of the state it stopped in.
    pub max_moves: usize,

    /// Keep the subtree of the played action between moves.
    pub reuse_tree: bool,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            episodes: 1,
            max_moves: 200,
            reuse_tree: true,
        }
    }
}

/// Summary of a finished episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Number of moves played.
    pub moves: usize,

    /// Outcome stamped on every example.
    pub outcome: f64,

    /// Undiscounted sum of step rewards.
    pub total_reward: f64,

    /// Whether the environment reported `done` (false when cut off).
    pub finished: bool,
}

struct Episode<S> {
    state: S,
    move_number: usize,
    total_reward: f64,
    pending: Vec<TrainingExample<S>>,
}

enum Phase<S> {
    /// Between episodes.
    Idle,
    /// An episode is in progress.
    Playing(Episode<S>),
    /// All episodes played, or an error stopped the driver.
    Finished,
}

/// Self-play state machine.
///
/// Each call to [`next_example`](Self::next_example) advances the episode
/// as far as needed to hand out one example.
pub struct SelfPlay<E: Environment, R, P> {
    env: E,
    agent: Mcts<E, R, P>,
    config: SelfPlayConfig,
    phase: Phase<E::State>,
    ready: VecDeque<TrainingExample<E::State>>,
    episodes_played: usize,
    last_episode: Option<EpisodeSummary>,
}

impl<E, R, P> SelfPlay<E, R, P>
where
    E: Environment,
    R: Rng,
    P: Estimator<E>,
{
    /// Create a driver playing `config.episodes` episodes of `env`.
    pub fn new(env: E, agent: Mcts<E, R, P>, config: SelfPlayConfig) -> Self {
        Self {
            env,
            agent,
            config,
            phase: Phase::Idle,
            ready: VecDeque::new(),
            episodes_played: 0,
            last_episode: None,
        }
    }

    /// Episodes completed so far.
    pub fn episodes_played(&self) -> usize {
        self.episodes_played
    }

    /// Summary of the most recently completed episode.
    pub fn last_episode(&self) -> Option<&EpisodeSummary> {
        self.last_episode.as_ref()
    }

    /// The search agent.
    pub fn agent(&self) -> &Mcts<E, R, P> {
        &self.agent
    }

    /// Next training example, or None once every episode has been played.
    ///
    /// An error stops the driver; later calls return None.
    pub fn next_example(&mut self) -> Result<Option<TrainingExample<E::State>>, SearchError> {
        loop {
            if let Some(example) = self.ready.pop_front() {
                return Ok(Some(example));
            }

            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::Finished => return Ok(None),
                Phase::Idle => {
                    if self.episodes_played >= self.config.episodes {
                        return Ok(None);
                    }
                    self.agent.reset();
                    self.phase = Phase::Playing(Episode {
                        state: self.env.initial_state(),
                        move_number: 0,
                        total_reward: 0.0,
                        pending: Vec::new(),
                    });
                }
                Phase::Playing(episode) => {
                    self.phase = self.play_move(episode)?;
                }
            }
        }
    }

    /// Play one move of `episode` and return the next phase.
    fn play_move(&mut self, mut episode: Episode<E::State>) -> Result<Phase<E::State>, SearchError> {
        if episode.move_number >= self.config.max_moves {
            return self.finish(episode, false);
        }

        let temperature = self
            .agent
            .config()
            .effective_temperature(episode.move_number);
        let result = match self
            .agent
            .analyze_with_temperature(&self.env, &episode.state, temperature)?
        {
            Some(result) => result,
            None => return self.finish(episode, true),
        };

        let step = self.env.simulate_step(&episode.state, result.action)?;
        episode.pending.push(TrainingExample {
            state: std::mem::replace(&mut episode.state, step.next_state),
            distribution: result.distribution,
            action: result.action,
            move_number: episode.move_number,
            outcome: 0.0,
        });
        episode.move_number += 1;
        episode.total_reward += step.reward;

        if step.done {
            return self.finish(episode, true);
        }

        if !self.config.reuse_tree || !self.agent.update_root(result.action) {
            self.agent.reset();
        }
        Ok(Phase::Playing(episode))
    }

    fn finish(
        &mut self,
        episode: Episode<E::State>,
        finished: bool,
    ) -> Result<Phase<E::State>, SearchError> {
        let outcome = self.env.terminal_value(&episode.state)?;
        let summary = EpisodeSummary {
            moves: episode.move_number,
            outcome,
            total_reward: episode.total_reward,
            finished,
        };
        debug!(
            episode = self.episodes_played,
            moves = summary.moves,
            outcome,
            "Episode finished"
        );

        self.ready
            .extend(episode.pending.into_iter().map(|mut example| {
                example.outcome = outcome;
                example
            }));
        self.episodes_played += 1;
        self.last_episode = Some(summary);

        if self.episodes_played >= self.config.episodes {
            debug!(episodes = self.episodes_played, "Self-play complete");
            Ok(Phase::Finished)
        } else {
            Ok(Phase::Idle)
        }
    }
}

impl<E, R, P> Iterator for SelfPlay<E, R, P>
where
    E: Environment,
    R: Rng,
    P: Estimator<E>,
{
    type Item = Result<TrainingExample<E::State>, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_example().transpose()
    }
}

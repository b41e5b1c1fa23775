use crate::Result;

/// Identifier of an action within an environment.
pub type ActionId = u32;

/// Outcome of simulating one action from a state.
#[derive(Clone, Debug, PartialEq)]
pub struct Step<S> {
    /// Immediate reward for taking the action.
    pub reward: f64,

    /// State reached after the action.
    pub next_state: S,

    /// Whether the episode ended with this transition.
    pub done: bool,
}

/// A simulated environment the search can query.
///
/// Every method is a pure function of its arguments: the search calls
/// `simulate_step` thousands of times per move and relies on it never
/// touching state visible to the caller. Values follow the convention
/// "higher is better for the acting player".
pub trait Environment {
    /// Environment state. Compared for equality when deciding whether a
    /// retained search tree still describes the position being searched.
    type State: Clone + PartialEq;

    /// Returns the state an episode starts from.
    fn initial_state(&self) -> Self::State;

    /// Returns all legal actions from the given state, in a stable order.
    /// An empty list marks a terminal state.
    fn legal_actions(&self, state: &Self::State) -> Result<Vec<ActionId>>;

    /// Simulates `action` from `state` without mutating anything observable.
    fn simulate_step(&self, state: &Self::State, action: ActionId) -> Result<Step<Self::State>>;

    /// Scores a terminal state.
    ///
    /// Self-play also scores the last state of an episode cut off by its
    /// move cap, which need not be terminal. Environments that cannot score
    /// such a state return an error, and the driver stops with it.
    fn terminal_value(&self, state: &Self::State) -> Result<f64>;
}

impl<E: Environment + ?Sized> Environment for &E {
    type State = E::State;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn legal_actions(&self, state: &Self::State) -> Result<Vec<ActionId>> {
        (**self).legal_actions(state)
    }

    fn simulate_step(&self, state: &Self::State, action: ActionId) -> Result<Step<Self::State>> {
        (**self).simulate_step(state, action)
    }

    fn terminal_value(&self, state: &Self::State) -> Result<f64> {
        (**self).terminal_value(state)
    }
}

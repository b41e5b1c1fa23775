//! MCTS node types for tree storage.
//!
//! Uses arena allocation with indices for cache locality and simpler memory management.

use playout_core::ActionId;

/// Index into the node arena.
///
/// This is a lightweight handle that references a node in the tree.
/// Using indices instead of pointers avoids Rc/RefCell overhead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in its arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node in the MCTS tree.
///
/// Each node owns the environment state it represents and the statistics
/// gathered while searching through it. The parent link is a plain index
/// used only to walk back up during backpropagation.
#[derive(Clone, Debug)]
pub struct Node<S> {
    /// State reached by the path of actions leading here.
    pub state: S,

    /// Parent node (None for the root).
    pub parent: Option<NodeId>,

    /// Action that led to this node (None for the root).
    pub action: Option<ActionId>,

    /// Number of times this node was visited during search.
    pub visit_count: u32,

    /// Sum of values from all visits.
    pub total_value: f64,

    /// Prior probability of the action leading here.
    pub prior: f64,

    /// Whether this node is a terminal state.
    pub terminal: bool,

    /// Whether children have been generated (or the node found terminal).
    pub expanded: bool,

    /// Children as (action, node_id) pairs, in legal-action order.
    pub children: Vec<(ActionId, NodeId)>,
}

impl<S> Node<S> {
    /// Create a root node: no parent, no visits, prior 1.0.
    pub fn root(state: S) -> Self {
        Self::new(state, None, None, 1.0)
    }

    /// Create a new unexpanded node.
    pub fn new(state: S, parent: Option<NodeId>, action: Option<ActionId>, prior: f64) -> Self {
        Self {
            state,
            parent,
            action,
            visit_count: 0,
            total_value: 0.0,
            prior,
            terminal: false,
            expanded: false,
            children: Vec::new(),
        }
    }

    /// Mean value for this node.
    ///
    /// Returns 0.0 if the node has never been visited.
    #[inline]
    pub fn value(&self) -> f64 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.total_value / self.visit_count as f64
        }
    }

    /// UCT score used when the parent selects among its children.
    ///
    /// UCT = value + c * prior * sqrt(N_parent) / (1 + N)
    ///
    /// Unvisited nodes score +infinity so every child is tried once before
    /// the formula applies. Takes a pre-computed sqrt(N_parent).
    #[inline]
    pub fn uct_score(&self, parent_visits_sqrt: f64, exploration: f64) -> f64 {
        if self.visit_count == 0 {
            return f64::INFINITY;
        }
        let u = exploration * self.prior * parent_visits_sqrt / (1.0 + self.visit_count as f64);
        self.value() + u
    }

    /// Child reached by `action`, if it exists.
    pub fn child(&self, action: ActionId) -> Option<NodeId> {
        self.children
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, id)| *id)
    }

    /// Check if this is a leaf for selection purposes.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.terminal || !self.expanded
    }
}

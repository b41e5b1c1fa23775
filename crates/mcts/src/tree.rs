//! Arena-allocated MCTS tree.
//!
//! Using a Vec<Node> with indices provides better cache locality
//! and simpler ownership compared to Rc<RefCell<Node>>.

use std::collections::VecDeque;

use playout_core::ActionId;
use thiserror::Error;

use crate::node::{Node, NodeId};

/// Errors from structural tree operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node {parent} already has a child for action {action}")]
    DuplicateAction { parent: usize, action: ActionId },
}

/// Arena-allocated MCTS tree.
///
/// Nodes are stored in a contiguous vector and referenced by index.
/// Every node except the root has exactly one parent, and a parent owns
/// its children: dropping the tree drops every node at once.
#[derive(Clone, Debug)]
pub struct Tree<S> {
    nodes: Vec<Node<S>>,
    root: NodeId,
}

impl<S> Tree<S> {
    /// Create a new tree whose root holds `state`.
    pub fn new(state: S) -> Self {
        Self {
            nodes: vec![Node::root(state)],
            root: NodeId(0),
        }
    }

    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get the root node.
    #[inline]
    pub fn root_node(&self) -> &Node<S> {
        self.get(self.root)
    }

    /// Get a reference to a node by ID.
    ///
    /// # Panics
    /// Panics if the NodeId does not belong to this tree.
    #[inline]
    pub fn get(&self, id: NodeId) -> &Node<S> {
        &self.nodes[id.0]
    }

    /// Get a mutable reference to a node by ID.
    ///
    /// # Panics
    /// Panics if the NodeId does not belong to this tree.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node<S> {
        &mut self.nodes[id.0]
    }

    /// Get the number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (never true, the root always exists).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over every node with its ID, in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node<S>)> + '_ {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    /// Add a child under `parent` for `action`.
    ///
    /// # Errors
    /// Returns `TreeError::DuplicateAction` if `parent` already has a child
    /// for `action`; the tree is left unchanged.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        action: ActionId,
        state: S,
        prior: f64,
    ) -> Result<NodeId, TreeError> {
        if self.get(parent).child(action).is_some() {
            return Err(TreeError::DuplicateAction {
                parent: parent.0,
                action,
            });
        }

        let id = NodeId(self.nodes.len());
        self.nodes
            .push(Node::new(state, Some(parent), Some(action), prior));
        self.get_mut(parent).children.push((action, id));
        Ok(id)
    }

    /// Backpropagate a value from `leaf` up to the root.
    ///
    /// Every node on the path gains one visit and the same, undiscounted
    /// value. Nodes off the path are untouched.
    pub fn backpropagate(&mut self, leaf: NodeId, value: f64) {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let node = self.get_mut(id);
            node.visit_count += 1;
            node.total_value += value;
            current = node.parent;
        }
    }

    /// Select the child of `id` with the highest UCT score.
    ///
    /// Ties go to the first child in iteration order, so unvisited children
    /// are tried in legal-action order. Returns None for a childless node.
    pub fn select_child(&self, id: NodeId, exploration: f64) -> Option<NodeId> {
        let node = self.get(id);
        // Pre-compute sqrt once instead of per-child comparison
        let parent_visits_sqrt = (node.visit_count as f64).sqrt();

        let mut best: Option<(NodeId, f64)> = None;
        for &(_, child_id) in &node.children {
            let score = self.get(child_id).uct_score(parent_visits_sqrt, exploration);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((child_id, score)),
            }
        }
        best.map(|(child_id, _)| child_id)
    }

    /// Visit count of every root child, in child order.
    pub fn root_visits(&self) -> Vec<(ActionId, u32)> {
        self.root_node()
            .children
            .iter()
            .map(|(action, id)| (*action, self.get(*id).visit_count))
            .collect()
    }

    /// Most visited root child as (action, node). Ties go to the first child.
    pub fn most_visited_child(&self) -> Option<(ActionId, &Node<S>)> {
        let mut best: Option<(ActionId, &Node<S>)> = None;
        for &(action, id) in &self.root_node().children {
            let child = self.get(id);
            match best {
                Some((_, b)) if child.visit_count <= b.visit_count => {}
                _ => best = Some((action, child)),
            }
        }
        best
    }

    /// Depth of the deepest node below the root (root alone is depth 0).
    pub fn max_depth(&self) -> u32 {
        let mut max_depth = 0;
        let mut stack = vec![(self.root, 0u32)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            for &(_, child) in &self.get(id).children {
                stack.push((child, depth + 1));
            }
        }
        max_depth
    }

    /// Re-root the tree at the root's child for `action`.
    ///
    /// The kept subtree moves into a fresh arena with the new root detached
    /// from any parent; the old root, its siblings and their subtrees are
    /// dropped. Returns None when no such child exists, in which case the
    /// whole tree is dropped and the caller starts from a fresh root.
    pub fn re_root(self, action: ActionId) -> Option<Self> {
        let new_root = self.root_node().child(action)?;

        let mut slots: Vec<Option<Node<S>>> = self.nodes.into_iter().map(Some).collect();
        let mut nodes = Vec::new();
        let mut next_id = 1;
        let mut queue = VecDeque::from([(new_root, None)]);

        // Breadth-first copy: ids are handed out in enqueue order, which is
        // also the order nodes are pushed.
        while let Some((old_id, parent)) = queue.pop_front() {
            let mut node = slots[old_id.0].take()?;
            let id = NodeId(nodes.len());
            node.parent = parent;
            for (_, child) in node.children.iter_mut() {
                queue.push_back((*child, Some(id)));
                *child = NodeId(next_id);
                next_id += 1;
            }
            nodes.push(node);
        }

        nodes[0].action = None;
        Some(Self {
            nodes,
            root: NodeId(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root -> (0: a -> (0: c)), (1: b)
    fn small_tree() -> (Tree<&'static str>, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new("root");
        let a = tree.add_child(tree.root(), 0, "a", 0.5).unwrap();
        let b = tree.add_child(tree.root(), 1, "b", 0.5).unwrap();
        let c = tree.add_child(a, 0, "c", 1.0).unwrap();
        (tree, a, b, c)
    }

    #[test]
    fn test_tree_creation() {
        let tree = Tree::new(0u8);
        assert_eq!(tree.len(), 1); // Root node
        assert!(!tree.is_empty());
        assert_eq!(tree.root_node().visit_count, 0);
        assert!(tree.root_node().children.is_empty());
    }

    #[test]
    fn test_add_child() {
        let mut tree = Tree::new(0u8);
        let child = tree.add_child(tree.root(), 4, 1, 0.25).unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(child).parent, Some(tree.root()));
        assert_eq!(tree.get(child).action, Some(4));
        assert!((tree.get(child).prior - 0.25).abs() < 1e-12);
        assert_eq!(tree.root_node().children, vec![(4, child)]);
    }

    #[test]
    fn test_add_child_rejects_duplicate_action() {
        let mut tree = Tree::new(0u8);
        tree.add_child(tree.root(), 4, 1, 0.5).unwrap();

        let err = tree.add_child(tree.root(), 4, 2, 0.5).unwrap_err();
        assert_eq!(err, TreeError::DuplicateAction { parent: 0, action: 4 });
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root_node().children.len(), 1);
    }

    #[test]
    fn test_backpropagate_path_only() {
        let (mut tree, a, b, c) = small_tree();

        tree.backpropagate(c, 0.5);

        assert_eq!(tree.get(c).visit_count, 1);
        assert_eq!(tree.get(a).visit_count, 1);
        assert_eq!(tree.root_node().visit_count, 1);
        assert_eq!(tree.get(b).visit_count, 0);

        // Same value at every level, no negation or discount
        assert!((tree.get(c).total_value - 0.5).abs() < 1e-12);
        assert!((tree.get(a).total_value - 0.5).abs() < 1e-12);
        assert!((tree.root_node().total_value - 0.5).abs() < 1e-12);
        assert_eq!(tree.get(b).total_value, 0.0);
    }

    #[test]
    fn test_select_child_prefers_unvisited_in_order() {
        let (mut tree, a, b, _) = small_tree();

        // Both unvisited: first child wins the tie
        assert_eq!(tree.select_child(tree.root(), 1.0), Some(a));

        // a visited with a great value still loses to unvisited b
        tree.get_mut(a).visit_count = 10;
        tree.get_mut(a).total_value = 100.0;
        tree.get_mut(tree.root()).visit_count = 10;
        assert_eq!(tree.select_child(tree.root(), 1.0), Some(b));
    }

    #[test]
    fn test_select_child_uses_value_and_prior() {
        let mut tree = Tree::new(());
        let low = tree.add_child(tree.root(), 0, (), 0.9).unwrap();
        let high = tree.add_child(tree.root(), 1, (), 0.1).unwrap();
        tree.get_mut(tree.root()).visit_count = 20;
        for (id, total) in [(low, -5.0), (high, 5.0)] {
            let node = tree.get_mut(id);
            node.visit_count = 10;
            node.total_value = total;
        }

        assert_eq!(tree.select_child(tree.root(), 1.0), Some(high));
        // A huge exploration constant lets the prior dominate
        assert_eq!(tree.select_child(tree.root(), 1000.0), Some(low));
    }

    #[test]
    fn test_select_child_of_leaf() {
        let tree = Tree::new(());
        assert_eq!(tree.select_child(tree.root(), 1.0), None);
    }

    #[test]
    fn test_most_visited_child_tie_break() {
        let (mut tree, a, b, _) = small_tree();
        tree.get_mut(a).visit_count = 3;
        tree.get_mut(b).visit_count = 3;

        let (action, _) = tree.most_visited_child().unwrap();
        assert_eq!(action, 0);

        tree.get_mut(b).visit_count = 4;
        let (action, node) = tree.most_visited_child().unwrap();
        assert_eq!(action, 1);
        assert_eq!(node.state, "b");
    }

    #[test]
    fn test_max_depth() {
        let (tree, _, _, _) = small_tree();
        assert_eq!(tree.max_depth(), 2);
        assert_eq!(Tree::new(()).max_depth(), 0);
    }

    #[test]
    fn test_re_root_keeps_subtree() {
        let (mut tree, a, _, c) = small_tree();
        tree.backpropagate(c, 1.0);
        tree.backpropagate(a, 2.0);

        let tree = tree.re_root(0).unwrap();

        assert_eq!(tree.len(), 2);
        let root = tree.root_node();
        assert_eq!(root.state, "a");
        assert_eq!(root.parent, None);
        assert_eq!(root.action, None);
        assert_eq!(root.visit_count, 2);
        assert!((root.total_value - 3.0).abs() < 1e-12);

        let child = root.child(0).unwrap();
        assert_eq!(tree.get(child).state, "c");
        assert_eq!(tree.get(child).parent, Some(tree.root()));
        assert_eq!(tree.get(child).visit_count, 1);
    }

    #[test]
    fn test_re_root_missing_child() {
        let (tree, _, _, _) = small_tree();
        assert!(tree.re_root(9).is_none());
    }

    #[test]
    fn test_re_root_remaps_deep_subtree() {
        let mut tree = Tree::new(0u32);
        let mut parent = tree.add_child(tree.root(), 1, 1, 1.0).unwrap();
        tree.add_child(tree.root(), 2, 100, 0.0).unwrap();
        for depth in 2..6 {
            let left = tree.add_child(parent, 0, depth * 10, 0.5).unwrap();
            tree.add_child(parent, 1, depth * 10 + 1, 0.5).unwrap();
            parent = left;
        }
        tree.backpropagate(parent, 1.0);

        let tree = tree.re_root(1).unwrap();

        assert_eq!(tree.len(), 9);
        assert_eq!(tree.max_depth(), 4);
        for (id, node) in tree.iter() {
            for &(_, child) in &node.children {
                assert_eq!(tree.get(child).parent, Some(id));
            }
        }
        assert_eq!(tree.root_node().visit_count, 1);
    }
}

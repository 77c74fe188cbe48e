//! MCTS tree structure and node management
//!
//! Nodes live in an arena and are memoized by their 58-bit edge mask, so two
//! move orders reaching the same position share one node and its statistics.
//! A node stores no side to move: the search recovers turns by replaying the
//! path from the root.
//!
//! ## Architecture
//! - Level 2: Tree operations (select, expand, backpropagate)
//! - Level 3: Child generation, UCB1
//! - Level 4: Best child, statistics

use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashMap;

use dotbox_core::bitboard::{boxes_adjacent_to_edge, remaining_edges_of_box};
use dotbox_core::Player;

use crate::BestMovePolicy;

// ============================================================================
// TYPES
// ============================================================================

/// Node identifier (index into arena)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// Statistics for a tree node
#[derive(Clone, Debug, Default)]
pub struct NodeStats {
    /// Number of iterations that passed through this node
    pub plays: u32,
    /// Summed reward, from the side of the player who moved into this node
    pub wins: f64,
}

impl NodeStats {
    /// Mean reward; unvisited nodes have none
    pub fn win_rate(&self) -> Option<f64> {
        (self.plays > 0).then(|| self.wins / self.plays as f64)
    }

    /// UCB1 = wins/plays + sqrt(bias * ln(parent_plays) / plays)
    ///
    /// `bias` is the square of the usual exploration constant.
    pub fn ucb1(&self, parent_plays: u32, bias: f64) -> f64 {
        if self.plays == 0 {
            return f64::INFINITY;
        }
        let plays = self.plays as f64;
        self.wins / plays + (bias * (parent_plays as f64).ln() / plays).sqrt()
    }
}

/// A node in the MCTS tree
#[derive(Clone, Debug)]
pub struct MctsNode {
    /// Edges still present, one bit per edge index
    pub state: u64,
    /// Child states in expansion order
    children: Vec<u64>,
    /// Index of the first child not yet expanded
    next_unexpanded: usize,
    pub stats: NodeStats,
}

impl MctsNode {
    /// Create a node with its children pruned and shuffled
    pub fn new<R: Rng + ?Sized>(state: u64, rng: &mut R) -> Self {
        let mut children = child_states(state);
        children.shuffle(rng);
        Self {
            state,
            children,
            next_unexpanded: 0,
            stats: NodeStats::default(),
        }
    }

    pub fn children(&self) -> &[u64] {
        &self.children
    }

    /// No edges left; the game is over
    pub fn is_leaf(&self) -> bool {
        self.state == 0
    }

    pub fn is_fully_expanded(&self) -> bool {
        self.next_unexpanded >= self.children.len()
    }

    fn next_unexpanded_state(&mut self) -> Option<u64> {
        let state = *self.children.get(self.next_unexpanded)?;
        self.next_unexpanded += 1;
        Some(state)
    }
}

/// Child states of `state`, leaving out edges that hand the opponent a box
///
/// An edge concedes when it leaves a neighbouring box with exactly one edge.
/// If every edge concedes, none are left out.
pub fn child_states(state: u64) -> Vec<u64> {
    let mut safe = Vec::new();
    let mut conceding = Vec::new();

    let mut rest = state;
    while rest != 0 {
        let index = rest.trailing_zeros() as usize;
        rest &= rest - 1;

        let child = state & !(1u64 << index);
        let concedes = boxes_adjacent_to_edge(index)
            .iter()
            .any(|&b| remaining_edges_of_box(child, b as usize) == 1);
        if concedes {
            conceding.push(child);
        } else {
            safe.push(child);
        }
    }

    if safe.is_empty() {
        conceding
    } else {
        safe
    }
}

// ============================================================================
// MCTS TREE (Level 2 - Tree Operations)
// ============================================================================

/// MCTS search tree with arena allocation
#[derive(Debug)]
pub struct MctsTree {
    /// Arena storage for nodes
    nodes: Vec<MctsNode>,
    /// Node of each state seen so far
    index: FxHashMap<u64, NodeId>,
}

impl MctsTree {
    /// Create a new tree with the given root state
    pub fn new<R: Rng + ?Sized>(root_state: u64, rng: &mut R) -> Self {
        let mut index = FxHashMap::default();
        index.insert(root_state, NodeId::ROOT);
        Self {
            nodes: vec![MctsNode::new(root_state, rng)],
            index,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn get(&self, id: NodeId) -> &MctsNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut MctsNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node holding `state`, if it was ever expanded
    pub fn find(&self, state: u64) -> Option<NodeId> {
        self.index.get(&state).copied()
    }

    fn expanded_child(&self, state: u64) -> NodeId {
        match self.find(state) {
            Some(id) => id,
            None => panic!("child state {state:#x} of a fully expanded node is not in the tree"),
        }
    }

    /// Walk down by UCB1 until a node that is not fully expanded, or a leaf
    ///
    /// Returns the path from the root. Ties are broken uniformly at random.
    pub fn select<R: Rng + ?Sized>(&self, bias: f64, rng: &mut R) -> Vec<NodeId> {
        let mut path = vec![self.root()];
        let mut current = self.root();

        while self.get(current).is_fully_expanded() && !self.get(current).is_leaf() {
            let parent_plays = self.get(current).stats.plays;
            let mut best = None;
            let mut best_ucb1 = f64::NEG_INFINITY;
            let mut contenders = 0u32;

            for &state in self.get(current).children() {
                let child = self.expanded_child(state);
                let ucb1 = self.get(child).stats.ucb1(parent_plays, bias);
                if ucb1 > best_ucb1 {
                    best = Some(child);
                    best_ucb1 = ucb1;
                    contenders = 1;
                } else if ucb1 == best_ucb1 {
                    contenders += 1;
                    if rng.gen_bool(1.0 / contenders as f64) {
                        best = Some(child);
                    }
                }
            }

            match best {
                Some(child) => {
                    path.push(child);
                    current = child;
                }
                None => break,
            }
        }

        path
    }

    /// Expand the next child of a node, reusing the node if the state is known
    ///
    /// Returns `None` once the node is fully expanded.
    pub fn expand<R: Rng + ?Sized>(&mut self, id: NodeId, rng: &mut R) -> Option<NodeId> {
        let state = self.get_mut(id).next_unexpanded_state()?;
        if let Some(existing) = self.find(state) {
            return Some(existing);
        }

        let child = NodeId(self.nodes.len());
        self.nodes.push(MctsNode::new(state, rng));
        self.index.insert(state, child);
        Some(child)
    }

    // ========================================================================
    // Level 2: Backpropagation
    // ========================================================================

    /// Credit `reward` along a root-first path
    ///
    /// `movers[i]` is the side to move at `path[i]`. A node earns the reward
    /// signed for whoever moved into it, so player 2 moves earn `-reward`.
    pub fn backpropagate(&mut self, path: &[NodeId], movers: &[Player], reward: f64) {
        for (i, &id) in path.iter().enumerate().rev() {
            let stats = &mut self.get_mut(id).stats;
            stats.plays += 1;
            if i > 0 {
                stats.wins += movers[i - 1].sign() as f64 * reward;
            }
        }
    }

    // ========================================================================
    // Level 4: Best Move Selection
    // ========================================================================

    /// Child state to play from the root
    ///
    /// A root with a single child returns it without looking at statistics.
    /// Unexpanded children are never chosen unless nothing was expanded.
    pub fn best_child_state(&self, policy: BestMovePolicy) -> Option<u64> {
        let children = self.get(self.root()).children();
        if children.len() == 1 {
            return children.first().copied();
        }

        let mut best = None;
        let mut best_score = f64::NEG_INFINITY;
        for &state in children {
            let Some(id) = self.find(state) else { continue };
            let stats = &self.get(id).stats;
            let score = match policy {
                BestMovePolicy::Robust => stats.plays as f64,
                BestMovePolicy::Max => stats.win_rate().unwrap_or(f64::NEG_INFINITY),
            };
            if best.is_none() || score > best_score {
                best = Some(state);
                best_score = score;
            }
        }

        best.or_else(|| children.first().copied())
    }

    /// Total iterations run (root plays)
    pub fn total_simulations(&self) -> u32 {
        self.get(self.root()).stats.plays
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dotbox_core::topology::EMPTY_HASH;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn without(state: u64, edges: &[usize]) -> u64 {
        edges.iter().fold(state, |s, &e| s & !(1u64 << e))
    }

    #[test]
    fn test_node_prunes_conceding_edges() {
        // Box 0 keeps only its bottom (6) and right (31) edges
        let state = without(EMPTY_HASH, &[0, 30]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let node = MctsNode::new(state, &mut rng);

        assert_eq!(node.children().len(), 54);
        assert!(!node.children().contains(&without(state, &[6])));
        assert!(!node.children().contains(&without(state, &[31])));
        assert!(node.children().contains(&without(state, &[57])));
    }

    #[test]
    fn test_node_keeps_conceding_edges_when_nothing_else() {
        let state = (1u64 << 6) | (1u64 << 31);
        let children = child_states(state);

        assert_eq!(children.len(), 2);
        assert!(children.contains(&(1u64 << 6)));
        assert!(children.contains(&(1u64 << 31)));
    }

    #[test]
    fn test_leaf_node_has_no_children() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let node = MctsNode::new(0, &mut rng);
        assert!(node.is_leaf());
        assert!(node.is_fully_expanded());
        assert!(node.children().is_empty());
    }

    #[test]
    fn test_ucb1() {
        let mut stats = NodeStats::default();
        assert!(stats.ucb1(100, 2.0).is_infinite());
        assert_eq!(stats.win_rate(), None);

        stats.plays = 4;
        stats.wins = 2.0;
        let expected = 0.5 + (2.0 * 16f64.ln() / 4.0).sqrt();
        assert!((stats.ucb1(16, 2.0) - expected).abs() < 1e-12);
        assert_eq!(stats.win_rate(), Some(0.5));
    }

    #[test]
    fn test_expansion_reuses_known_states() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut tree = MctsTree::new((1u64 << 6) | (1u64 << 31), &mut rng);

        let first = tree.expand(NodeId::ROOT, &mut rng).unwrap();
        let second = tree.expand(NodeId::ROOT, &mut rng).unwrap();
        assert_eq!(tree.expand(NodeId::ROOT, &mut rng), None);
        assert!(tree.get(NodeId::ROOT).is_fully_expanded());

        let end_from_first = tree.expand(first, &mut rng).unwrap();
        let end_from_second = tree.expand(second, &mut rng).unwrap();
        assert_eq!(end_from_first, end_from_second);
        assert!(tree.get(end_from_first).is_leaf());
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_select_stops_at_unexpanded_node() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut tree = MctsTree::new(EMPTY_HASH, &mut rng);
        assert_eq!(tree.select(2.0, &mut rng), vec![NodeId::ROOT]);

        let child = tree.expand(NodeId::ROOT, &mut rng).unwrap();
        tree.backpropagate(&[NodeId::ROOT, child], &[Player::Player1, Player::Player2], 1.0);
        assert_eq!(tree.select(2.0, &mut rng), vec![NodeId::ROOT]);
    }

    #[test]
    fn test_select_descends_fully_expanded_root() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut tree = MctsTree::new((1u64 << 6) | (1u64 << 31), &mut rng);
        let a = tree.expand(NodeId::ROOT, &mut rng).unwrap();
        let b = tree.expand(NodeId::ROOT, &mut rng).unwrap();
        let movers = [Player::Player1, Player::Player1];
        tree.backpropagate(&[NodeId::ROOT, a], &movers, 1.0);
        tree.backpropagate(&[NodeId::ROOT, b], &movers, -1.0);

        let path = tree.select(2.0, &mut rng);
        assert_eq!(path, vec![NodeId::ROOT, a]);
    }

    #[test]
    fn test_backpropagation_signs_by_mover() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut tree = MctsTree::new((1u64 << 6) | (1u64 << 31), &mut rng);
        let child = tree.expand(NodeId::ROOT, &mut rng).unwrap();

        tree.backpropagate(&[NodeId::ROOT, child], &[Player::Player2, Player::Player1], 0.25);
        assert_eq!(tree.get(NodeId::ROOT).stats.plays, 1);
        assert_eq!(tree.get(NodeId::ROOT).stats.wins, 0.0);
        assert_eq!(tree.get(child).stats.plays, 1);
        assert_eq!(tree.get(child).stats.wins, -0.25);
    }

    #[test]
    fn test_best_child_policies() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut tree = MctsTree::new(EMPTY_HASH, &mut rng);
        let often = tree.expand(NodeId::ROOT, &mut rng).unwrap();
        let rarely = tree.expand(NodeId::ROOT, &mut rng).unwrap();
        let movers = [Player::Player1, Player::Player1];
        for _ in 0..3 {
            tree.backpropagate(&[NodeId::ROOT, often], &movers, 0.1);
        }
        tree.backpropagate(&[NodeId::ROOT, rarely], &movers, 0.9);

        let often_state = tree.get(often).state;
        let rarely_state = tree.get(rarely).state;
        assert_eq!(tree.best_child_state(BestMovePolicy::Robust), Some(often_state));
        assert_eq!(tree.best_child_state(BestMovePolicy::Max), Some(rarely_state));
    }

    #[test]
    fn test_best_child_falls_back_before_expansion() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let tree = MctsTree::new(EMPTY_HASH, &mut rng);
        let first = tree.get(NodeId::ROOT).children()[0];
        assert_eq!(tree.best_child_state(BestMovePolicy::Max), Some(first));
    }
}

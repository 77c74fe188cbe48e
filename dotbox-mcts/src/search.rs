//! MCTS search loop
//!
//! Implements the core MCTS algorithm:
//! 1. Selection - UCB1 down the fully expanded part of the tree
//! 2. Expansion - next shuffled child of the selected node
//! 3. Simulation - rollout, or the replayed score of a finished game
//! 4. Backpropagation - signed reward along the path
//!
//! Rewards are kept from the root mover's side: the root is replayed as if
//! player 1 were to move, holding the mover's score.
//!
//! ## Architecture
//! - Level 2: Search loop coordination
//! - Level 3: Turn replay
//! - Level 4: Statistics

use std::time::{Duration, Instant};

use rand::Rng;

use dotbox_core::{Bitboard, Edge, Player};

use crate::rollout::reward;
use crate::tree::{MctsTree, NodeId};
use crate::MctsConfig;

// ============================================================================
// SEARCH RESULT
// ============================================================================

/// Result of MCTS search
#[derive(Debug)]
pub struct SearchResult {
    /// The final tree after search
    pub tree: MctsTree,
    /// Edge to play; `None` only when the game is over
    pub best_move: Option<Edge>,
    /// Mean reward of the chosen child for the root mover
    pub value: Option<f64>,
    pub iterations: u64,
    pub elapsed: Duration,
    /// Statistics for each expanded root move
    pub move_stats: Vec<MoveStatistics>,
}

/// Statistics for a single move at root
#[derive(Clone, Debug)]
pub struct MoveStatistics {
    pub edge: Edge,
    pub plays: u32,
    pub win_rate: Option<f64>,
    pub ucb1: f64,
}

impl SearchResult {
    /// Root moves sorted by plays, most first
    pub fn moves_by_plays(&self) -> Vec<(Edge, u32)> {
        let mut moves: Vec<_> = self.move_stats.iter().map(|s| (s.edge, s.plays)).collect();
        moves.sort_by(|a, b| b.1.cmp(&a.1));
        moves
    }
}

// ============================================================================
// SEARCH LOOP (Level 2 - Main Coordination)
// ============================================================================

/// Run MCTS from `root` until the time limit or the iteration cap
///
/// A root with a single child is answered without searching.
pub fn run_search<R: Rng + ?Sized>(root: &Bitboard, config: &MctsConfig, rng: &mut R) -> SearchResult {
    let start = Instant::now();
    let origin = oriented_origin(root);
    let mut tree = MctsTree::new(root.state(), rng);
    let mut iterations = 0u64;

    if tree.get(tree.root()).children().len() > 1 {
        let limit = Duration::from_millis(config.time_limit_ms);
        while start.elapsed() < limit && config.max_iterations.map_or(true, |max| iterations < max) {
            run_single_iteration(&mut tree, &origin, config, rng);
            iterations += 1;
        }
    }

    let best_state = tree.best_child_state(config.best_move_policy);
    let best_move = best_state.and_then(|state| Bitboard::edge_index_to_edge(delta_index(root.state(), state)));
    let value = best_state
        .and_then(|state| tree.find(state))
        .map(|id| {
            let stats = &tree.get(id).stats;
            stats.wins / stats.plays.max(1) as f64
        });
    let move_stats = collect_move_statistics(&tree, root.state(), config.exploration);
    let elapsed = start.elapsed();

    tracing::info!(
        "MCTS: {} iterations in {:?}, {} nodes, best {:?} value {:?}",
        iterations,
        elapsed,
        tree.len(),
        best_move,
        value
    );

    SearchResult {
        tree,
        best_move,
        value,
        iterations,
        elapsed,
        move_stats,
    }
}

/// Single MCTS iteration
fn run_single_iteration<R: Rng + ?Sized>(tree: &mut MctsTree, origin: &Bitboard, config: &MctsConfig, rng: &mut R) {
    // Phase 1: Selection
    let mut path = tree.select(config.exploration, rng);
    let leaf = path.last().copied().unwrap_or(NodeId::ROOT);

    // Phase 2: Expansion (unless the game is over)
    if !tree.get(leaf).is_leaf() {
        if let Some(child) = tree.expand(leaf, rng) {
            path.push(child);
        }
    }

    // Phase 3: Simulation
    let (movers, board) = replay(origin, path.iter().skip(1).map(|&id| tree.get(id).state));
    let outcome = if board.is_game_over() {
        reward(&board)
    } else {
        config.rollout.rollout(board, rng).reward()
    };

    // Phase 4: Backpropagation
    tree.backpropagate(&path, &movers, outcome);
}

// ============================================================================
// TURN REPLAY (Level 3)
// ============================================================================

/// Root position with the side to move relabelled as player 1
fn oriented_origin(root: &Bitboard) -> Bitboard {
    let (mover, other) = match root.current_player() {
        Player::Player1 => (root.player1_score(), root.player2_score()),
        Player::Player2 => (root.player2_score(), root.player1_score()),
    };
    Bitboard::with_state(root.state(), Player::Player1, mover, other)
}

/// Replay a path of states below `origin`
///
/// Returns the side to move at `origin` and at each state, and the position
/// reached. Consecutive states must differ by exactly one edge.
fn replay(origin: &Bitboard, states: impl Iterator<Item = u64>) -> (Vec<Player>, Bitboard) {
    let mut board = *origin;
    let mut movers = vec![board.current_player()];

    for state in states {
        let index = delta_index(board.state(), state);
        if let Err(err) = board.make_move(index) {
            panic!("replay could not remove edge {index}: {err}");
        }
        movers.push(board.current_player());
    }

    (movers, board)
}

/// Index of the single edge removed between two states
fn delta_index(previous: u64, current: u64) -> usize {
    let delta = previous ^ current;
    if delta.count_ones() != 1 {
        panic!("states {previous:#x} and {current:#x} differ by {} edges", delta.count_ones());
    }
    delta.trailing_zeros() as usize
}

// ============================================================================
// STATISTICS COLLECTION (Level 4 - Utilities)
// ============================================================================

fn collect_move_statistics(tree: &MctsTree, root_state: u64, bias: f64) -> Vec<MoveStatistics> {
    let root = tree.get(tree.root());
    let parent_plays = root.stats.plays;

    root.children()
        .iter()
        .filter_map(|&state| {
            let child = tree.find(state)?;
            let edge = Bitboard::edge_index_to_edge(delta_index(root_state, state))?;
            let stats = &tree.get(child).stats;
            Some(MoveStatistics {
                edge,
                plays: stats.plays,
                win_rate: stats.win_rate(),
                ucb1: stats.ucb1(parent_plays, bias),
            })
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BestMovePolicy, RolloutPolicy};
    use dotbox_core::Board;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn random_midgame(seed: u64, moves: usize) -> Board {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut board = Board::new();
        for _ in 0..moves {
            let edges = board.unclaimed_edges();
            let Some(&edge) = edges.choose(&mut rng) else { break };
            board.make_single_move(edge).unwrap();
        }
        board
    }

    #[test]
    fn test_replay_matches_rules_engine() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut board = Board::new();
        let mut states = Vec::new();
        let mut expected = vec![Player::Player1];
        while !board.is_game_over() {
            let edges = board.unclaimed_edges();
            board.make_single_move(*edges.choose(&mut rng).unwrap()).unwrap();
            states.push(board.edge_hash());
            expected.push(board.current_player());
        }

        let (movers, end) = replay(&Bitboard::new(), states.into_iter());
        assert_eq!(movers, expected);
        assert_eq!(end.player1_score(), board.player1_score());
        assert_eq!(end.player2_score(), board.player2_score());
    }

    #[test]
    #[should_panic(expected = "differ by 2 edges")]
    fn test_replay_rejects_double_step() {
        let origin = Bitboard::new();
        let skipped = origin.state() & !0b11;
        replay(&origin, std::iter::once(skipped));
    }

    #[test]
    fn test_origin_is_oriented_to_mover() {
        let root = Bitboard::with_state(0b1, Player::Player2, 10, 13);
        let origin = oriented_origin(&root);
        assert_eq!(origin.current_player(), Player::Player1);
        assert_eq!(origin.player1_score(), 13);
        assert_eq!(origin.player2_score(), 10);
    }

    #[test]
    fn test_search_returns_present_edge() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let config = MctsConfig::iterations(300);
        for seed in 0..3 {
            let board = random_midgame(seed, 20);
            let result = run_search(&Bitboard::from_board(&board), &config, &mut rng);
            let edge = result.best_move.unwrap();
            assert!(board.has_edge(edge.u, edge.v));
            assert_eq!(result.iterations, 300);
            assert_eq!(result.tree.total_simulations(), 300);
        }
    }

    #[test]
    fn test_single_child_is_returned_without_search() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let root = Bitboard::with_state(1u64 << 31, Player::Player1, 11, 11);
        let result = run_search(&root, &MctsConfig::iterations(100), &mut rng);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.best_move, Bitboard::edge_index_to_edge(31));
        assert_eq!(result.value, None);
    }

    #[test]
    fn test_finished_game_has_no_move() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let root = Bitboard::with_state(0, Player::Player1, 12, 12);
        let result = run_search(&root, &MctsConfig::iterations(10), &mut rng);
        assert_eq!(result.best_move, None);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_value_is_from_root_movers_side() {
        // Two edges left; either order gives the mover the last three boxes
        let root = Bitboard::with_state((1u64 << 6) | (1u64 << 31), Player::Player2, 10, 11);
        for policy in [BestMovePolicy::Max, BestMovePolicy::Robust] {
            let mut rng = ChaCha8Rng::seed_from_u64(5);
            let config = MctsConfig::iterations(20)
                .with_best_move_policy(policy)
                .with_rollout(RolloutPolicy::Uniform);
            let result = run_search(&root, &config, &mut rng);

            let value = result.value.unwrap();
            assert!((value - 4.0 / 24.0).abs() < 1e-9);
            assert_eq!(result.move_stats.len(), 2);
        }
    }

    #[test]
    fn test_moves_by_plays_is_sorted() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let result = run_search(&Bitboard::new(), &MctsConfig::iterations(200), &mut rng);
        let sorted = result.moves_by_plays();
        assert!(!sorted.is_empty());
        assert!(sorted.windows(2).all(|w| w[0].1 >= w[1].1));
        assert_eq!(sorted.iter().map(|(_, plays)| *plays as u64).sum::<u64>(), 200);
    }
}

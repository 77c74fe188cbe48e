//! Rollout (simulation) policies for MCTS
//!
//! Both policies play a bitboard to the end of the game without allocating
//! per move.
//!
//! ## Architecture
//! - Level 2: Policy dispatch
//! - Level 3: Uniform and greedy playouts
//! - Level 4: Bit helpers

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use dotbox_core::bitboard::{boxes_adjacent_to_edge, remaining_edges_of_box, EDGES_ADJACENT_TO_BOX};
use dotbox_core::{Bitboard, NUM_EDGES};

/// Probability that the greedy policy ignores a free box
pub const GREEDY_EPSILON: f64 = 0.01;

// ============================================================================
// ROLLOUT RESULT
// ============================================================================

/// Result of a rollout simulation
#[derive(Clone, Debug)]
pub struct RolloutResult {
    /// Finished position
    pub board: Bitboard,
    /// Number of edges played
    pub moves_played: u32,
}

impl RolloutResult {
    pub fn reward(&self) -> f64 {
        reward(&self.board)
    }
}

/// Player 1's score difference over the boxes taken, in `[-1, 1]`
pub fn reward(board: &Bitboard) -> f64 {
    let total = board.player1_score() + board.player2_score();
    board.score_difference() as f64 / total.max(1) as f64
}

// ============================================================================
// POLICY (Level 2)
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RolloutPolicy {
    /// Every remaining edge in a random order
    Uniform,
    /// Take any free box first, otherwise a random edge
    #[default]
    Greedy,
}

impl RolloutPolicy {
    pub fn rollout<R: Rng + ?Sized>(self, board: Bitboard, rng: &mut R) -> RolloutResult {
        match self {
            RolloutPolicy::Uniform => uniform_rollout(board, rng),
            RolloutPolicy::Greedy => greedy_rollout(board, rng),
        }
    }
}

// ============================================================================
// PLAYOUTS (Level 3)
// ============================================================================

/// Play the remaining edges in a shuffled order
pub fn uniform_rollout<R: Rng + ?Sized>(mut board: Bitboard, rng: &mut R) -> RolloutResult {
    let mut moves = board.legal_moves();
    moves.shuffle(rng);
    for &index in &moves {
        play(&mut board, index);
    }

    RolloutResult {
        board,
        moves_played: moves.len() as u32,
    }
}

/// Take free boxes first, otherwise play a uniformly random edge
///
/// Each edge tracks the fewest edges left on a neighbouring box. An edge at
/// one completes a box and joins the free queue; only the boxes next to the
/// edge just played need rechecking.
pub fn greedy_rollout<R: Rng + ?Sized>(mut board: Bitboard, rng: &mut R) -> RolloutResult {
    let mut min_degree = [0u32; NUM_EDGES];
    let mut free = VecDeque::new();
    let mut free_mask = 0u64;

    for index in board.legal_moves() {
        min_degree[index] = min_remaining_degree(board.state(), index);
        if min_degree[index] == 1 {
            free.push_back(index);
            free_mask |= 1u64 << index;
        }
    }

    let mut moves_played = 0;
    while !board.is_game_over() {
        let free_edge = if free_mask != 0 && rng.gen::<f64>() >= GREEDY_EPSILON {
            pop_free(&mut free, free_mask)
        } else {
            None
        };
        let index = match free_edge {
            Some(index) => index,
            None => {
                let state = board.state();
                nth_present(state, rng.gen_range(0..state.count_ones()))
            }
        };

        free_mask &= !(1u64 << index);
        play(&mut board, index);
        moves_played += 1;

        let state = board.state();
        for &b in boxes_adjacent_to_edge(index) {
            for &edge in &EDGES_ADJACENT_TO_BOX[b as usize] {
                let edge = edge as usize;
                if state & (1u64 << edge) == 0 {
                    continue;
                }
                min_degree[edge] = min_degree[edge].min(remaining_edges_of_box(state, b as usize));
                if min_degree[edge] == 1 && free_mask & (1u64 << edge) == 0 {
                    free.push_back(edge);
                    free_mask |= 1u64 << edge;
                }
            }
        }
    }

    RolloutResult { board, moves_played }
}

// ============================================================================
// HELPERS (Level 4)
// ============================================================================

fn play(board: &mut Bitboard, index: usize) {
    if let Err(err) = board.make_move(index) {
        panic!("rollout played edge {index} twice: {err}");
    }
}

/// Fewest edges left on either box next to `index`
fn min_remaining_degree(state: u64, index: usize) -> u32 {
    boxes_adjacent_to_edge(index)
        .iter()
        .map(|&b| remaining_edges_of_box(state, b as usize))
        .min()
        .unwrap_or(4)
}

/// Oldest queued edge still in `mask`; stale entries are dropped
fn pop_free(free: &mut VecDeque<usize>, mask: u64) -> Option<usize> {
    while let Some(index) = free.pop_front() {
        if mask & (1u64 << index) != 0 {
            return Some(index);
        }
    }
    None
}

/// Index of the `n`th set bit of `state`, counting from the lowest
fn nth_present(state: u64, n: u32) -> usize {
    let mut rest = state;
    for _ in 0..n {
        rest &= rest - 1;
    }
    rest.trailing_zeros() as usize
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dotbox_core::{Board, Player};
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
    fn test_reward_scaling() {
        assert_eq!(reward(&Bitboard::with_state(0, Player::Player1, 15, 9)), 0.25);
        assert_eq!(reward(&Bitboard::with_state(0, Player::Player2, 0, 24)), -1.0);
        assert_eq!(reward(&Bitboard::new()), 0.0);
    }

    #[test]
    fn test_rollouts_finish_the_game() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for policy in [RolloutPolicy::Uniform, RolloutPolicy::Greedy] {
            let result = policy.rollout(Bitboard::new(), &mut rng);
            assert!(result.board.is_game_over());
            assert_eq!(result.moves_played, NUM_EDGES as u32);
            assert_eq!(result.board.player1_score() + result.board.player2_score(), 24);
        }
    }

    #[test]
    fn test_rollouts_keep_existing_scores() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for seed in 0..10 {
            let board = random_midgame(seed, 35);
            let start = Bitboard::from_board(&board);
            for policy in [RolloutPolicy::Uniform, RolloutPolicy::Greedy] {
                let result = policy.rollout(start, &mut rng);
                assert_eq!(result.moves_played, start.state().count_ones());
                assert!(result.board.player1_score() >= start.player1_score());
                assert!(result.board.player2_score() >= start.player2_score());
                assert_eq!(result.board.player1_score() + result.board.player2_score(), 24);
            }
        }
    }

    #[test]
    fn test_greedy_takes_the_last_box() {
        // Only box 0's right edge is left; the mover takes it
        let board = Bitboard::with_state(1u64 << 31, Player::Player2, 12, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let result = greedy_rollout(board, &mut rng);
        assert_eq!(result.board.player2_score(), 12);
        assert_eq!(result.board.current_player(), Player::Player2);
    }

    #[test]
    fn test_min_remaining_degree() {
        let state = dotbox_core::topology::EMPTY_HASH & !(1u64 << 0) & !(1u64 << 30) & !(1u64 << 6);
        assert_eq!(min_remaining_degree(state, 31), 1);
        assert_eq!(min_remaining_degree(state, 32), 4);
        // Boundary edge with a single box
        assert_eq!(min_remaining_degree(state, 57), 4);
    }

    #[test]
    fn test_nth_present() {
        let state = 0b1011_0100u64;
        assert_eq!(nth_present(state, 0), 2);
        assert_eq!(nth_present(state, 1), 4);
        assert_eq!(nth_present(state, 2), 5);
        assert_eq!(nth_present(state, 3), 7);
    }

    #[test]
    fn test_pop_free_skips_stale_entries() {
        let mut free = VecDeque::from(vec![3, 9, 12]);
        let mask = (1u64 << 9) | (1u64 << 12);
        assert_eq!(pop_free(&mut free, mask), Some(9));
        assert_eq!(pop_free(&mut free, 0), None);
    }
}

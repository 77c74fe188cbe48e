//! DOTBOX MCTS - Monte Carlo Tree Search over bitboards
//!
//! This crate provides:
//! - Tree policy (UCB1) over a state-memoized node arena
//! - Uniform and greedy rollouts on the bitboard mirror
//! - Backpropagation from the root mover's point of view

pub mod rollout;
pub mod search;
pub mod tree;

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use dotbox_core::{Bitboard, Board, Edge, GameError, Result};

pub use rollout::RolloutPolicy;
pub use search::{run_search, MoveStatistics, SearchResult};
pub use tree::{MctsTree, NodeId};

/// How the root move is picked once the search stops
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BestMovePolicy {
    /// Highest mean reward
    #[default]
    Max,
    /// Most plays
    Robust,
}

/// MCTS configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// Wall-clock budget per search in milliseconds
    pub time_limit_ms: u64,
    /// Iteration cap, checked alongside the clock
    pub max_iterations: Option<u64>,
    /// Square of the UCB1 exploration constant
    pub exploration: f64,
    pub rollout: RolloutPolicy,
    pub best_move_policy: BestMovePolicy,
    /// Seed for shuffling, tie-breaks and rollouts; entropy when unset
    pub seed: Option<u64>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 10_000,
            max_iterations: None,
            exploration: 2.0,
            rollout: RolloutPolicy::Greedy,
            best_move_policy: BestMovePolicy::Max,
            seed: None,
        }
    }
}

impl MctsConfig {
    /// Config bounded by iteration count rather than time
    pub fn iterations(count: u64) -> Self {
        Self {
            time_limit_ms: u64::MAX,
            max_iterations: Some(count),
            ..Self::default()
        }
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_ms = limit.as_millis() as u64;
        self
    }

    pub fn with_max_iterations(mut self, count: u64) -> Self {
        self.max_iterations = Some(count);
        self
    }

    pub fn with_exploration(mut self, bias: f64) -> Self {
        self.exploration = bias;
        self
    }

    pub fn with_rollout(mut self, rollout: RolloutPolicy) -> Self {
        self.rollout = rollout;
        self
    }

    pub fn with_best_move_policy(mut self, policy: BestMovePolicy) -> Self {
        self.best_move_policy = policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// MCTS player
///
/// Owns its random stream, so a seeded player replays the same games.
pub struct MctsPlayer {
    config: MctsConfig,
    rng: ChaCha8Rng,
}

impl MctsPlayer {
    pub fn new(config: MctsConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Search the position and keep the whole result
    pub fn search(&mut self, board: &Board) -> SearchResult {
        run_search(&Bitboard::from_board(board), &self.config, &mut self.rng)
    }

    /// Get best move using MCTS
    pub fn best_move(&mut self, board: &Board) -> Result<Edge> {
        if board.is_game_over() {
            return Err(GameError::NoActionAvailable);
        }
        self.search(board).best_move.ok_or(GameError::NoActionAvailable)
    }

    /// Play both sides until the game ends
    pub fn play_game(&mut self, mut board: Board) -> Result<(Board, Vec<Edge>)> {
        let mut moves = Vec::new();
        while !board.is_game_over() {
            let edge = self.best_move(&board)?;
            board.make_single_move(edge)?;
            moves.push(edge);
        }
        Ok((board, moves))
    }
}

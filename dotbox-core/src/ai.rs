//! Time-boxed alpha-beta search over any [`SearchState`]
//!
//! Player 1 maximizes, player 2 minimizes. Depth counts turns rather than
//! actions: it only drops when the side to move changes, so a run of
//! captures by one player is searched as a single ply.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::player::GameResult;
use crate::state::SearchState;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaBetaConfig {
    /// Wall-clock budget in milliseconds; 0 disables the limit
    pub timeout_ms: u64,
    /// Score finished games as +/- infinity instead of evaluating them
    pub use_infinity_for_winners: bool,
    /// Turn depth limit; `None` searches to the end of the game
    pub max_depth: Option<u32>,
}

impl Default for AlphaBetaConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            use_infinity_for_winners: true,
            max_depth: None,
        }
    }
}

impl AlphaBetaConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_infinity_for_winners(mut self, enabled: bool) -> Self {
        self.use_infinity_for_winners = enabled;
        self
    }
}

/// Best action found at the root
#[derive(Clone, Debug)]
pub struct SearchOutcome<A> {
    pub action: A,
    pub value: f64,
    pub timed_out: bool,
}

struct Response<A> {
    value: f64,
    best_action: Option<A>,
}

impl<A> Response<A> {
    fn leaf(value: f64) -> Self {
        Self {
            value,
            best_action: None,
        }
    }
}

// ============================================================================
// AGENT
// ============================================================================

pub struct AlphaBetaAgent {
    pub config: AlphaBetaConfig,
    start: Option<Instant>,
    nodes: u64,
}

impl AlphaBetaAgent {
    pub fn new(config: AlphaBetaConfig) -> Self {
        Self {
            config,
            start: None,
            nodes: 0,
        }
    }

    fn has_timed_out(&self) -> bool {
        match (self.config.timeout_ms, self.start) {
            (0, _) | (_, None) => false,
            (ms, Some(start)) => start.elapsed() >= Duration::from_millis(ms),
        }
    }

    /// Search from `state` and return the best root action
    pub fn optimal_action<S: SearchState>(&mut self, state: &mut S) -> Result<SearchOutcome<S::Action>> {
        self.start = Some(Instant::now());
        self.nodes = 0;

        let depth = self.config.max_depth.unwrap_or(u32::MAX).max(1);
        // The root always branches, so a spent budget still yields an action
        let response = if state.is_game_over() {
            self.value(state, f64::NEG_INFINITY, f64::INFINITY, depth)
        } else {
            self.nodes += 1;
            let maximizing = state.is_player1s_turn();
            self.branch(state, f64::NEG_INFINITY, f64::INFINITY, depth, maximizing)
        };

        tracing::debug!(
            "alpha-beta searched {} nodes in {:?}, value {}",
            self.nodes,
            self.start.map(|s| s.elapsed()).unwrap_or_default(),
            response.value
        );

        let action = response.best_action.ok_or(GameError::NoActionAvailable)?;
        Ok(SearchOutcome {
            action,
            value: response.value,
            timed_out: self.has_timed_out(),
        })
    }

    fn value<S: SearchState>(&mut self, state: &mut S, alpha: f64, beta: f64, depth: u32) -> Response<S::Action> {
        self.nodes += 1;

        if state.is_game_over() {
            if !self.config.use_infinity_for_winners {
                return Response::leaf(state.evaluate());
            }
            return Response::leaf(match state.result() {
                GameResult::Player1Wins => f64::INFINITY,
                GameResult::Player2Wins => f64::NEG_INFINITY,
                GameResult::Draw | GameResult::Ongoing => 0.0,
            });
        }

        if depth == 0 || self.has_timed_out() {
            return Response::leaf(state.evaluate());
        }

        self.branch(state, alpha, beta, depth, state.is_player1s_turn())
    }

    fn branch<S: SearchState>(
        &mut self,
        state: &mut S,
        mut alpha: f64,
        mut beta: f64,
        depth: u32,
        maximizing: bool,
    ) -> Response<S::Action> {
        let mut best = if maximizing { f64::NEG_INFINITY } else { f64::INFINITY };
        let mut best_action = None;

        for action in state.actions() {
            if best_action.is_some() && self.has_timed_out() {
                break;
            }

            state.execute(&action);
            let same_player = state.is_player1s_turn() == maximizing;
            let child_depth = if same_player { depth } else { depth - 1 };
            let value = self.value(state, alpha, beta, child_depth).value;
            state.revert(&action);

            let improves = if maximizing {
                value > best || value == f64::INFINITY
            } else {
                value < best || value == f64::NEG_INFINITY
            };
            if best_action.is_none() || improves {
                best_action = Some(action);
                best = value;
            }

            if maximizing {
                if best >= beta {
                    break;
                }
                alpha = alpha.max(best);
            } else {
                if best <= alpha {
                    break;
                }
                beta = beta.min(best);
            }
        }

        Response {
            value: best,
            best_action,
        }
    }
}

impl Default for AlphaBetaAgent {
    fn default() -> Self {
        Self::new(AlphaBetaConfig::default())
    }
}

//! Exact alpha-beta over components
//!
//! A node never branches on single edges while boxes are on offer. Every
//! capturable component but the last is taken outright; the last one is
//! either taken in full or handed out, and after a full take the mover
//! opens one of the remaining components (or, before the endgame, plays any
//! edge that gives nothing away).
//!
//! Results are memoized under the board hash together with the clamped
//! search window and the recursion depth. Identical keys always describe
//! identical sub-searches, so reuse is exact for a given root.

use std::time::Instant;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::endgame::components::EndgameState;
use crate::graph::Edge;
use crate::rules::{Board, Move};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EndgameConfig {
    /// Memoize sub-searches by board hash and window
    pub use_cache: bool,
}

impl Default for EndgameConfig {
    fn default() -> Self {
        Self { use_cache: true }
    }
}

impl EndgameConfig {
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }
}

/// Value of a position and the full turn that reaches it
#[derive(Clone, Debug, PartialEq)]
pub struct EndgameSolution {
    /// Final score difference from player 1's point of view
    pub value: f64,
    /// Moves of the current turn, to be played in order
    pub best_action: Vec<Move>,
}

impl EndgameSolution {
    /// The turn as one edge list
    pub fn flattened(&self) -> Vec<Edge> {
        Move::flatten(&self.best_action)
    }
}

/// What the mover may do once the captures are settled
enum Openings {
    /// Open one of these edges, known to be an endgame from here on
    Components(Vec<Edge>),
    /// Play any edge that doesn't give a box away
    Normal,
}

pub struct EndgameAgent {
    state: EndgameState,
    pub config: EndgameConfig,
    cache: FxHashMap<u128, EndgameSolution>,
    cache_hits: u64,
    cache_lookups: u64,
    depth: u32,
}

impl EndgameAgent {
    pub fn new(board: &Board) -> Self {
        Self::with_config(board, EndgameConfig::default())
    }

    pub fn with_config(board: &Board, config: EndgameConfig) -> Self {
        Self {
            state: EndgameState::new(board.clone()),
            config,
            cache: FxHashMap::default(),
            cache_hits: 0,
            cache_lookups: 0,
            depth: 0,
        }
    }

    pub fn state(&self) -> &EndgameState {
        &self.state
    }

    pub fn cache_hit_rate(&self) -> f64 {
        self.cache_hits as f64 / self.cache_lookups.max(1) as f64
    }

    /// Solve the position from scratch
    pub fn optimal_action(&mut self) -> EndgameSolution {
        let start = Instant::now();
        self.depth = 0;
        self.cache_hits = 0;
        self.cache_lookups = 0;
        self.cache.clear();

        let solution = self.value(f64::NEG_INFINITY, f64::INFINITY, false);

        tracing::debug!(
            "endgame solved: value {} in {:?}, {} lookups, cache hit rate {:.3}",
            solution.value,
            start.elapsed(),
            self.cache_lookups,
            self.cache_hit_rate()
        );
        solution
    }

    fn value(&mut self, alpha: f64, beta: f64, force_endgame: bool) -> EndgameSolution {
        self.cache_lookups += 1;
        self.depth += 1;

        let key = self.state.state_hash(alpha, beta, self.depth);
        if self.config.use_cache {
            if let Some(hit) = self.cache.get(&key) {
                self.cache_hits += 1;
                self.depth -= 1;
                return hit.clone();
            }
        }

        let endgame = force_endgame || self.state.is_end_game();
        let solution = self.node(alpha, beta, endgame);

        if self.config.use_cache {
            self.cache.insert(key, solution.clone());
        }
        self.depth -= 1;
        solution
    }

    fn node(&mut self, mut alpha: f64, mut beta: f64, endgame: bool) -> EndgameSolution {
        let maximizing = self.state.is_player1s_turn();

        let (sequence, openings) = if endgame {
            let decomposition = self.state.compute_all_current_components();
            if decomposition.non_capturable.is_empty() {
                // Nothing left to open: the mover takes every remaining box
                return EndgameSolution {
                    value: self.state.evaluate(true) as f64,
                    best_action: decomposition
                        .capturable
                        .iter()
                        .map(|c| Move::from(self.state.full_capture_move(c)))
                        .collect(),
                };
            }
            let opens = decomposition
                .non_capturable
                .iter()
                .map(|c| self.state.non_capturable_open_move(c))
                .collect();
            (decomposition.capturable, Openings::Components(opens))
        } else {
            (
                self.state.capturable_components_from_degree_one_vertices(),
                Openings::Normal,
            )
        };

        let improves = |value: f64, best: f64| if maximizing { value > best } else { value < best };
        let cuts = |best: f64, alpha: f64, beta: f64| if maximizing { best >= beta } else { best <= alpha };

        let mut best = if maximizing { f64::NEG_INFINITY } else { f64::INFINITY };
        let mut last_action: Option<Vec<Move>> = None;
        let mut mandatory: Vec<Move> = Vec::new();

        // Everything but the last component is taken outright
        if let Some((_, taken)) = sequence.split_last() {
            for component in taken {
                let mv = Move::from(self.state.full_capture_move(component));
                self.state.execute(&mv);
                mandatory.push(mv);
            }
        }

        let mut cut = false;
        let mut full_capture_suffix: Option<Move> = None;

        if let Some(last) = sequence.last() {
            let split = self.state.split_capturable_component(last);

            if !split.intersection.is_empty() {
                let mv = Move::from(split.intersection);
                self.state.execute(&mv);
                mandatory.push(mv);
            }

            if let Some(handout) = split.handout_suffix {
                let mv = Move::Edge(handout);
                self.state.execute(&mv);
                let value = self.value(alpha, beta, endgame).value;
                self.state.revert(&mv);

                if last_action.is_none() || improves(value, best) {
                    last_action = Some(vec![mv]);
                    best = value;
                }

                if cuts(best, alpha, beta) {
                    cut = true;
                } else if maximizing {
                    alpha = alpha.max(best);
                } else {
                    beta = beta.min(best);
                }
            }

            full_capture_suffix = Some(Move::from(split.full_capture_suffix));
        }

        if !cut {
            if let Some(mv) = &full_capture_suffix {
                self.state.execute(mv);
            }

            let opens = match openings {
                Openings::Components(opens) => opens,
                Openings::Normal => self.state.normal_actions(),
            };

            if opens.is_empty() && !endgame {
                // The captures used up the last safe edge
                let child = self.value(alpha, beta, true);
                if last_action.is_none() || improves(child.value, best) {
                    let mut action: Vec<Move> = full_capture_suffix.iter().cloned().collect();
                    action.extend(child.best_action);
                    last_action = Some(action);
                    best = child.value;
                }
            }

            for edge in opens {
                let mv = Move::Edge(edge);
                self.state.execute(&mv);
                let value = self.value(alpha, beta, endgame).value;
                self.state.revert(&mv);

                if last_action.is_none() || improves(value, best) {
                    let mut action: Vec<Move> = full_capture_suffix.iter().cloned().collect();
                    action.push(mv);
                    last_action = Some(action);
                    best = value;
                }

                if cuts(best, alpha, beta) {
                    break;
                }
                if maximizing {
                    alpha = alpha.max(best);
                } else {
                    beta = beta.min(best);
                }
            }

            if let Some(mv) = &full_capture_suffix {
                self.state.revert(mv);
            }
        }

        for mv in mandatory.iter().rev() {
            self.state.revert(mv);
        }

        let mut best_action = mandatory;
        best_action.extend(last_action.unwrap_or_default());
        EndgameSolution {
            value: best,
            best_action,
        }
    }
}

//! Mid-game position evaluation
//!
//! Runs forced-edge inference, splits what is left into components and
//! scores the long-chain parity, the boxes the mover can take right away and
//! the boxes already banked. Results are memoized twice: by the live edge
//! hash and by the hash of the forced-edge graph, since many positions share
//! the same forced structure.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::graph::{Vertex, VertexSet};
use crate::inference::InferredState;
use crate::player::GameResult;
use crate::rules::{Board, Move};
use crate::state::SearchState;

/// Weights of the evaluation terms
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvalWeights {
    /// Multiplier on the final score difference of a finished game
    pub terminal: f64,
    /// Per box of score difference
    pub score: f64,
    /// Per box the mover is forced to be able to take
    pub forced_box: f64,
    /// Scale of the chain parity bonus
    pub parity: f64,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            terminal: 1e6,
            score: 1000.0,
            forced_box: 1000.0,
            parity: 10.0,
        }
    }
}

/// Structure-dependent part of an evaluation, as stored in the caches
#[derive(Clone, Copy, Debug, PartialEq)]
struct CachedStructure {
    parity_term: f64,
    forced_boxes: usize,
}

/// Evaluation split into the part that doesn't depend on who is to move and
/// the part that is credited to the mover
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    pub player_independent: f64,
    pub player_dependent: f64,
}

impl Evaluation {
    /// Combined value from player 1's point of view
    pub fn value(&self, mover_sign: i32) -> f64 {
        self.player_independent + self.player_dependent * mover_sign as f64
    }
}

/// Connected group of boxes joined by forced edges
#[derive(Clone, Debug, Default)]
struct ComponentSummary {
    boxes: usize,
    has_loop: bool,
    joints: usize,
    open_endpoints: usize,
}

impl ComponentSummary {
    fn assured_boxes(&self) -> usize {
        self.boxes - self.open_endpoints
    }
}

/// Move ordering rank by endpoint degree: capturing first, then edges at
/// degree-3 vertices, degree-4, and edges that open a chain last
const DEGREE_PRIORITY: [u8; 5] = [0, 1, 4, 2, 3];

/// A board that can be searched with the generic alpha-beta agent
#[derive(Clone, Debug)]
pub struct EvaluatedBoard {
    board: Board,
    weights: EvalWeights,
    state_cache: FxHashMap<u64, CachedStructure>,
    forced_cache: FxHashMap<u64, CachedStructure>,
}

impl EvaluatedBoard {
    pub fn new(board: Board) -> Self {
        Self::with_weights(board, EvalWeights::default())
    }

    pub fn with_weights(board: Board, weights: EvalWeights) -> Self {
        Self {
            board,
            weights,
            state_cache: FxHashMap::default(),
            forced_cache: FxHashMap::default(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    pub fn cache_sizes(&self) -> (usize, usize) {
        (self.state_cache.len(), self.forced_cache.len())
    }

    /// Evaluation split into its two terms
    pub fn evaluation(&mut self) -> Evaluation {
        let diff = self.board.score_difference() as f64;
        if self.board.is_game_over() {
            return Evaluation {
                player_independent: diff * self.weights.terminal,
                player_dependent: 0.0,
            };
        }

        let structure = self.structure();
        Evaluation {
            player_independent: structure.parity_term + diff * self.weights.score,
            player_dependent: structure.forced_boxes as f64 * self.weights.forced_box,
        }
    }

    fn structure(&mut self) -> CachedStructure {
        let edge_hash = self.board.edge_hash();
        if let Some(&cached) = self.state_cache.get(&edge_hash) {
            return cached;
        }

        let untaken: VertexSet = self.board.unowned_boxes().collect();
        let inferred = InferredState::from_frontier(self.board.topology(), untaken.clone());

        let forced_hash = inferred.forced.edge_hash();
        if let Some(&cached) = self.forced_cache.get(&forced_hash) {
            return cached;
        }

        let (components, all_closed) = Self::components(&inferred, &untaken);

        let edges_until_forced = self
            .board
            .number_of_edges()
            .saturating_sub(inferred.forced.number_of_edges()) as f64;
        let closed_factor = if all_closed {
            if edges_until_forced == 0.0 {
                10.0
            } else {
                5.0 / edges_until_forced
            }
        } else {
            1.0 / (edges_until_forced + 1.0)
        };

        let mut assured = 0usize;
        let mut total_boxes = 0usize;
        let mut long_chains = 0.0f64;
        let mut short_open_chains = 0usize;
        for component in &components {
            total_boxes += component.boxes;
            let assured_boxes = component.assured_boxes();

            if !component.has_loop && assured_boxes >= 3 {
                long_chains += 1.0;
            } else if !component.has_loop && assured_boxes == 2 && component.open_endpoints > 0 {
                short_open_chains += 1;
            }

            // Joints can merge chains, so each one discounts a third of a chain
            long_chains = (long_chains - component.joints as f64 / 3.0).max(0.0);
            assured += assured_boxes;
        }
        let base = assured as f64 / total_boxes.max(1) as f64;

        // Player 1 wants an odd number of long chains, player 2 an even one
        let long_chains_odd = long_chains % 2.0 == 1.0;
        let mut parity = if long_chains_odd { 1.0 } else { -1.0 };
        if ((short_open_chains as f64 + long_chains) % 2.0 == 1.0) == long_chains_odd {
            parity *= 2.0;
        }

        let structure = CachedStructure {
            parity_term: self.weights.parity * parity * base * closed_factor,
            forced_boxes: inferred.number_of_boxes_forced(),
        };
        self.state_cache.insert(edge_hash, structure);
        self.forced_cache.insert(forced_hash, structure);
        structure
    }

    /// Group untaken boxes by forced edges. Also reports whether every box
    /// is fully forced (no open endpoint anywhere).
    fn components(inferred: &InferredState, untaken: &VertexSet) -> (Vec<ComponentSummary>, bool) {
        let graph = &inferred.inferred;
        let forced = &inferred.forced;

        let mut processed = VertexSet::new();
        let mut components = Vec::new();
        let mut all_closed = true;

        for start in untaken.iter() {
            if processed.contains(start) {
                continue;
            }
            if graph.degree(start) == 0 {
                // Taken by the mover next turn; already counted as forced
                processed.insert(start);
                continue;
            }

            let mut summary = ComponentSummary::default();
            let mut visited = VertexSet::new();
            let mut stack: Vec<(Vertex, Option<Vertex>)> = vec![(start, None)];

            while let Some((node, parent)) = stack.pop() {
                if !visited.insert(node) {
                    continue;
                }
                summary.boxes += 1;

                let forced_count = forced.degree(node);
                if graph.degree(node) > forced_count {
                    summary.open_endpoints += 1;
                    all_closed = false;
                }
                if forced_count == 0 {
                    continue;
                }
                if forced_count >= 3 {
                    summary.joints += 1;
                    continue;
                }

                for &neighbor in graph.neighbors(node) {
                    if !forced.has_edge(node, neighbor) || graph.is_outer_vertex(neighbor) {
                        continue;
                    }
                    if visited.contains(neighbor) && Some(neighbor) != parent {
                        summary.has_loop = true;
                    }
                    stack.push((neighbor, Some(node)));
                }
            }

            processed.extend(visited.iter());
            components.push(summary);
        }

        (components, all_closed)
    }
}

impl SearchState for EvaluatedBoard {
    type Action = Move;

    fn evaluate(&mut self) -> f64 {
        let mover = self.board.current_player().sign();
        self.evaluation().value(mover)
    }

    fn is_player1s_turn(&self) -> bool {
        self.board.is_player1s_turn()
    }

    fn actions(&mut self) -> Vec<Move> {
        let board = &self.board;
        let mut moves = board.all_legal_moves();
        moves.sort_by_key(|mv| {
            mv.last_edge().map_or((0, 0), |edge| {
                let (du, dv) = (board.degree(edge.u), board.degree(edge.v));
                (DEGREE_PRIORITY[du.min(dv)], DEGREE_PRIORITY[du.max(dv)])
            })
        });
        moves
    }

    fn execute(&mut self, action: &Move) {
        if let Err(err) = self.board.make_move(action) {
            panic!("search played an illegal action {action:?}: {err}");
        }
    }

    fn revert(&mut self, action: &Move) {
        if let Err(err) = self.board.revert_move(action) {
            panic!("search could not undo {action:?}: {err}");
        }
    }

    fn result(&self) -> GameResult {
        self.board.result()
    }

    fn is_game_over(&self) -> bool {
        self.board.is_game_over()
    }
}

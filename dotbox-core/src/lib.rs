//! DOTBOX Core - Game engine and AI
//!
//! This crate provides the core game logic for 4x6 Dots and Boxes:
//! - Lattice graph with insertion-ordered adjacency and 58-bit edge hash
//! - Rules engine with box ownership, scores and an undoable move log
//! - Bitboard mirror of the rules for allocation-free playouts
//! - Forced-edge inference and the chain-parity evaluator
//! - Exact endgame search over chain and loop components
//! - Generic alpha-beta, random agents and the move advisor

pub mod error;
pub mod graph;
pub mod player;
pub mod topology;
pub mod rules;
pub mod bitboard;
pub mod inference;
pub mod state;
pub mod eval;
pub mod ai;
pub mod endgame;
pub mod random;
pub mod advisor;

// Re-exports for convenient access
pub use error::{GameError, Result};
pub use graph::{Edge, UndirectedGraph, Vertex, VertexSet};
pub use player::{GameResult, Player};
pub use topology::{BoardTopology, NUM_BOXES, NUM_EDGES};
pub use rules::{Board, Move, MoveResult};
pub use bitboard::Bitboard;
pub use inference::InferredState;
pub use state::SearchState;
pub use eval::{EvalWeights, EvaluatedBoard, Evaluation};
pub use ai::{AlphaBetaAgent, AlphaBetaConfig, SearchOutcome};
pub use endgame::{EndgameAgent, EndgameConfig, EndgameSolution, EndgameState};
pub use random::{RandomAgent, SmartRandomAgent};
pub use advisor::{advise, AdvisorSettings, GameRecord, MoveRequest, MoveResponse};

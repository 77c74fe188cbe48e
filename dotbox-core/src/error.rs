//! Errors raised by board operations on bad caller input
//!
//! Broken internal invariants (a joint escaping bookkeeping, a loop with odd
//! parity, an undo that doesn't match its move) panic instead: they signal a
//! bug in the decomposition code, not a bad request.

use crate::graph::{Edge, Vertex};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("no vertex {0} exists")]
    MissingVertex(Vertex),

    #[error("cannot add a self-edge at vertex {0}")]
    SelfLoop(Vertex),

    #[error("edge {0} doesn't exist")]
    EdgeAbsent(Edge),

    #[error("illegal move: {0}")]
    IllegalMove(Edge),

    #[error("move continues with {0} after an edge that completed no box")]
    MoveContinuesAfterTurnEnded(Edge),

    #[error("no move to revert")]
    NothingToRevert,

    #[error("edge index {0} is not on the board")]
    EdgeIndexOutOfRange(usize),

    #[error("edge index {0} was already taken")]
    EdgeAlreadyTaken(usize),

    #[error("cannot parse edge from {0:?}")]
    InvalidEdge(String),

    #[error("invalid player value {0}")]
    InvalidPlayer(i8),

    #[error("no action available")]
    NoActionAvailable,
}

pub type Result<T> = std::result::Result<T, GameError>;

//! Baseline move pickers

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{GameError, Result};
use crate::graph::Edge;
use crate::rules::Board;

/// Any remaining edge, uniformly
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomAgent;

impl RandomAgent {
    pub fn choose<R: Rng + ?Sized>(&self, board: &Board, rng: &mut R) -> Result<Edge> {
        board
            .unclaimed_edges()
            .choose(rng)
            .copied()
            .ok_or(GameError::NoActionAvailable)
    }
}

/// Takes a box when one is free, otherwise avoids giving one away;
/// only falls back to any edge when every edge concedes
#[derive(Clone, Copy, Debug, Default)]
pub struct SmartRandomAgent;

impl SmartRandomAgent {
    pub fn choose<R: Rng + ?Sized>(&self, board: &Board, rng: &mut R) -> Result<Edge> {
        let mut moves = board.edges_that_capture_or_do_not_create_a_box(true);
        moves.shuffle(rng);
        moves.pop().ok_or(GameError::NoActionAvailable)
    }
}

//! Hash-only mirror of the rules engine
//!
//! The whole position is the 58-bit presence mask plus scores and side to
//! move. Box completion is answered from fixed edge/box tables, so playing a
//! move never allocates. Rollouts in the tree search run on this type.

use crate::error::{GameError, Result};
use crate::graph::Edge;
use crate::player::{GameResult, Player};
use crate::rules::Board;
use crate::topology::{edge_index, EDGE_TABLE, EMPTY_HASH, NUM_BOXES, NUM_EDGES, NUM_HORIZONTAL_EDGES};

/// Boxes on either side of each edge: `(count, boxes)`
pub const BOXES_ADJACENT_TO_EDGE: [(u8, [u8; 2]); NUM_EDGES] = build_edge_boxes();

/// Top, bottom, left and right edge of each box
pub const EDGES_ADJACENT_TO_BOX: [[u8; 4]; NUM_BOXES] = build_box_edges();

const fn build_edge_boxes() -> [(u8, [u8; 2]); NUM_EDGES] {
    let mut table = [(0u8, [0u8; 2]); NUM_EDGES];
    let mut i = 0;
    while i < NUM_EDGES {
        let mut boxes = [0u8; 2];
        let mut count = 0;
        if i >= NUM_HORIZONTAL_EDGES {
            let m = i - NUM_HORIZONTAL_EDGES;
            let column = m % 7;
            let row = m / 7;
            let difference = m - row;
            if column != 0 {
                boxes[count] = (difference - 1) as u8;
                count += 1;
            }
            if column != 6 {
                boxes[count] = difference as u8;
                count += 1;
            }
        } else {
            if i < NUM_BOXES {
                boxes[count] = i as u8;
                count += 1;
            }
            if i >= 6 {
                boxes[count] = (i - 6) as u8;
                count += 1;
            }
        }
        table[i] = (count as u8, boxes);
        i += 1;
    }
    table
}

const fn build_box_edges() -> [[u8; 4]; NUM_BOXES] {
    let mut table = [[0u8; 4]; NUM_BOXES];
    let mut b = 0;
    while b < NUM_BOXES {
        let row = b / 6;
        let left = b + NUM_HORIZONTAL_EDGES + row;
        table[b] = [b as u8, (b + 6) as u8, left as u8, (left + 1) as u8];
        b += 1;
    }
    table
}

/// Boxes adjacent to an edge index
#[inline]
pub fn boxes_adjacent_to_edge(index: usize) -> &'static [u8] {
    let (count, boxes) = &BOXES_ADJACENT_TO_EDGE[index];
    &boxes[..*count as usize]
}

/// Edges of `box_index` still present in `state`
#[inline]
pub fn remaining_edges_of_box(state: u64, box_index: usize) -> u32 {
    EDGES_ADJACENT_TO_BOX[box_index]
        .iter()
        .filter(|&&e| state & (1u64 << e) != 0)
        .count() as u32
}

/// Boxes completed by the removal of `index` (already cleared in `state`)
#[inline]
pub fn completed_boxes_adjacent_to_edge(state: u64, index: usize) -> u32 {
    boxes_adjacent_to_edge(index)
        .iter()
        .filter(|&&b| remaining_edges_of_box(state, b as usize) == 0)
        .count() as u32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bitboard {
    state: u64,
    current_player: Player,
    player1_score: u32,
    player2_score: u32,
}

impl Default for Bitboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Bitboard {
    pub fn new() -> Self {
        Self::with_state(EMPTY_HASH, Player::Player1, 0, 0)
    }

    pub fn with_state(state: u64, current_player: Player, player1_score: u32, player2_score: u32) -> Self {
        Self {
            state,
            current_player,
            player1_score,
            player2_score,
        }
    }

    pub fn from_board(board: &Board) -> Self {
        Self::with_state(
            board.edge_hash(),
            board.current_player(),
            board.player1_score(),
            board.player2_score(),
        )
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn player1_score(&self) -> u32 {
        self.player1_score
    }

    pub fn player2_score(&self) -> u32 {
        self.player2_score
    }

    pub fn score_difference(&self) -> i32 {
        self.player1_score as i32 - self.player2_score as i32
    }

    /// Remove the edge at `index`; returns the number of boxes completed
    pub fn make_move(&mut self, index: usize) -> Result<u32> {
        if index >= NUM_EDGES {
            return Err(GameError::EdgeIndexOutOfRange(index));
        }
        let mask = 1u64 << index;
        if self.state & mask == 0 {
            return Err(GameError::EdgeAlreadyTaken(index));
        }
        self.state &= !mask;

        let completed = completed_boxes_adjacent_to_edge(self.state, index);
        if completed == 0 {
            self.current_player = self.current_player.opponent();
        } else {
            match self.current_player {
                Player::Player1 => self.player1_score += completed,
                Player::Player2 => self.player2_score += completed,
            }
        }
        Ok(completed)
    }

    /// Indices of present edges, ascending
    pub fn legal_moves(&self) -> Vec<usize> {
        let mut moves = Vec::with_capacity(self.state.count_ones() as usize);
        let mut rest = self.state;
        while rest != 0 {
            moves.push(rest.trailing_zeros() as usize);
            rest &= rest - 1;
        }
        moves
    }

    pub fn is_game_over(&self) -> bool {
        self.state == 0
    }

    pub fn result(&self) -> GameResult {
        if !self.is_game_over() {
            return GameResult::Ongoing;
        }
        GameResult::from_score_difference(self.score_difference())
    }

    pub fn edge_index_to_edge(index: usize) -> Option<Edge> {
        EDGE_TABLE.get(index).copied()
    }

    pub fn edge_to_edge_index(edge: Edge) -> Option<usize> {
        edge_index(edge.u, edge.v)
    }
}

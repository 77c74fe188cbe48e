//! Dots and Boxes rules on top of the board topology
//!
//! Playing a line removes its edge from the dual graph. A box whose last
//! edge disappears is completed and goes to the mover, who then moves again.
//! Every removed edge is logged so positions can be unwound exactly.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::graph::{Edge, Vertex};
use crate::player::{GameResult, Player};
use crate::topology::{box_index, BoardTopology, BOX_VERTICES, NUM_BOXES};

// ============================================================================
// MOVES
// ============================================================================

/// A move: one edge, or a sequence of edges played in one turn where every
/// edge but the last completes a box
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Move {
    Edge(Edge),
    Sequence(Vec<Edge>),
}

impl Move {
    pub fn edges(&self) -> &[Edge] {
        match self {
            Move::Edge(edge) => std::slice::from_ref(edge),
            Move::Sequence(edges) => edges,
        }
    }

    pub fn last_edge(&self) -> Option<Edge> {
        self.edges().last().copied()
    }

    pub fn len(&self) -> usize {
        self.edges().len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges().is_empty()
    }

    /// Concatenate the edges of several moves
    pub fn flatten(moves: &[Move]) -> Vec<Edge> {
        moves.iter().flat_map(|m| m.edges().iter().copied()).collect()
    }
}

impl From<Edge> for Move {
    fn from(edge: Edge) -> Self {
        Move::Edge(edge)
    }
}

impl From<Vec<Edge>> for Move {
    fn from(edges: Vec<Edge>) -> Self {
        Move::Sequence(edges)
    }
}

/// Outcome of a single edge removal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveResult {
    pub edge: Edge,
    pub completed_box: bool,
}

/// Consecutive edges played by one player
#[derive(Clone, Debug, PartialEq, Eq)]
struct TurnRecord {
    player: Player,
    edges: Vec<Edge>,
}

// ============================================================================
// BOARD
// ============================================================================

#[derive(Clone, Debug)]
pub struct Board {
    topology: BoardTopology,
    owners: [Option<Player>; NUM_BOXES],
    current_player: Player,
    player1_score: u32,
    player2_score: u32,
    move_log: Vec<TurnRecord>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            topology: BoardTopology::new(),
            owners: [None; NUM_BOXES],
            current_player: Player::Player1,
            player1_score: 0,
            player2_score: 0,
            move_log: Vec::new(),
        }
    }

    /// Fresh board holding only the edges present in `topology`, with no
    /// boxes owned and no history
    pub fn clean_from_topology(topology: &BoardTopology, current_player: Player) -> Self {
        let mut board = Self::new();
        board.topology = BoardTopology::from_hash(topology.edge_hash());
        board.current_player = current_player;
        board
    }

    pub fn topology(&self) -> &BoardTopology {
        &self.topology
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn player1_score(&self) -> u32 {
        self.player1_score
    }

    pub fn player2_score(&self) -> u32 {
        self.player2_score
    }

    pub fn score_difference(&self) -> i32 {
        self.player1_score as i32 - self.player2_score as i32
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn is_player1s_turn(&self) -> bool {
        self.current_player == Player::Player1
    }

    pub fn edge_hash(&self) -> u64 {
        self.topology.edge_hash()
    }

    /// Edge hash combined with score difference and side to move
    pub fn full_hash(&self) -> u128 {
        let fresh_state = (((self.score_difference() + 24) as u128) << 1)
            | if self.is_player1s_turn() { 0 } else { 1 };
        ((self.edge_hash() as u128) << 8) | fresh_state
    }

    pub fn box_owner(&self, v: Vertex) -> Option<Player> {
        box_index(v).and_then(|i| self.owners[i])
    }

    pub fn boxes(&self) -> impl Iterator<Item = Vertex> {
        BOX_VERTICES.into_iter()
    }

    pub fn unowned_boxes(&self) -> impl Iterator<Item = Vertex> + '_ {
        BOX_VERTICES
            .into_iter()
            .zip(self.owners.iter())
            .filter(|(_, owner)| owner.is_none())
            .map(|(v, _)| v)
    }

    pub fn number_of_edges(&self) -> usize {
        self.topology.number_of_edges()
    }

    pub fn has_edge(&self, u: Vertex, v: Vertex) -> bool {
        self.topology.has_edge(u, v)
    }

    pub fn degree(&self, v: Vertex) -> usize {
        self.topology.degree(v)
    }

    pub fn neighbors(&self, v: Vertex) -> &[Vertex] {
        self.topology.neighbors(v)
    }

    pub fn is_inner_vertex(&self, v: Vertex) -> bool {
        self.topology.is_inner_vertex(v)
    }

    pub fn is_outer_vertex(&self, v: Vertex) -> bool {
        self.topology.is_outer_vertex(v)
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.topology.edges()
    }

    /// Every edge played so far, oldest first
    pub fn played_moves(&self) -> Vec<Edge> {
        self.move_log.iter().flat_map(|r| r.edges.iter().copied()).collect()
    }

    pub fn move_log_len(&self) -> usize {
        self.move_log.len()
    }

    pub fn is_game_over(&self) -> bool {
        self.number_of_edges() == 0
    }

    pub fn result(&self) -> GameResult {
        if !self.is_game_over() {
            return GameResult::Ongoing;
        }
        GameResult::from_score_difference(self.score_difference())
    }

    // ========================================================================
    // Edge classes
    // ========================================================================

    pub fn unclaimed_edges(&self) -> Vec<Edge> {
        self.edges().collect()
    }

    /// An endpoint is safe when it is outer or still has more than two edges
    fn is_safe_endpoint(&self, v: Vertex) -> bool {
        self.is_outer_vertex(v) || self.degree(v) > 2
    }

    fn is_capturable_endpoint(&self, v: Vertex) -> bool {
        self.is_inner_vertex(v) && self.degree(v) == 1
    }

    /// Edges whose removal leaves no box capturable
    pub fn unclaimed_edges_that_do_not_create_a_box(&self) -> Vec<Edge> {
        self.edges()
            .filter(|e| self.is_safe_endpoint(e.u) && self.is_safe_endpoint(e.v))
            .collect()
    }

    /// Capturing edges first, then edges that touch no degree-2 vertex.
    /// With `return_early`, any capturing edge short-circuits the second
    /// group. Falls back to every edge when neither group exists.
    pub fn edges_that_capture_or_do_not_create_a_box(&self, return_early: bool) -> Vec<Edge> {
        let all_edges = self.unclaimed_edges();

        let mut moves: Vec<Edge> = all_edges
            .iter()
            .copied()
            .filter(|e| self.is_capturable_endpoint(e.u) || self.is_capturable_endpoint(e.v))
            .collect();

        if return_early && !moves.is_empty() {
            return moves;
        }

        let non_capturing: Vec<Edge> = all_edges
            .iter()
            .copied()
            .filter(|e| self.degree(e.u) != 2 && self.degree(e.v) != 2)
            .collect();

        if non_capturing.is_empty() {
            return all_edges;
        }
        moves.extend(non_capturing);
        moves
    }

    /// True when every remaining edge hands the opponent a box
    pub fn is_end_game(&self) -> bool {
        !self
            .edges()
            .any(|e| self.is_safe_endpoint(e.u) && self.is_safe_endpoint(e.v))
    }

    // ========================================================================
    // Playing and unwinding
    // ========================================================================

    fn set_box_owner(&mut self, v: Vertex, owner: Option<Player>) {
        let Some(index) = box_index(v) else {
            panic!("{v} is not a box");
        };
        let previous = self.owners[index];
        if previous.is_some() && owner.is_some() {
            panic!("box {v} is already taken");
        }

        match previous {
            Some(Player::Player1) => self.player1_score -= 1,
            Some(Player::Player2) => self.player2_score -= 1,
            None => {}
        }
        self.owners[index] = owner;
        match owner {
            Some(Player::Player1) => self.player1_score += 1,
            Some(Player::Player2) => self.player2_score += 1,
            None => {}
        }
    }

    /// Play a move. Every edge but the last must complete a box; the board
    /// keeps any edges played before an error is returned.
    pub fn make_move(&mut self, mv: &Move) -> Result<Vec<MoveResult>> {
        let mut results = Vec::with_capacity(mv.len());
        let mut turn_ended = false;

        for &edge in mv.edges() {
            if turn_ended {
                return Err(GameError::MoveContinuesAfterTurnEnded(edge));
            }
            let result = self.make_single_move(edge)?;
            turn_ended = !result.completed_box;
            results.push(result);
        }

        Ok(results)
    }

    /// Remove one edge, award completed boxes and pass the turn if none was
    pub fn make_single_move(&mut self, edge: Edge) -> Result<MoveResult> {
        let Edge { u, v } = edge;
        if !self.has_edge(u, v) {
            return Err(GameError::IllegalMove(edge));
        }
        let removed = self.topology.remove_edge(u, v)?;

        match self.move_log.last_mut() {
            Some(record) if record.player == self.current_player => record.edges.push(removed),
            _ => self.move_log.push(TurnRecord {
                player: self.current_player,
                edges: vec![removed],
            }),
        }

        let mut completed_box = false;
        for endpoint in [u, v] {
            if self.is_inner_vertex(endpoint) && self.degree(endpoint) == 0 {
                self.set_box_owner(endpoint, Some(self.current_player));
                completed_box = true;
            }
        }

        if !completed_box {
            self.current_player = self.current_player.opponent();
        }

        Ok(MoveResult {
            edge: removed,
            completed_box,
        })
    }

    /// Undo the most recent edge
    pub fn revert_single_move(&mut self) -> Result<Edge> {
        let mut record = self.move_log.pop().ok_or(GameError::NothingToRevert)?;
        let Some(last) = record.edges.pop() else {
            panic!("empty turn record in the move log");
        };

        self.topology.add_edge(last.u, last.v)?;

        for endpoint in [last.u, last.v] {
            if self.box_owner(endpoint).is_some() {
                self.set_box_owner(endpoint, None);
            }
        }

        self.current_player = record.player;
        if !record.edges.is_empty() {
            self.move_log.push(record);
        }

        Ok(last)
    }

    /// Undo a move previously played with [`Board::make_move`]
    ///
    /// # Panics
    /// If the log doesn't end with the edges of `mv`.
    pub fn revert_move(&mut self, mv: &Move) -> Result<()> {
        for &expected in mv.edges().iter().rev() {
            let reverted = self.revert_single_move()?;
            if reverted != expected {
                panic!("reverted {reverted} but the move being undone ends with {expected}");
            }
        }
        Ok(())
    }

    /// Undo the whole most recent turn
    pub fn revert_entire_player_move(&mut self) -> Result<()> {
        let log_len = self.move_log.len();
        if log_len == 0 {
            return Err(GameError::NothingToRevert);
        }
        while self.move_log.len() == log_len {
            self.revert_single_move()?;
        }
        Ok(())
    }

    // ========================================================================
    // Move generation
    // ========================================================================

    /// Legal moves with open capturable components grouped into single
    /// compound moves.
    ///
    /// - two or more capturable components: only their full captures
    /// - exactly one: its full capture, plus the handout when there is one
    /// - none: every remaining edge on its own
    pub fn all_legal_moves(&self) -> Vec<Move> {
        let mut singletons: Vec<Edge> = Vec::new();
        let mut grouped: Vec<Edge> = Vec::new();
        let mut components: Vec<(Vec<Edge>, Option<Vec<Edge>>)> = Vec::new();

        for edge in self.edges() {
            if grouped.contains(&edge) {
                continue;
            }

            let root = if self.is_capturable_endpoint(edge.u) {
                edge.u
            } else if self.is_capturable_endpoint(edge.v) {
                edge.v
            } else {
                if !singletons.contains(&edge) {
                    singletons.push(edge);
                }
                continue;
            };

            let mut component_edges = Vec::new();
            let mut previous = root;
            for neighbor in self.topology.graph().dfs(root) {
                if neighbor == root {
                    continue;
                }
                component_edges.push(Edge::new(previous, neighbor));
                if self.degree(neighbor) > 2 {
                    break;
                }
                previous = neighbor;
            }

            // Two boxes sharing one edge: taking it is a plain move
            if component_edges.len() == 1 {
                if !singletons.contains(&edge) {
                    singletons.push(edge);
                }
                grouped.push(edge);
                continue;
            }

            for e in &component_edges {
                singletons.retain(|s| s != e);
                grouped.push(*e);
            }

            let n = component_edges.len();
            let handout = match self.degree(previous) {
                // Open chain: skip the second to last edge
                2 if n >= 2 => {
                    let mut handout = component_edges[..n - 2].to_vec();
                    handout.push(component_edges[n - 1]);
                    Some(handout)
                }
                // Closed end: leave the last two boxes behind
                1 if n >= 5 => {
                    let mut handout = component_edges[..n - 3].to_vec();
                    handout.push(component_edges[n - 2]);
                    Some(handout)
                }
                _ => None,
            };

            components.push((component_edges, handout));
        }

        match components.len() {
            0 => singletons.into_iter().map(Move::Edge).collect(),
            1 => {
                let (full_capture, handout) = components.remove(0);
                let mut moves = vec![Move::Sequence(full_capture)];
                moves.extend(handout.map(Move::Sequence));
                moves
            }
            _ => components
                .into_iter()
                .map(|(full_capture, _)| Move::Sequence(full_capture))
                .collect(),
        }
    }
}

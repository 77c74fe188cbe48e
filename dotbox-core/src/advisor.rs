//! Move advice for a game in progress
//!
//! A request carries the full move history. While the board is wide open a
//! smart random move is returned; once few enough safe edges remain the
//! exact endgame search takes over.

use std::time::Instant;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::endgame::EndgameAgent;
use crate::error::{GameError, Result};
use crate::graph::Edge;
use crate::player::Player;
use crate::random::SmartRandomAgent;
use crate::rules::Board;

/// Safe-edge count above which the advisor doesn't search
pub const DEFAULT_THRESHOLD: usize = 24;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorSettings {
    pub threshold: usize,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl AdvisorSettings {
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Every edge played since the start, in order
    pub moves: Vec<Edge>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub game: GameRecord,
    #[serde(rename = "currentPlayer", alias = "current_player")]
    pub current_player: Player,
    #[serde(default)]
    pub settings: Option<AdvisorSettings>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResponse {
    /// One full turn, in order
    #[serde(rename = "move")]
    pub edges: Vec<Edge>,
}

/// Rebuild the position described by a move history
pub fn replay(moves: &[Edge]) -> Result<Board> {
    let mut board = Board::new();
    for &edge in moves {
        board.make_single_move(edge)?;
    }
    Ok(board)
}

/// Suggest the next turn for the player to move
pub fn advise<R: Rng + ?Sized>(request: &MoveRequest, rng: &mut R) -> Result<MoveResponse> {
    let board = replay(&request.game.moves)?;
    if board.is_game_over() {
        return Err(GameError::NoActionAvailable);
    }
    if board.current_player() != request.current_player {
        tracing::warn!(
            "request says {:?} is to move but the history gives {:?}",
            request.current_player,
            board.current_player()
        );
    }

    let threshold = request.settings.as_ref().map_or(DEFAULT_THRESHOLD, |s| s.threshold);
    let safe_edges = board.unclaimed_edges_that_do_not_create_a_box().len();
    tracing::debug!("{} safe edges, threshold {}", safe_edges, threshold);

    if safe_edges > threshold {
        let edge = SmartRandomAgent.choose(&board, rng)?;
        tracing::info!("random move {}", edge);
        return Ok(MoveResponse { edges: vec![edge] });
    }

    let start = Instant::now();
    let mut agent = EndgameAgent::new(&board);
    let solution = agent.optimal_action();
    let edges = solution.flattened();
    tracing::info!(
        "endgame move {:?}, value {}, {:?}, cache hit rate {:.3}",
        edges,
        solution.value,
        start.elapsed(),
        agent.cache_hit_rate()
    );

    if edges.is_empty() {
        return Err(GameError::NoActionAvailable);
    }
    Ok(MoveResponse { edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn request(moves: Vec<Edge>, current_player: Player, threshold: Option<usize>) -> MoveRequest {
        MoveRequest {
            game: GameRecord { moves },
            current_player,
            settings: threshold.map(|t| AdvisorSettings::default().with_threshold(t)),
        }
    }

    #[test]
    fn test_request_wire_format() {
        let json = r#"{"game":{"moves":[{"u":11,"v":1},{"u":2,"v":12}]},"currentPlayer":1,"settings":{"threshold":10}}"#;
        let parsed: MoveRequest = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.game.moves, vec![Edge::new(1, 11), Edge::new(2, 12)]);
        assert_eq!(parsed.current_player, Player::Player1);
        assert_eq!(parsed.settings, Some(AdvisorSettings { threshold: 10 }));

        let bare: MoveRequest = serde_json::from_str(r#"{"game":{"moves":[]},"currentPlayer":-1}"#).unwrap();
        assert_eq!(bare.settings, None);
        assert_eq!(bare.current_player, Player::Player2);
        assert!(serde_json::to_string(&bare).unwrap().contains(r#""currentPlayer":-1"#));

        let snake: MoveRequest = serde_json::from_str(r#"{"game":{"moves":[]},"current_player":1}"#).unwrap();
        assert_eq!(snake.current_player, Player::Player1);

        let response = MoveResponse {
            edges: vec![Edge::new(1, 11)],
        };
        assert_eq!(serde_json::to_string(&response).unwrap(), r#"{"move":[{"u":1,"v":11}]}"#);
    }

    #[test]
    fn test_open_board_gets_single_safe_edge() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let response = advise(&request(vec![], Player::Player1, None), &mut rng).unwrap();
        assert_eq!(response.edges.len(), 1);

        let board = Board::new();
        let edge = response.edges[0];
        assert!(board.has_edge(edge.u, edge.v));
    }

    #[test]
    fn test_endgame_gets_legal_turn() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut board = Board::new();
        while !board.is_end_game() {
            let safe = board.unclaimed_edges_that_do_not_create_a_box();
            board.make_single_move(*safe.choose(&mut rng).unwrap()).unwrap();
        }
        while board.number_of_edges() > 16 {
            let edges = board.unclaimed_edges();
            board.make_single_move(*edges.choose(&mut rng).unwrap()).unwrap();
        }
        let history = board.played_moves();
        let mover = board.current_player();

        let response = advise(&request(history, mover, Some(0)), &mut rng).unwrap();
        assert!(!response.edges.is_empty());

        let (last, captures) = response.edges.split_last().unwrap();
        for &edge in captures {
            assert!(board.make_single_move(edge).unwrap().completed_box);
        }
        board.make_single_move(*last).unwrap();
    }

    #[test]
    fn test_bad_history_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let repeated = vec![Edge::new(1, 11), Edge::new(1, 11)];
        let result = advise(&request(repeated, Player::Player1, None), &mut rng);
        assert_eq!(result, Err(GameError::IllegalMove(Edge::new(1, 11))));
    }
}

//! Integration tests for the dots and boxes engine
//!
//! Tests the full stack: rules, bitboard, alpha-beta, endgame search, MCTS,
//! the advisor and the `dotbox` binary.

use std::io::Write;
use std::process::{Command, Stdio};

use dotbox_core::{
    advise, AdvisorSettings, AlphaBetaAgent, AlphaBetaConfig, Bitboard, Board, EndgameAgent,
    EvaluatedBoard, GameRecord, MoveRequest, MoveResponse, Player, RandomAgent, SmartRandomAgent,
    NUM_BOXES, NUM_EDGES,
};
use dotbox_mcts::{MctsConfig, MctsPlayer, RolloutPolicy};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ============================================================================
// TEST FIXTURES
// ============================================================================

/// Play safe edges at random until every remaining edge concedes a box
fn endgame_board(seed: u64) -> Board {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut board = Board::new();
    while !board.is_end_game() {
        let safe = board.unclaimed_edges_that_do_not_create_a_box();
        let edge = *safe.choose(&mut rng).unwrap();
        board.make_single_move(edge).unwrap();
    }
    board
}

fn request_for(board: &Board, threshold: Option<usize>) -> MoveRequest {
    MoveRequest {
        game: GameRecord {
            moves: board.played_moves(),
        },
        current_player: board.current_player(),
        settings: threshold.map(|t| AdvisorSettings::default().with_threshold(t)),
    }
}

// ============================================================================
// RULES TESTS
// ============================================================================

#[test]
fn test_random_game_scores_every_box() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut board = Board::new();
    let mut turns = 0;

    while !board.is_game_over() {
        let edge = RandomAgent.choose(&board, &mut rng).unwrap();
        board.make_single_move(edge).unwrap();
        turns += 1;
    }

    assert_eq!(turns, NUM_EDGES);
    assert_eq!((board.player1_score() + board.player2_score()) as usize, NUM_BOXES);
    assert!(board.result().is_over());
}

#[test]
fn test_bitboard_tracks_rules_engine() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut board = Board::new();
    let mut bits = Bitboard::from_board(&board);

    while !bits.is_game_over() {
        let index = *bits.legal_moves().choose(&mut rng).unwrap();
        let edge = Bitboard::edge_index_to_edge(index).unwrap();

        let completed = bits.make_move(index).unwrap();
        let outcome = board.make_single_move(edge).unwrap();

        assert_eq!(completed > 0, outcome.completed_box);
        assert_eq!(bits.state(), board.edge_hash());
        assert_eq!(bits.current_player(), board.current_player());
        assert_eq!(bits.player1_score(), board.player1_score());
        assert_eq!(bits.player2_score(), board.player2_score());
    }
    assert_eq!(bits.result(), board.result());
}

// ============================================================================
// ALPHA-BETA TESTS
// ============================================================================

#[test]
fn test_alpha_beta_plays_full_game_against_smart_random() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut agent = AlphaBetaAgent::new(AlphaBetaConfig::default().with_max_depth(1));
    let mut board = Board::new();

    while !board.is_game_over() {
        if board.current_player() == Player::Player1 {
            let mut state = EvaluatedBoard::new(board.clone());
            let outcome = agent.optimal_action(&mut state).unwrap();
            board.make_move(&outcome.action).unwrap();
        } else {
            let edge = SmartRandomAgent.choose(&board, &mut rng).unwrap();
            board.make_single_move(edge).unwrap();
        }
    }

    assert_eq!((board.player1_score() + board.player2_score()) as usize, NUM_BOXES);
}

// ============================================================================
// ENDGAME TESTS
// ============================================================================

#[test]
fn test_endgame_turn_is_playable() {
    for seed in 0..3 {
        let board = endgame_board(seed);
        let mut agent = EndgameAgent::new(&board);
        let solution = agent.optimal_action();
        let edges = solution.flattened();
        assert!(!edges.is_empty(), "seed {} produced no move", seed);

        let mut copy = board.clone();
        let mover = copy.current_player();
        for (i, &edge) in edges.iter().enumerate() {
            assert_eq!(copy.current_player(), mover, "turn passed before edge {}", i);
            copy.make_single_move(edge).unwrap();
        }
        // The value is a final score difference, so it can't exceed the box count
        assert!(solution.value.abs() <= NUM_BOXES as f64);
    }
}

// ============================================================================
// ADVISOR TESTS
// ============================================================================

#[test]
fn test_advisor_request_round_trip() {
    let json = r#"{"game":{"moves":[{"u":0,"v":1}]},"currentPlayer":-1,"settings":{"threshold":30}}"#;
    let request: MoveRequest = serde_json::from_str(json).unwrap();
    assert_eq!(request.current_player, Player::Player2);
    assert_eq!(request.settings, Some(AdvisorSettings::default().with_threshold(30)));

    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let response = advise(&request, &mut rng).unwrap();
    let encoded = serde_json::to_string(&response).unwrap();
    assert!(encoded.starts_with(r#"{"move":[{"u":"#));

    let decoded: MoveResponse = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, response);
}

#[test]
fn test_advisor_searches_endgame() {
    let board = endgame_board(5);
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let response = advise(&request_for(&board, Some(0)), &mut rng).unwrap();

    let mut copy = board.clone();
    for &edge in &response.edges {
        copy.make_single_move(edge).unwrap();
    }
    assert!(copy.move_log_len() > board.move_log_len());
}

// ============================================================================
// MCTS TESTS
// ============================================================================

#[test]
fn test_mcts_beats_random_more_often_than_not() {
    let mut wins = 0;
    for game in 0..4u64 {
        let config = MctsConfig::iterations(400)
            .with_rollout(RolloutPolicy::Greedy)
            .with_seed(game);
        let mut mcts = MctsPlayer::new(config);
        let mut rng = ChaCha8Rng::seed_from_u64(100 + game);
        let mut board = Board::new();

        while !board.is_game_over() {
            let edge = if board.current_player() == Player::Player1 {
                mcts.best_move(&board).unwrap()
            } else {
                RandomAgent.choose(&board, &mut rng).unwrap()
            };
            board.make_single_move(edge).unwrap();
        }

        println!(
            "game {}: MCTS {} - random {}",
            game,
            board.player1_score(),
            board.player2_score()
        );
        if board.result().winner() == Some(Player::Player1) {
            wins += 1;
        }
    }
    assert!(wins >= 3, "MCTS won only {} of 4 games", wins);
}

#[test]
fn test_mcts_search_statistics() {
    let mut mcts = MctsPlayer::new(MctsConfig::iterations(200).with_seed(1));
    let result = mcts.search(&Board::new());

    assert_eq!(result.iterations, 200);
    assert!(result.tree.len() > 1);
    assert!(result.best_move.is_some());

    let plays: u32 = result.move_stats.iter().map(|s| s.plays).sum();
    assert_eq!(plays as u64, result.iterations);
}

// ============================================================================
// BINARY TESTS
// ============================================================================

fn run_binary(args: &[&str], stdin: &str) -> String {
    let mut child = Command::new(env!("CARGO_BIN_EXE_dotbox"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(stdin.as_bytes()).unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn test_binary_solve_reads_stdin() {
    let stdout = run_binary(
        &["solve", "--seed", "1"],
        r#"{"game":{"moves":[]},"currentPlayer":1}"#,
    );
    let response: MoveResponse = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(response.edges.len(), 1);
}

#[test]
fn test_binary_serve_answers_until_eof() {
    let stdout = run_binary(
        &["serve", "--seed", "1"],
        "{\"game\":{\"moves\":[]},\"currentPlayer\":1}\nnot json\n",
    );
    let lines: Vec<&str> = stdout.lines().collect();
    // The second request may supersede the first before the worker reads it
    assert!(!lines.is_empty() && lines.len() <= 2);
    assert!(lines.last().unwrap().starts_with(r#"{"error":"#));
}

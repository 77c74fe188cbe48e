//! Match command - play games between two agents
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: play_match(), report_results()
//! - Level 3: play_single_game(), compute_match_statistics()
//! - Level 4: agent construction, formatting utilities

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use dotbox_core::{
    advise, AdvisorSettings, AlphaBetaAgent, AlphaBetaConfig, Board, Edge, EvaluatedBoard, GameRecord, GameResult,
    MoveRequest, Player, RandomAgent, SmartRandomAgent,
};
use dotbox_mcts::{MctsConfig, MctsPlayer};

use crate::config::{create_rng, AgentConfig};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PlayerKind {
    /// Any remaining edge
    Random,
    /// Free boxes first, otherwise an edge that gives nothing away
    SmartRandom,
    /// Heuristic alpha-beta search
    AlphaBeta,
    /// Smart random while the board is open, exact endgame search after
    #[value(alias = "endgame")]
    Advisor,
    /// Monte Carlo tree search
    Mcts,
}

#[derive(Args)]
pub struct MatchArgs {
    /// Agent for the first seat
    #[arg(long, value_enum)]
    pub player1: PlayerKind,

    /// Agent for the second seat
    #[arg(long, value_enum)]
    pub player2: PlayerKind,

    /// Number of games to play (seats alternate)
    #[arg(long, default_value = "10")]
    pub games: usize,

    /// Per-move time limit for alpha-beta and MCTS
    #[arg(long)]
    pub time_limit_ms: Option<u64>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Result of a single game
#[derive(Clone, Debug)]
struct MatchGame {
    game_number: usize,
    result: GameResult,
    /// Seat taken by the `--player1` agent
    first_agent_seat: Player,
    player1_score: u32,
    player2_score: u32,
    turns: usize,
}

/// Aggregated match results
#[derive(Clone, Debug)]
struct MatchResults {
    games: Vec<MatchGame>,
    first_agent_wins: usize,
    second_agent_wins: usize,
    draws: usize,
    avg_turns: f32,
}

// ============================================================================
// AGENTS (Level 4)
// ============================================================================

enum Agent {
    Random,
    SmartRandom,
    AlphaBeta(AlphaBetaAgent),
    Advisor(AdvisorSettings),
    Mcts(MctsPlayer),
}

impl Agent {
    fn new(kind: PlayerKind, config: &AgentConfig, time_limit: Option<Duration>, seed: Option<u64>) -> Self {
        match kind {
            PlayerKind::Random => Agent::Random,
            PlayerKind::SmartRandom => Agent::SmartRandom,
            PlayerKind::AlphaBeta => {
                let mut ab: AlphaBetaConfig = config.alpha_beta.clone();
                if let Some(limit) = time_limit {
                    ab = ab.with_timeout(limit);
                }
                Agent::AlphaBeta(AlphaBetaAgent::new(ab))
            }
            PlayerKind::Advisor => Agent::Advisor(config.advisor.clone()),
            PlayerKind::Mcts => {
                let mut mcts: MctsConfig = config.mcts.clone();
                if let Some(limit) = time_limit {
                    mcts = mcts.with_time_limit(limit);
                }
                if let (None, Some(seed)) = (mcts.seed, seed) {
                    mcts = mcts.with_seed(seed);
                }
                Agent::Mcts(MctsPlayer::new(mcts))
            }
        }
    }

    /// Edges to play for the side to move, in order
    fn turn<R: Rng + ?Sized>(&mut self, board: &Board, rng: &mut R) -> Result<Vec<Edge>> {
        let edges = match self {
            Agent::Random => vec![RandomAgent.choose(board, rng)?],
            Agent::SmartRandom => vec![SmartRandomAgent.choose(board, rng)?],
            Agent::AlphaBeta(agent) => {
                let mut state = EvaluatedBoard::new(board.clone());
                let outcome = agent.optimal_action(&mut state)?;
                outcome.action.edges().to_vec()
            }
            Agent::Advisor(settings) => {
                let request = MoveRequest {
                    game: GameRecord {
                        moves: board.played_moves(),
                    },
                    current_player: board.current_player(),
                    settings: Some(settings.clone()),
                };
                advise(&request, rng)?.edges
            }
            Agent::Mcts(player) => vec![player.best_move(board)?],
        };
        Ok(edges)
    }
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run match command
///
/// 1. Build both agents
/// 2. Play the match (multiple games)
/// 3. Report results
pub fn run(args: MatchArgs, config: &AgentConfig, seed: Option<u64>) -> Result<()> {
    tracing::info!(
        "Starting match: {:?} vs {:?} ({} games)",
        args.player1,
        args.player2,
        args.games
    );

    let time_limit = args.time_limit_ms.map(Duration::from_millis);
    let mut first = Agent::new(args.player1, config, time_limit, seed);
    let mut second = Agent::new(args.player2, config, time_limit, seed.map(|s| s.wrapping_add(1)));

    let results = play_match(&mut first, &mut second, args.games, seed)?;
    report_results(&results, &args);

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn play_match(first: &mut Agent, second: &mut Agent, games: usize, seed: Option<u64>) -> Result<MatchResults> {
    let mut rng = create_rng(seed);
    let mut records = Vec::with_capacity(games);

    for game_num in 0..games {
        // Alternate seats for fairness
        let swap_seats = game_num % 2 == 1;
        let record = if swap_seats {
            play_single_game(second, first, game_num + 1, Player::Player2, &mut rng)?
        } else {
            play_single_game(first, second, game_num + 1, Player::Player1, &mut rng)?
        };

        tracing::info!(
            "Game {}: {:?} ({} - {}, {} turns)",
            record.game_number,
            record.result,
            record.player1_score,
            record.player2_score,
            record.turns
        );
        records.push(record);
    }

    Ok(compute_match_statistics(records))
}

fn report_results(results: &MatchResults, args: &MatchArgs) {
    if args.json {
        print_json_results(results, args);
    } else {
        print_text_results(results, args);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Play one game from the empty board
fn play_single_game(
    player1: &mut Agent,
    player2: &mut Agent,
    game_number: usize,
    first_agent_seat: Player,
    rng: &mut ChaCha8Rng,
) -> Result<MatchGame> {
    let mut board = Board::new();
    let mut turns = 0;

    while !board.is_game_over() {
        let agent = match board.current_player() {
            Player::Player1 => &mut *player1,
            Player::Player2 => &mut *player2,
        };
        let edges = agent.turn(&board, rng)?;
        if edges.is_empty() {
            bail!("agent returned an empty turn in game {}", game_number);
        }
        for edge in edges {
            board
                .make_single_move(edge)
                .with_context(|| format!("agent played an illegal edge in game {}", game_number))?;
        }
        turns += 1;
    }

    Ok(MatchGame {
        game_number,
        result: board.result(),
        first_agent_seat,
        player1_score: board.player1_score(),
        player2_score: board.player2_score(),
        turns,
    })
}

fn compute_match_statistics(games: Vec<MatchGame>) -> MatchResults {
    let first_agent_wins = games
        .iter()
        .filter(|g| g.result.winner() == Some(g.first_agent_seat))
        .count();
    let second_agent_wins = games
        .iter()
        .filter(|g| g.result.winner() == Some(g.first_agent_seat.opponent()))
        .count();
    let draws = games.iter().filter(|g| g.result == GameResult::Draw).count();

    let total_turns: usize = games.iter().map(|g| g.turns).sum();
    let avg_turns = if games.is_empty() {
        0.0
    } else {
        total_turns as f32 / games.len() as f32
    };

    MatchResults {
        games,
        first_agent_wins,
        second_agent_wins,
        draws,
        avg_turns,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn percent(count: usize, total: usize) -> f32 {
    if total > 0 {
        count as f32 / total as f32 * 100.0
    } else {
        0.0
    }
}

fn print_json_results(results: &MatchResults, args: &MatchArgs) {
    #[derive(serde::Serialize)]
    struct JsonGame {
        game_number: usize,
        result: String,
        first_agent_seat: Player,
        player1_score: u32,
        player2_score: u32,
        turns: usize,
    }

    #[derive(serde::Serialize)]
    struct JsonOutput {
        first_agent: String,
        second_agent: String,
        total_games: usize,
        first_agent_wins: usize,
        second_agent_wins: usize,
        draws: usize,
        avg_turns: f32,
        games: Vec<JsonGame>,
    }

    let output = JsonOutput {
        first_agent: format!("{:?}", args.player1),
        second_agent: format!("{:?}", args.player2),
        total_games: results.games.len(),
        first_agent_wins: results.first_agent_wins,
        second_agent_wins: results.second_agent_wins,
        draws: results.draws,
        avg_turns: results.avg_turns,
        games: results
            .games
            .iter()
            .map(|g| JsonGame {
                game_number: g.game_number,
                result: format!("{:?}", g.result),
                first_agent_seat: g.first_agent_seat,
                player1_score: g.player1_score,
                player2_score: g.player2_score,
                turns: g.turns,
            })
            .collect(),
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

fn print_text_results(results: &MatchResults, args: &MatchArgs) {
    let total = results.games.len();

    println!("\n=== Match Results ===");
    println!("Total games: {}", total);
    println!(
        "{:?} wins: {} ({:.1}%)",
        args.player1,
        results.first_agent_wins,
        percent(results.first_agent_wins, total)
    );
    println!(
        "{:?} wins: {} ({:.1}%)",
        args.player2,
        results.second_agent_wins,
        percent(results.second_agent_wins, total)
    );
    println!("Draws: {} ({:.1}%)", results.draws, percent(results.draws, total));
    println!("Avg turns: {:.1}", results.avg_turns);

    println!("\nGame details:");
    for game in &results.games {
        println!(
            "  Game {}: {:?} {} - {} in {} turns",
            game.game_number, game.result, game.player1_score, game.player2_score, game.turns
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

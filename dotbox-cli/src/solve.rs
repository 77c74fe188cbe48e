//! Solve command - answer a single move request
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: read_request(), answer()
//! - Level 4: input selection

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rand::Rng;

use dotbox_core::{advise, AdvisorSettings, MoveRequest, MoveResponse};

use crate::config::{create_rng, AgentConfig};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct SolveArgs {
    /// Request JSON file (stdin when omitted)
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run solve command
///
/// 1. Read the request
/// 2. Ask the advisor
/// 3. Print the response as one JSON line
pub fn run(args: SolveArgs, config: &AgentConfig, seed: Option<u64>) -> Result<()> {
    let text = read_request(&args)?;
    let request: MoveRequest = serde_json::from_str(&text).context("Failed to parse move request")?;

    let mut rng = create_rng(seed);
    let response = answer(request, &config.advisor, &mut rng)?;

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn read_request(args: &SolveArgs) -> Result<String> {
    match &args.file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read request: {}", path.display()))
        }
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).context("Failed to read request from stdin")?;
            Ok(text)
        }
    }
}

/// Advise on a request, filling in configured settings it doesn't carry
pub fn answer<R: Rng + ?Sized>(
    mut request: MoveRequest,
    defaults: &AdvisorSettings,
    rng: &mut R,
) -> Result<MoveResponse> {
    if request.settings.is_none() {
        request.settings = Some(defaults.clone());
    }
    let response = advise(&request, rng).context("No move for this request")?;
    Ok(response)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dotbox_core::{Board, GameRecord, Player};

    #[test]
    fn test_answer_uses_configured_threshold() {
        // No board has more safe edges than edges, so this always searches
        let mut board = Board::new();
        let edges = board.unclaimed_edges();
        for &edge in &edges[..50] {
            board.make_single_move(edge).unwrap();
        }
        let request = MoveRequest {
            game: GameRecord {
                moves: board.played_moves(),
            },
            current_player: board.current_player(),
            settings: None,
        };

        let mut rng = create_rng(Some(1));
        let response = answer(request, &AdvisorSettings::default().with_threshold(58), &mut rng).unwrap();
        assert!(!response.edges.is_empty());
        for edge in &response.edges {
            assert!(board.has_edge(edge.u, edge.v));
        }
    }

    #[test]
    fn test_answer_fails_on_finished_game() {
        let board = Board::new();
        let request = MoveRequest {
            game: GameRecord {
                moves: board.unclaimed_edges(),
            },
            current_player: Player::Player1,
            settings: None,
        };
        let mut rng = create_rng(Some(0));
        let err = answer(request, &AdvisorSettings::default(), &mut rng).unwrap_err();
        assert!(err.to_string().contains("No move"));
    }

    #[test]
    fn test_read_request_from_file() {
        let path = std::env::temp_dir().join("dotbox_solve_request.json");
        fs::write(&path, r#"{"game":{"moves":[]},"currentPlayer":1}"#).unwrap();
        let text = read_request(&SolveArgs { file: Some(path.clone()) }).unwrap();
        let request: MoveRequest = serde_json::from_str(&text).unwrap();
        assert!(request.game.moves.is_empty());
        fs::remove_file(path).unwrap();
    }
}

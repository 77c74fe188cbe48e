//! Benchmark command - time the search agents
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: report_results()
//! - Level 3: benchmark_rollouts(), benchmark_mcts(), benchmark_alpha_beta(), benchmark_endgame()
//! - Level 4: position generation, formatting

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Args;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use dotbox_core::{AlphaBetaAgent, AlphaBetaConfig, Bitboard, Board, EndgameAgent, EvaluatedBoard};
use dotbox_mcts::{run_search, MctsConfig, RolloutPolicy};

use crate::config::create_rng;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct BenchmarkArgs {
    /// Positions to time per benchmark
    #[arg(long, default_value = "5")]
    pub positions: usize,

    /// Deepest alpha-beta search to time
    #[arg(long, default_value = "2")]
    pub depth: u32,

    /// MCTS iterations per move
    #[arg(long, default_value = "2000")]
    pub mcts_iterations: u64,

    /// Rollouts per policy for the throughput test
    #[arg(long, default_value = "20000")]
    pub rollouts: usize,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Results of a single benchmark run
#[derive(Clone, Debug, serde::Serialize)]
struct BenchmarkResult {
    name: String,
    samples: usize,
    total_ms: f64,
    avg_ms: f64,
    per_second: f64,
    notes: String,
}

impl BenchmarkResult {
    fn new(name: String, samples: usize, total: Duration, notes: String) -> Self {
        let total_ms = total.as_secs_f64() * 1000.0;
        let avg_ms = if samples > 0 { total_ms / samples as f64 } else { 0.0 };
        let per_second = if total_ms > 0.0 {
            samples as f64 / total.as_secs_f64()
        } else {
            0.0
        };
        Self {
            name,
            samples,
            total_ms,
            avg_ms,
            per_second,
            notes,
        }
    }
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run benchmark command
///
/// 1. Rollout throughput per policy
/// 2. MCTS move time
/// 3. Alpha-beta move time at each depth
/// 4. Exact endgame solve time
pub fn run(args: BenchmarkArgs, seed: Option<u64>) -> Result<()> {
    tracing::info!("Starting benchmarks: {} positions", args.positions);
    let mut rng = create_rng(seed);
    let mut results = Vec::new();

    for policy in [RolloutPolicy::Uniform, RolloutPolicy::Greedy] {
        results.push(benchmark_rollouts(policy, args.rollouts, &mut rng));
    }
    results.push(benchmark_mcts(args.positions, args.mcts_iterations, &mut rng));
    for depth in 1..=args.depth {
        results.push(benchmark_alpha_beta(args.positions, depth, &mut rng)?);
    }
    results.push(benchmark_endgame(args.positions, &mut rng));

    report_results(&results, &args);
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn report_results(results: &[BenchmarkResult], args: &BenchmarkArgs) {
    if args.json {
        if let Ok(json) = serde_json::to_string_pretty(results) {
            println!("{}", json);
        }
        return;
    }

    println!("\n=== Benchmark Results ===");
    println!(
        "{:<24} {:>8} {:>12} {:>12} {:>12}  Notes",
        "Name", "Samples", "Total ms", "Avg ms", "Per second"
    );
    for r in results {
        println!(
            "{:<24} {:>8} {:>12.1} {:>12.3} {:>12.1}  {}",
            r.name, r.samples, r.total_ms, r.avg_ms, r.per_second, r.notes
        );
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

fn benchmark_rollouts(policy: RolloutPolicy, count: usize, rng: &mut ChaCha8Rng) -> BenchmarkResult {
    tracing::info!("Benchmarking {:?} rollouts...", policy);
    let start = Instant::now();
    let mut player1_boxes = 0u64;
    for _ in 0..count {
        let result = policy.rollout(Bitboard::new(), rng);
        player1_boxes += result.board.player1_score() as u64;
    }
    let elapsed = start.elapsed();

    BenchmarkResult::new(
        format!("Rollout {:?}", policy),
        count,
        elapsed,
        format!("Avg player 1 boxes: {:.2}", player1_boxes as f64 / count.max(1) as f64),
    )
}

fn benchmark_mcts(positions: usize, iterations: u64, rng: &mut ChaCha8Rng) -> BenchmarkResult {
    tracing::info!("Benchmarking MCTS ({} iterations)...", iterations);
    let config = MctsConfig::iterations(iterations);
    let mut total = Duration::ZERO;
    let mut nodes = 0;

    for _ in 0..positions {
        let board = safe_position(rng, 10);
        let start = Instant::now();
        let result = run_search(&Bitboard::from_board(&board), &config, rng);
        total += start.elapsed();
        nodes += result.tree.len();
    }

    BenchmarkResult::new(
        format!("MCTS {} iterations", iterations),
        positions,
        total,
        format!("Avg tree size: {:.0}", nodes as f64 / positions.max(1) as f64),
    )
}

fn benchmark_alpha_beta(positions: usize, depth: u32, rng: &mut ChaCha8Rng) -> Result<BenchmarkResult> {
    tracing::info!("Benchmarking alpha-beta at depth {}...", depth);
    let mut agent = AlphaBetaAgent::new(AlphaBetaConfig::default().with_max_depth(depth));
    let mut total = Duration::ZERO;
    let mut timeouts = 0;

    for _ in 0..positions {
        let mut state = EvaluatedBoard::new(safe_position(rng, 14));
        let start = Instant::now();
        let outcome = agent.optimal_action(&mut state)?;
        total += start.elapsed();
        if outcome.timed_out {
            timeouts += 1;
        }
    }

    Ok(BenchmarkResult::new(
        format!("Alpha-Beta D{}", depth),
        positions,
        total,
        format!("Timeouts: {}", timeouts),
    ))
}

fn benchmark_endgame(positions: usize, rng: &mut ChaCha8Rng) -> BenchmarkResult {
    tracing::info!("Benchmarking exact endgame search...");
    let mut total = Duration::ZERO;
    let mut hit_rate = 0.0;

    for _ in 0..positions {
        let board = endgame_position(rng);
        let mut agent = EndgameAgent::new(&board);
        let start = Instant::now();
        agent.optimal_action();
        total += start.elapsed();
        hit_rate += agent.cache_hit_rate();
    }

    BenchmarkResult::new(
        "Endgame exact".to_string(),
        positions,
        total,
        format!("Avg cache hit rate: {:.3}", hit_rate / positions.max(1) as f64),
    )
}

// ============================================================================
// LEVEL 4 - POSITIONS
// ============================================================================

/// Board after `moves` random edges that give nothing away
fn safe_position(rng: &mut ChaCha8Rng, moves: usize) -> Board {
    let mut board = Board::new();
    for _ in 0..moves {
        let safe = board.unclaimed_edges_that_do_not_create_a_box();
        let Some(&edge) = safe.choose(rng) else { break };
        if board.make_single_move(edge).is_err() {
            break;
        }
    }
    board
}

/// First position where every edge concedes a box
fn endgame_position(rng: &mut ChaCha8Rng) -> Board {
    let mut board = Board::new();
    while !board.is_end_game() {
        let safe = board.unclaimed_edges_that_do_not_create_a_box();
        let Some(&edge) = safe.choose(rng) else { break };
        if board.make_single_move(edge).is_err() {
            break;
        }
    }
    board
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benchmark_result_rates() {
        let result = BenchmarkResult::new("x".into(), 4, Duration::from_millis(200), String::new());
        assert!((result.avg_ms - 50.0).abs() < 1e-9);
        assert!((result.per_second - 20.0).abs() < 1e-9);

        let empty = BenchmarkResult::new("y".into(), 0, Duration::ZERO, String::new());
        assert_eq!(empty.avg_ms, 0.0);
        assert_eq!(empty.per_second, 0.0);
    }

    #[test]
    fn test_positions() {
        let mut rng = create_rng(Some(12));
        let board = safe_position(&mut rng, 10);
        assert_eq!(board.number_of_edges(), 48);
        assert_eq!(board.player1_score() + board.player2_score(), 0);

        let endgame = endgame_position(&mut rng);
        assert!(endgame.is_end_game());
        assert!(endgame.unclaimed_edges_that_do_not_create_a_box().is_empty());
    }

    #[test]
    fn test_rollout_benchmark_counts() {
        let mut rng = create_rng(Some(0));
        let result = benchmark_rollouts(RolloutPolicy::Greedy, 50, &mut rng);
        assert_eq!(result.samples, 50);
        assert!(result.notes.starts_with("Avg player 1 boxes"));
    }
}

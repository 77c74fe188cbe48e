//! DOTBOX CLI - Command-line interface
//!
//! Commands:
//! - solve: Answer one move request
//! - serve: Answer move requests line by line on stdin/stdout
//! - play: Play a match between two agents
//! - bench: Time the search agents

mod benchmark;
mod config;
mod match_cmd;
mod server;
mod solve;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::AgentConfig;

#[derive(Parser)]
#[command(name = "dotbox")]
#[command(about = "Dots and Boxes engine and move advisor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Seed for every random choice (entropy when unset)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// JSON file with agent settings
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one move request read from a file or stdin
    Solve(solve::SolveArgs),
    /// Answer move requests, one JSON object per line
    Serve,
    /// Play a match between two agents
    Play(match_cmd::MatchArgs),
    /// Time the search agents
    Bench(benchmark::BenchmarkArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::default(),
    };

    match cli.command {
        Commands::Solve(args) => solve::run(args, &config, cli.seed),
        Commands::Serve => server::run(&config, cli.seed),
        Commands::Play(args) => match_cmd::run(args, &config, cli.seed),
        Commands::Bench(args) => benchmark::run(args, cli.seed),
    }
}

/// Logs go to stderr so stdout carries only responses and reports
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

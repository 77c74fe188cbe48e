//! Serve command - move advice over stdin/stdout
//!
//! The front end reads one JSON request per line and hands it to a worker
//! thread that owns the engine. Requests that arrive while the worker is
//! busy collapse into a single pending slot: only the newest is answered.
//! Each answer is written to stdout as one JSON line.
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: read_requests(), worker()
//! - Level 3: handle_line(), newest()

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::{anyhow, Context, Result};
use rand::Rng;
use serde::Serialize;

use dotbox_core::{AdvisorSettings, MoveRequest, MoveResponse};

use crate::config::{create_rng, AgentConfig};
use crate::solve::answer;

/// Reply for a request that could not be answered
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run serve command until stdin closes
///
/// 1. Start the worker
/// 2. Forward request lines to it
/// 3. Wait for the last answer
pub fn run(config: &AgentConfig, seed: Option<u64>) -> Result<()> {
    let (sender, receiver) = mpsc::channel();
    let settings = config.advisor.clone();

    tracing::info!("Serving move requests on stdin (threshold {})", settings.threshold);

    let handle = thread::spawn(move || {
        let mut rng = create_rng(seed);
        worker(receiver, &settings, &mut rng, &mut io::stdout().lock())
    });

    read_requests(io::stdin().lock(), &sender)?;
    drop(sender);

    handle.join().map_err(|_| anyhow!("worker thread panicked"))?
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Forward every non-blank line to the worker
fn read_requests<B: BufRead>(input: B, sender: &Sender<String>) -> Result<()> {
    for line in input.lines() {
        let line = line.context("Failed to read request line")?;
        if line.trim().is_empty() {
            continue;
        }
        if sender.send(line).is_err() {
            break;
        }
    }
    Ok(())
}

/// Answer requests until the channel closes, skipping superseded ones
fn worker<R: Rng + ?Sized, W: Write>(
    receiver: Receiver<String>,
    settings: &AdvisorSettings,
    rng: &mut R,
    out: &mut W,
) -> Result<()> {
    while let Ok(first) = receiver.recv() {
        let line = newest(first, &receiver);
        let reply = handle_line(&line, settings, rng);
        writeln!(out, "{}", reply).context("Failed to write response")?;
        out.flush()?;
    }
    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// The most recent of `first` and anything already queued behind it
fn newest<T>(first: T, receiver: &Receiver<T>) -> T {
    let mut latest = first;
    let mut dropped = 0;
    while let Ok(next) = receiver.try_recv() {
        latest = next;
        dropped += 1;
    }
    if dropped > 0 {
        tracing::debug!("dropped {} superseded requests", dropped);
    }
    latest
}

/// Answer one request line with a response or error line
fn handle_line<R: Rng + ?Sized>(line: &str, settings: &AdvisorSettings, rng: &mut R) -> String {
    let reply = serde_json::from_str::<MoveRequest>(line)
        .context("Failed to parse move request")
        .and_then(|request| answer(request, settings, rng));

    let encoded = match reply {
        Ok(response) => serde_json::to_string::<MoveResponse>(&response),
        Err(err) => {
            tracing::warn!("request failed: {:#}", err);
            serde_json::to_string(&ErrorResponse {
                error: format!("{:#}", err),
            })
        }
    };
    encoded.unwrap_or_else(|err| format!(r#"{{"error":"{}"}}"#, err))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_newest_skips_queued_requests() {
        let (sender, receiver) = mpsc::channel();
        sender.send(2).unwrap();
        sender.send(3).unwrap();
        assert_eq!(newest(1, &receiver), 3);
        assert_eq!(newest(4, &receiver), 4);
    }

    #[test]
    fn test_handle_line_answers_request() {
        let mut rng = create_rng(Some(3));
        let reply = handle_line(
            r#"{"game":{"moves":[]},"currentPlayer":1}"#,
            &AdvisorSettings::default(),
            &mut rng,
        );
        let response: MoveResponse = serde_json::from_str(&reply).unwrap();
        assert_eq!(response.edges.len(), 1);
    }

    #[test]
    fn test_handle_line_reports_errors() {
        let mut rng = create_rng(Some(3));
        let reply = handle_line("not json", &AdvisorSettings::default(), &mut rng);
        assert!(reply.starts_with(r#"{"error":"Failed to parse move request"#));
    }

    #[test]
    fn test_worker_answers_each_batch() {
        let (sender, receiver) = mpsc::channel();
        let input = "{\"game\":{\"moves\":[]},\"currentPlayer\":1}\n\n";
        read_requests(Cursor::new(input), &sender).unwrap();
        drop(sender);

        let mut out = Vec::new();
        let mut rng = create_rng(Some(0));
        worker(receiver, &AdvisorSettings::default(), &mut rng, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with(r#"{"move":["#));
    }
}

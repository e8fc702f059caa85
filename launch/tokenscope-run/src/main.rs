// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! tokenscope-run: simulated load generation and event-log analysis.
//!
//! Logging goes to stderr (controlled by `RUST_LOG`); stdout carries only
//! the machine-readable output of each command.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tokenscope_analytics::{LatencyField, extract, prefill_throughput, read_records, summarize};

mod simulate;
use simulate::SimulateArgs;

#[derive(Parser)]
#[command(name = "tokenscope-run", version, about = "Token-generation instrumentation toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive simulated load through the instrumentation stack.
    Simulate(SimulateArgs),
    /// Reconstruct per-second prefill throughput from an event log.
    Throughput(AnalyzeArgs),
    /// Summarize latency percentiles from an event log.
    Latency(LatencyArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Event log to analyze.
    #[arg(long, default_value = "events.jsonl", env = "TOKENSCOPE_LOG")]
    log: PathBuf,

    /// Emit JSON lines instead of a table.
    #[arg(long, env = "TOKENSCOPE_JSON")]
    json: bool,
}

#[derive(Args, Debug)]
struct LatencyArgs {
    #[command(flatten)]
    analyze: AnalyzeArgs,

    /// Field to summarize (event-log name), or "all".
    #[arg(long, default_value = "all", env = "TOKENSCOPE_FIELD")]
    field: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Simulate(args) => simulate::run(args).await,
        Command::Throughput(args) => run_throughput(args),
        Command::Latency(args) => run_latency(args),
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run_throughput(args: AnalyzeArgs) -> anyhow::Result<()> {
    let records = read_records(&args.log)
        .with_context(|| format!("reading {}", args.log.display()))?;
    let samples = prefill_throughput(&records);

    if args.json {
        for sample in &samples {
            println!("{}", serde_json::to_string(sample)?);
        }
    } else {
        println!("{:<12} {:>14}", "second", "prefill tok/s");
        for sample in &samples {
            println!("{:<12} {:>14.2}", sample.second, sample.tokens);
        }
    }

    let total: f64 = samples.iter().map(|s| s.tokens).sum();
    tracing::info!(
        "attributed {total:.0} prompt tokens over {} seconds from {} records",
        samples.len(),
        records.len()
    );
    Ok(())
}

fn run_latency(args: LatencyArgs) -> anyhow::Result<()> {
    let records = read_records(&args.analyze.log)
        .with_context(|| format!("reading {}", args.analyze.log.display()))?;

    let all = args.field == "all";
    let fields = if all {
        LatencyField::all()
    } else {
        vec![LatencyField::parse(&args.field)?]
    };

    for field in fields {
        let values = extract(&records, field);
        let summary = match summarize(&values) {
            Ok(summary) => summary,
            // With --field all, a log of pure failures has no TTFTs to
            // summarize; report and keep going. An explicitly requested
            // field with nothing to summarize is an error.
            Err(e) if all => {
                tracing::warn!("{field}: {e}");
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("summarizing {field}")),
        };
        if args.analyze.json {
            println!(
                "{}",
                serde_json::json!({ "field": field.to_string(), "summary": summary })
            );
        } else {
            println!(
                "{field}: count={} mean={:.4}s p50={:.4}s p90={:.4}s p99={:.4}s min={:.4}s max={:.4}s",
                summary.count,
                summary.mean,
                summary.p50,
                summary.p90,
                summary.p99,
                summary.min,
                summary.max
            );
        }
    }
    Ok(())
}

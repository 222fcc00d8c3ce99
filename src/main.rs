//! Request Scorer CLI
//!
//! Replays a JSON-lines request log through a `RequestScorer`, printing each
//! request's score breakdown. Useful for tuning weights against real traffic.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use request_scorer::{RequestHistograms, RequestRecord, RequestScorer, ScopeKey, ScorerConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "request-scorer")]
#[command(about = "Score completed requests for detailed trace retention", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "REQUEST_SCORER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a JSON-lines request log
    Score {
        /// Input file (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Mark requests scoring at or above this value as stored
        #[arg(long)]
        store_above: Option<f64>,
    },

    /// Print the effective configuration
    Config,
}

/// One line of `score` output
#[derive(Debug, Serialize)]
struct ScoredLine {
    scope: String,
    duration: f64,
    speed: f64,
    percentile: f64,
    age: f64,
    score: f64,
    stored: bool,
}

#[derive(Debug, Default)]
struct ReplaySummary {
    scored: usize,
    stored: usize,
    skipped: usize,
}

async fn replay<R>(
    reader: R,
    config: &ScorerConfig,
    store_above: Option<f64>,
) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let histograms = Arc::new(RequestHistograms::new(config.histogram_bins));
    let scorer = RequestScorer::from_config(histograms.clone(), config)?;
    let mut summary = ReplaySummary::default();

    let mut lines = reader.lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let record: RequestRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping line {}: {}", line_no, e);
                summary.skipped += 1;
                continue;
            }
        };

        // Deserialization bypasses `RequestRecord::new`, so check the duration again
        let record = match RequestRecord::new(record.scope, record.duration) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping line {}: {}", line_no, e);
                summary.skipped += 1;
                continue;
            }
        };

        let key = record.key();
        if let ScopeKey::Named(name) = &key {
            histograms.add(name, record.duration);
        }

        let breakdown = scorer.score_breakdown(&record);
        let stored = store_above.is_some_and(|threshold| breakdown.total >= threshold);
        if stored {
            scorer.stored(&record);
            summary.stored += 1;
        }
        summary.scored += 1;

        let out = ScoredLine {
            scope: key.to_string(),
            duration: record.duration,
            speed: breakdown.speed,
            percentile: breakdown.percentile,
            age: breakdown.age,
            score: breakdown.total,
            stored,
        };
        println!("{}", serde_json::to_string(&out)?);
    }

    debug!("Replay finished with {} tracked scopes", scorer.tracked_keys());
    Ok(summary)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::new(format!(
        "request_scorer={}",
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // stdout carries scored lines
        .init();

    debug!("request-scorer v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = ScorerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Score { input, store_above } => {
            let summary = match input {
                Some(path) => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .with_context(|| format!("Failed to open {}", path.display()))?;
                    replay(BufReader::new(file), &config, store_above).await?
                }
                None => replay(BufReader::new(tokio::io::stdin()), &config, store_above).await?,
            };

            info!(
                "Scored {} requests ({} stored, {} skipped)",
                summary.scored, summary.stored, summary.skipped
            );
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

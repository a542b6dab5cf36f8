//! Ideaflow - research idea analysis pipeline CLI
//!
//! The `ideaflow` command runs one seed idea through the ten-role analysis
//! sequence and writes JSON, Markdown, and HTML reports.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, Level};

use ideaflow_core::{
    ChatCompletionClient, ConsoleSink, ConversationDriver, DisplaySink, PipelineConfig,
    ReportWriter, RoundRobinRouter, SequenceRouter, TurnRouter,
};

const DEFAULT_IDEA: &str = "Develop an AI system to detect wildfires early using drones";

#[derive(Parser)]
#[command(name = "ideaflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-role research idea analysis pipeline", long_about = None)]
struct Cli {
    /// Research idea to analyze; prompted interactively when omitted
    idea: Option<String>,

    /// Turn-routing strategy
    #[arg(long, value_enum, default_value_t = Strategy::Sequence)]
    strategy: Strategy,

    /// Directory for report files
    #[arg(long, env = "IDEAFLOW_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Model identifier override
    #[arg(long, env = "IDEAFLOW_MODEL")]
    model: Option<String>,

    /// Accepted-message ceiling override
    #[arg(long)]
    max_messages: Option<usize>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    /// Fixed hand-off chain ending after the terminal role
    Sequence,
    /// Positional rotation bounded only by the ceilings
    RoundRobin,
}

fn resolve_idea(arg: Option<String>) -> Result<String> {
    if let Some(idea) = arg {
        return Ok(idea);
    }
    print!("Enter your research idea (press Enter for the default): ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read idea from stdin")?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Ok(DEFAULT_IDEA.to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    ideaflow_core::init_tracing(cli.json, level);

    let mut config = PipelineConfig::from_env().context(
        "configuration failed; set GOOGLE_API_KEY before running",
    )?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(out_dir) = cli.out_dir {
        config.out_dir = out_dir;
    }
    if let Some(ceiling) = cli.max_messages {
        config.driver.message_ceiling = ceiling;
        if config.driver.safety_ceiling < ceiling + 3 {
            config.driver.safety_ceiling = ceiling + 3;
        }
    }

    let idea = resolve_idea(cli.idea)?;

    let client = Arc::new(ChatCompletionClient::new(&config)?);
    let router: Box<dyn TurnRouter> = match cli.strategy {
        Strategy::Sequence => Box::new(SequenceRouter),
        Strategy::RoundRobin => Box::new(RoundRobinRouter),
    };
    let sink = Arc::new(ConsoleSink::new());

    // Ctrl-C finalizes the current run instead of killing the process.
    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let driver = ConversationDriver::new(client, router, Arc::clone(&sink) as Arc<dyn DisplaySink>, config.driver)
        .with_cancellation(cancel_rx);
    let state = driver.run(&idea).await;

    sink.summary(&state.transcript);

    let saved = ReportWriter::new(&config.out_dir)
        .save(&state)
        .with_context(|| format!("failed to write reports to {}", config.out_dir.display()))?;
    sink.reports_saved(&saved);
    info!(
        steps = state.transcript.len(),
        termination = %state.termination,
        "run complete"
    );

    Ok(())
}

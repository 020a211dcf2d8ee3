//! Command-line interface for rostrum.
//!
//! Provides commands for assembling debate documents, merging classifier
//! output back into them, aggregating statistics, running the whole
//! pipeline, and inspecting past runs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::fs;
use uuid::Uuid;

use crate::adapters::FileTagProvider;
use crate::config::{self, ResolvedConfig};
use crate::core::{classifier_request, merge_into_document, MergeKind, Orchestrator, RunLog};
use crate::domain::{DebateStatus, Document, RunState, RunSummary};

/// rostrum - Debate annotation merge-and-aggregate engine
#[derive(Parser, Debug)]
#[command(name = "rostrum")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble debate documents from their sources
    Assemble {
        /// Debate dates (all catalogue debates if omitted)
        dates: Vec<String>,
    },

    /// Merge emotion tags into a stored document
    MergeEmotions {
        /// Debate date
        date: String,

        /// Classifier response file (defaults to the configured emotions source)
        #[arg(short, long)]
        response: Option<PathBuf>,
    },

    /// Merge fallacies into a stored document
    MergeFallacies {
        /// Debate date
        date: String,

        /// Response file (defaults to the configured fallacies source)
        #[arg(short, long)]
        response: Option<PathBuf>,
    },

    /// Print the reduced document sent to the emotion classifier
    ClassifierRequest {
        /// Debate date
        date: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Aggregate stored documents into metrics
    Aggregate {
        /// Documents directory (defaults to the configured output)
        #[arg(short, long)]
        documents: Option<PathBuf>,
    },

    /// Run the whole pipeline: assemble, merge, aggregate
    Run {
        /// Debate dates (all catalogue debates if omitted)
        dates: Vec<String>,

        /// Directory of pre-computed classifier responses ({date}.txt)
        #[arg(long, env = "ROSTRUM_RESPONSES")]
        responses: Option<PathBuf>,
    },

    /// Check the status of a run
    Status {
        /// Run ID (UUID)
        run_id: String,
    },

    /// List recent runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::config()?.clone();

        match self.command {
            Commands::Assemble { dates } => assemble_debates(cfg, &dates).await,
            Commands::MergeEmotions { date, response } => {
                let response = response.unwrap_or_else(|| cfg.source_paths(&date).emotions);
                merge_response(&cfg, &date, response, MergeKind::Emotions).await
            }
            Commands::MergeFallacies { date, response } => {
                let response = response.unwrap_or_else(|| cfg.source_paths(&date).fallacies);
                merge_response(&cfg, &date, response, MergeKind::Fallacies).await
            }
            Commands::ClassifierRequest { date, output } => write_request(&cfg, &date, output).await,
            Commands::Aggregate { documents } => aggregate_documents(cfg, documents).await,
            Commands::Run { dates, responses } => run_pipeline(cfg, &dates, responses).await,
            Commands::Status { run_id } => show_status(&cfg, &run_id).await,
            Commands::Runs { limit } => list_runs(&cfg, limit).await,
            Commands::Config => show_config(&cfg),
        }
    }
}

/// Assemble and store documents without merging or aggregating
async fn assemble_debates(cfg: ResolvedConfig, dates: &[String]) -> Result<()> {
    let orchestrator = Orchestrator::new(cfg);

    for date in orchestrator.debate_dates(dates) {
        match orchestrator.assemble_debate(&date).await {
            Ok((doc, report)) => {
                let path = orchestrator.config().document_path(&date);
                doc.save(&path).await?;
                println!(
                    "{}: {} interventions ({} unassigned, {} unparseable) -> {}",
                    date,
                    report.placed,
                    report.unassigned,
                    report.unparseable,
                    path.display()
                );
            }
            Err(e) => eprintln!("{}: skipped ({})", date, e),
        }
    }

    Ok(())
}

async fn merge_response(cfg: &ResolvedConfig, date: &str, response: PathBuf, kind: MergeKind) -> Result<()> {
    let text = fs::read_to_string(&response)
        .await
        .with_context(|| format!("Failed to read response: {}", response.display()))?;

    let path = cfg.document_path(date);
    let outcome = merge_into_document(&path, &text, kind).await?;

    println!(
        "{}: {} applied, {} unchanged, {} unmatched, {} malformed{}",
        date,
        outcome.report.applied,
        outcome.report.unchanged,
        outcome.report.unmatched,
        outcome.report.malformed,
        if outcome.changed { "" } else { " (document unchanged)" }
    );

    Ok(())
}

async fn write_request(cfg: &ResolvedConfig, date: &str, output: Option<PathBuf>) -> Result<()> {
    let doc = Document::load(&cfg.document_path(date)).await?;
    let request = classifier_request(&doc);

    match output {
        Some(path) => fs::write(&path, request)
            .await
            .with_context(|| format!("Failed to write request: {}", path.display()))?,
        None => println!("{}", request),
    }

    Ok(())
}

async fn aggregate_documents(cfg: ResolvedConfig, documents: Option<PathBuf>) -> Result<()> {
    let dir = documents.unwrap_or_else(|| cfg.documents_dir());
    let metrics_dir = cfg.metrics_dir();
    let orchestrator = Orchestrator::new(cfg);

    let metrics = orchestrator.aggregate_stored(&dir).await?;
    metrics.save(&metrics_dir).await?;

    println!(
        "{} debates, {} interventions, {} speakers, {} parties -> {}",
        metrics.totals.debates,
        metrics.totals.interventions,
        metrics.speakers.len(),
        metrics.parties.len(),
        metrics_dir.display()
    );

    Ok(())
}

async fn run_pipeline(cfg: ResolvedConfig, dates: &[String], responses: Option<PathBuf>) -> Result<()> {
    let mut orchestrator = Orchestrator::new(cfg);
    if let Some(dir) = responses {
        orchestrator = orchestrator.with_provider(Box::new(FileTagProvider::new(dir)));
    }

    let outcome = orchestrator.run(dates).await?;

    println!("Run ID: {}", outcome.run_id);
    println!(
        "Debates: {} aggregated, {} skipped",
        outcome.metrics.totals.debates,
        outcome.skipped.len()
    );
    for (date, reason) in &outcome.skipped {
        println!("  {}: {}", date, reason);
    }
    println!("Interventions: {}", outcome.metrics.totals.interventions);
    println!("Metrics: {}", orchestrator.config().metrics_dir().display());

    Ok(())
}

/// Load the summary of one run
async fn load_summary(cfg: &ResolvedConfig, run_id: Uuid) -> Result<RunSummary> {
    let log = RunLog::open_in(&cfg.runs_dir(), run_id).await?;
    log.summary()
        .await?
        .with_context(|| format!("No events found for run {}", run_id))
}

async fn show_status(cfg: &ResolvedConfig, run_id_str: &str) -> Result<()> {
    let run_id = Uuid::parse_str(run_id_str)
        .with_context(|| format!("Invalid run ID: {}", run_id_str))?;

    let run = load_summary(cfg, run_id).await?;

    println!("Run ID: {}", run.id);
    println!("State: {}", state_label(&run.state));
    if let RunState::Failed { ref error } = run.state {
        println!("Error: {}", error);
    }
    println!("Started: {}", run.started_at);
    if let Some(completed) = run.completed_at {
        println!("Completed: {}", completed);
    }
    println!("\nDebates:");
    for (debate, status) in &run.debates {
        match run.skipped.get(debate) {
            Some(reason) => println!("  {}: {:?} ({})", debate, status, reason),
            None => println!("  {}: {:?}", debate, status),
        }
    }

    Ok(())
}

async fn list_runs(cfg: &ResolvedConfig, limit: usize) -> Result<()> {
    let mut runs = Vec::new();
    for run_id in RunLog::list_runs_in(&cfg.runs_dir()).await? {
        if let Ok(summary) = load_summary(cfg, run_id).await {
            runs.push(summary);
        }
    }

    if runs.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));

    println!("{:<38} {:<12} {:>10} {:>8}", "RUN ID", "STATE", "AGGREGATED", "SKIPPED");
    println!("{}", "-".repeat(71));

    for run in runs.into_iter().take(limit) {
        println!(
            "{:<38} {:<12} {:>10} {:>8}",
            run.id,
            state_label(&run.state),
            run.count(DebateStatus::Aggregated),
            run.count(DebateStatus::Skipped)
        );
    }

    Ok(())
}

fn state_label(state: &RunState) -> &'static str {
    match state {
        RunState::Running => "running",
        RunState::Completed => "completed",
        RunState::Failed { .. } => "failed",
    }
}

fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("rostrum configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home (engine state): {}", cfg.home.display());
    println!("  Runs:                {}", cfg.runs_dir().display());
    println!("  Corpus:              {}", cfg.data.display());
    println!("  Documents:           {}", cfg.documents_dir().display());
    println!("  Metrics:             {}", cfg.metrics_dir().display());
    println!();
    println!("Source templates:");
    println!("  segments:  {}", cfg.sources.segments);
    println!("  speakers:  {}", cfg.sources.speakers);
    println!("  blocks:    {}", cfg.sources.blocks);
    println!("  topics:    {}", cfg.sources.topics);
    println!("  mentions:  {}", cfg.sources.mentions);
    println!("  proposals: {}", cfg.sources.proposals);
    println!("  claims:    {}", cfg.sources.claims);
    println!("  emotions:  {}", cfg.sources.emotions);
    println!("  fallacies: {}", cfg.sources.fallacies);
    println!();
    println!("Processing:");
    println!("  Moderators:         {}", cfg.moderators.join(", "));
    println!("  Sentence delimiter: {:?}", cfg.sentence_delimiter);
    println!();
    println!("Debates ({}):", cfg.debates.len());
    for (date, meta) in &cfg.debates {
        println!("  {}  election {}  {}", date, meta.election_date, meta.media);
    }

    Ok(())
}

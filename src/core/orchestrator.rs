//! Run driver.
//!
//! A run walks the requested debates in ascending date order: load the
//! sources, assemble and store the document, merge back the optional
//! classifier output, and fold the document into the run's aggregation
//! engine. Debates whose sources are missing are skipped and logged; the
//! run carries on with the rest.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::TagProvider;
use crate::config::ResolvedConfig;
use crate::domain::{Document, Event, EventType, ScopedMetrics};

use super::aggregate::AggregationEngine;
use super::assembler::{assemble, AssemblyReport};
use super::merge_back::{classifier_request, merge_emotions, merge_fallacies, MergeReport};
use super::run_log::RunLog;
use super::sources::{load_debate_sources, read_optional, SourceError};

/// Which kind of classifier output a merge applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    Emotions,
    Fallacies,
}

impl MergeKind {
    pub fn apply(&self, doc: &mut Document, response: &str) -> MergeReport {
        match self {
            MergeKind::Emotions => merge_emotions(doc, response),
            MergeKind::Fallacies => merge_fallacies(doc, response),
        }
    }

    fn event_type(&self) -> EventType {
        match self {
            MergeKind::Emotions => EventType::EmotionsMerged,
            MergeKind::Fallacies => EventType::FallaciesMerged,
        }
    }
}

/// Result of merging a response into a stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub report: MergeReport,
    /// Whether the stored document changed
    pub changed: bool,
}

/// Result of one pipeline run
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub metrics: ScopedMetrics,
    /// Documents written, in processing order
    pub documents: Vec<PathBuf>,
    /// (debate, reason) for every skipped debate
    pub skipped: Vec<(String, String)>,
}

/// Main run driver
pub struct Orchestrator {
    config: ResolvedConfig,
    provider: Option<Box<dyn TagProvider>>,
}

impl Orchestrator {
    pub fn new(config: ResolvedConfig) -> Self {
        Self {
            config,
            provider: None,
        }
    }

    /// Classify emotions through `provider` instead of reading response files
    pub fn with_provider(mut self, provider: Box<dyn TagProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Requested dates, or the whole catalogue, sorted and deduplicated
    pub fn debate_dates(&self, requested: &[String]) -> Vec<String> {
        let mut dates: Vec<String> = if requested.is_empty() {
            self.config.debates.keys().cloned().collect()
        } else {
            requested.to_vec()
        };
        dates.sort();
        dates.dedup();
        dates
    }

    /// Load the sources of one debate and assemble its document
    #[instrument(skip(self))]
    pub async fn assemble_debate(&self, date: &str) -> Result<(Document, AssemblyReport), SourceError> {
        let (election_date, media) = match self.config.debate_meta(date) {
            Some(meta) => (meta.election_date.as_str(), meta.media.as_str()),
            None => {
                warn!("Debate not in catalogue, metadata left empty");
                ("", "")
            }
        };

        let paths = self.config.source_paths(date);
        let sources = load_debate_sources(&paths, date, election_date, media).await?;
        Ok(assemble(&sources, &self.config.splitter()))
    }

    /// Emotion response for a document: from the provider when one is set,
    /// else from the optional response file
    async fn emotion_response(&self, doc: &Document) -> Result<Option<String>> {
        match self.provider {
            Some(ref provider) => {
                let request = classifier_request(doc);
                debug!(provider = provider.name(), "Requesting emotion tags");
                provider.classify(doc.debate_id(), &request).await.map(Some)
            }
            None => {
                let path = self.config.source_paths(doc.debate_id()).emotions;
                Ok(read_optional(&path).await?)
            }
        }
    }

    /// Run the whole pipeline over `dates` (the catalogue when empty)
    #[instrument(skip(self, dates))]
    pub async fn run(&self, dates: &[String]) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let log = RunLog::open_in(&self.config.runs_dir(), run_id).await?;
        let dates = self.debate_dates(dates);

        info!(%run_id, debates = dates.len(), "Starting run");
        log.append(&Event::new(
            run_id,
            None,
            EventType::RunStarted,
            format!("{} debates requested", dates.len()),
        ))
        .await?;

        match self.process(&log, &dates).await {
            Ok(outcome) => {
                log.append(&Event::new(
                    run_id,
                    None,
                    EventType::RunCompleted,
                    format!(
                        "{} debates aggregated, {} skipped",
                        outcome.metrics.totals.debates,
                        outcome.skipped.len()
                    ),
                ))
                .await?;
                info!(%run_id, skipped = outcome.skipped.len(), "Run completed");
                Ok(outcome)
            }
            Err(e) => {
                log.append(
                    &Event::new(run_id, None, EventType::RunFailed, "Run failed".to_string())
                        .with_error(format!("{:#}", e)),
                )
                .await?;
                Err(e)
            }
        }
    }

    async fn process(&self, log: &RunLog, dates: &[String]) -> Result<RunOutcome> {
        let run_id = log.run_id();
        let mut engine = AggregationEngine::new(self.config.aggregation_settings());
        let mut documents = Vec::new();
        let mut skipped = Vec::new();

        for date in dates {
            let started = Instant::now();

            let (mut doc, report) = match self.assemble_debate(date).await {
                Ok(assembled) => assembled,
                Err(e) => {
                    warn!(debate = %date, error = %e, "Skipping debate");
                    log.append(
                        &Event::new(run_id, Some(date.clone()), EventType::DebateSkipped, "Skipped".to_string())
                            .with_error(e.to_string()),
                    )
                    .await?;
                    skipped.push((date.clone(), e.to_string()));
                    continue;
                }
            };

            let path = self.config.document_path(date);
            doc.save(&path).await?;
            log.append(
                &Event::new(
                    run_id,
                    Some(date.clone()),
                    EventType::DebateAssembled,
                    format!(
                        "{} interventions, {} turns unassigned",
                        report.placed, report.unassigned
                    ),
                )
                .with_duration(started.elapsed().as_millis() as u64),
            )
            .await?;

            let before = doc.digest()?;
            let fallacies_path = self.config.source_paths(date).fallacies;
            let responses = [
                (MergeKind::Emotions, self.emotion_response(&doc).await),
                (
                    MergeKind::Fallacies,
                    read_optional(&fallacies_path).await.map_err(anyhow::Error::from),
                ),
            ];

            // A response that cannot be obtained costs the debate that merge only
            for (kind, response) in responses {
                match response {
                    Ok(Some(response)) => {
                        let merged = kind.apply(&mut doc, &response);
                        log.append(&merge_event(run_id, date, kind, &merged)).await?;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let error = format!("{:#}", e);
                        warn!(debate = %date, merge = ?kind, %error, "Response unavailable, merge skipped");
                        log.append(
                            &Event::new(run_id, Some(date.clone()), kind.event_type(), "Merge skipped".to_string())
                                .with_error(error),
                        )
                        .await?;
                    }
                }
            }
            if doc.digest()? != before {
                doc.save(&path).await?;
            }

            engine.fold(&doc);
            log.append(
                &Event::new(
                    run_id,
                    Some(date.clone()),
                    EventType::DebateAggregated,
                    format!("{} interventions folded", doc.intervention_count()),
                )
                .with_duration(started.elapsed().as_millis() as u64),
            )
            .await?;

            documents.push(path);
        }

        let metrics = engine.finish();
        metrics.save(&self.config.metrics_dir()).await?;

        Ok(RunOutcome {
            run_id,
            metrics,
            documents,
            skipped,
        })
    }

    /// Aggregate the documents already stored in `dir`, in file name order
    #[instrument(skip(self))]
    pub async fn aggregate_stored(&self, dir: &Path) -> Result<ScopedMetrics> {
        let paths = stored_documents(dir)?;
        if paths.is_empty() {
            warn!(dir = %dir.display(), "No stored documents found");
        }

        let mut engine = AggregationEngine::new(self.config.aggregation_settings());
        let mut folded = 0usize;
        for path in &paths {
            match Document::load(path).await {
                Ok(doc) => {
                    engine.fold(&doc);
                    folded += 1;
                }
                Err(e) => {
                    let error = format!("{:#}", e);
                    warn!(path = %path.display(), %error, "Unreadable document skipped");
                }
            }
        }

        info!(documents = folded, skipped = paths.len() - folded, "Stored documents aggregated");
        Ok(engine.finish())
    }
}

fn merge_event(run_id: Uuid, date: &str, kind: MergeKind, report: &MergeReport) -> Event {
    Event::new(
        run_id,
        Some(date.to_string()),
        kind.event_type(),
        format!(
            "{} applied, {} unchanged, {} unmatched, {} malformed",
            report.applied, report.unchanged, report.unmatched, report.malformed
        ),
    )
}

/// `debate-*.json` files in `dir`, sorted by path
pub fn stored_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("debate-*.json");
    let pattern = pattern
        .to_str()
        .with_context(|| format!("Non UTF-8 documents directory: {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in glob::glob(pattern).context("Invalid documents pattern")? {
        paths.push(entry.context("Failed to read documents directory")?);
    }
    paths.sort();
    Ok(paths)
}

/// Merge a classifier response into a stored document, saving it only when
/// the merge changed something
pub async fn merge_into_document(path: &Path, response: &str, kind: MergeKind) -> Result<MergeOutcome> {
    let mut doc = Document::load(path).await?;
    let before = doc.digest()?;

    let report = kind.apply(&mut doc, response);
    let changed = doc.digest()? != before;
    if changed {
        doc.save(path).await?;
    }

    Ok(MergeOutcome { report, changed })
}

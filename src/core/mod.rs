//! Merge-and-aggregate engine.
//!
//! This module contains:
//! - temporal: interval and exact-instant assignment
//! - sentences / assembler: building the canonical document
//! - merge_back: joining classifier output into a document
//! - aggregate: per-debate, per-speaker and per-party statistics
//! - sources / run_log / orchestrator: loading, logging and the run driver

pub mod aggregate;
pub mod assembler;
pub mod merge_back;
pub mod orchestrator;
pub mod run_log;
pub mod sentences;
pub mod sources;
pub mod temporal;

// Re-export commonly used types
pub use aggregate::{aggregate, AggregationEngine, AggregationSettings, NO_PARTY, UNKNOWN_SPEAKER};
pub use assembler::{assemble, AssemblyReport, DebateSources, SpeakerRow, TurnRow};
pub use merge_back::{classifier_request, merge_emotions, merge_fallacies, MergeReport};
pub use orchestrator::{merge_into_document, stored_documents, MergeKind, MergeOutcome, Orchestrator, RunOutcome};
pub use run_log::RunLog;
pub use sentences::SentenceSplitter;
pub use sources::{load_debate_sources, SourceError, SourcePaths};
pub use temporal::{assign_interval, assign_interval_index, lookup_exact};

//! rostrum - Debate annotation merge-and-aggregate engine
//!
//! Merges independently produced, time-stamped annotation streams about a
//! political debate (turns, thematic blocks, topics, entity mentions,
//! proposals, fact-check claims, and later classifier emotion tags) into one
//! canonical document per debate, then rolls the documents up into
//! per-debate, per-speaker and per-party statistics.
//!
//! # Modules
//!
//! - `annotations`: markup and fragment parsing
//! - `core`: temporal assignment, assembly, merge-back, aggregation, run driver
//! - `domain`: data structures (Document, Accumulator, Event, RunSummary)
//! - `adapters`: the external classifier seam
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Assemble, merge and aggregate every catalogued debate
//! rostrum run
//!
//! # Merge classifier output into one stored document
//! rostrum merge-emotions 2019-04-22 --response emotions.txt
//!
//! # Check run status
//! rostrum status <run-id>
//! ```

pub mod adapters;
pub mod annotations;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use core::{AggregationEngine, Orchestrator};
pub use domain::{Document, Event, EventType, RunState, RunSummary, ScopedMetrics, Timestamp};

//! Domain types.
//!
//! This module contains the core data structures:
//! - Timecode: normalized timeline instants
//! - Document: the canonical debate tree
//! - Metrics: scoped accumulators produced by aggregation
//! - Events / Run: the run log and its replayed summary

pub mod document;
pub mod events;
pub mod metrics;
pub mod run;
pub mod timecode;

// Re-export commonly used types
pub use document::{
    Block, Claim, Document, Fallacy, Intervention, LinguisticStats, Mention, Participant,
    Proposal, Sentence,
};
pub use events::{Event, EventType};
pub use metrics::{
    Accumulator, BlockInfo, DebateInfo, EmotionCounts, GlobalTotals, LinguisticTotals,
    ScopedMetrics, StatTotal, TextOrigin, TopicTally,
};
pub use run::{DebateStatus, RunState, RunSummary};
pub use timecode::{parse_timecode, TimecodeError, Timestamp};

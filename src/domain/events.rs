//! Run log events.
//!
//! Every pipeline run appends what happened to each debate as an immutable
//! event. The summary of a run can be rebuilt by replaying them in order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single event in the append-only run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event
    pub id: Uuid,

    /// When this event occurred (ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// The run this event belongs to
    pub run_id: Uuid,

    /// Debate the event is about (if applicable)
    pub debate_id: Option<String>,

    /// Type of event
    pub event_type: EventType,

    /// Human-readable summary
    pub payload_summary: String,

    /// Time taken in milliseconds
    pub duration_ms: Option<u64>,

    /// Error or skip reason
    pub error: Option<String>,
}

impl Event {
    /// Create a new event with the current timestamp
    pub fn new(
        run_id: Uuid,
        debate_id: Option<String>,
        event_type: EventType,
        payload_summary: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            run_id,
            debate_id,
            event_type,
            payload_summary,
            duration_ms: None,
            error: None,
        }
    }

    /// Create an event with duration information
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Create an event with error information
    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// Types of events that can occur during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RunStarted,

    /// A debate document was assembled and stored
    DebateAssembled,

    /// A debate was skipped (missing or empty source)
    DebateSkipped,

    /// Emotion tags were merged into a document
    EmotionsMerged,

    /// Fallacies were merged into a document
    FallaciesMerged,

    /// A document was folded into the accumulators
    DebateAggregated,

    /// Aggregate views were written
    RunCompleted,

    RunFailed,
}

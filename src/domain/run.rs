//! Run state reconstructed from the run log.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{Event, EventType};

/// Summary of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: Uuid,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Latest status of every debate the run touched
    pub debates: BTreeMap<String, DebateStatus>,
    /// Skip reasons, by debate
    pub skipped: BTreeMap<String, String>,
}

impl RunSummary {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            state: RunState::Running,
            started_at: Utc::now(),
            completed_at: None,
            debates: BTreeMap::new(),
            skipped: BTreeMap::new(),
        }
    }

    /// Reconstruct a run summary from its events
    pub fn from_events(events: &[Event]) -> Option<Self> {
        let first_event = events.first()?;

        let mut run = Self::new(first_event.run_id);
        run.started_at = first_event.timestamp;

        for event in events {
            run.apply_event(event);
        }

        Some(run)
    }

    /// Apply a single event
    pub fn apply_event(&mut self, event: &Event) {
        match event.event_type {
            EventType::RunStarted => {
                self.state = RunState::Running;
                self.started_at = event.timestamp;
            }
            EventType::RunCompleted => {
                self.state = RunState::Completed;
                self.completed_at = Some(event.timestamp);
            }
            EventType::RunFailed => {
                self.state = RunState::Failed {
                    error: event.error.clone().unwrap_or_default(),
                };
                self.completed_at = Some(event.timestamp);
            }
            EventType::DebateAssembled => self.set_status(event, DebateStatus::Assembled),
            EventType::EmotionsMerged | EventType::FallaciesMerged => {
                self.set_status(event, DebateStatus::Merged)
            }
            EventType::DebateAggregated => self.set_status(event, DebateStatus::Aggregated),
            EventType::DebateSkipped => {
                self.set_status(event, DebateStatus::Skipped);
                if let Some(ref debate_id) = event.debate_id {
                    self.skipped
                        .insert(debate_id.clone(), event.error.clone().unwrap_or_default());
                }
            }
        }
    }

    fn set_status(&mut self, event: &Event, status: DebateStatus) {
        if let Some(ref debate_id) = event.debate_id {
            self.debates.insert(debate_id.clone(), status);
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running)
    }

    pub fn count(&self, status: DebateStatus) -> usize {
        self.debates.values().filter(|s| **s == status).count()
    }
}

/// State of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunState {
    #[default]
    Running,
    Completed,
    Failed { error: String },
}

/// Progress of one debate within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateStatus {
    Assembled,
    Merged,
    Aggregated,
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(run_id: Uuid, debate: Option<&str>, event_type: EventType) -> Event {
        Event::new(
            run_id,
            debate.map(str::to_string),
            event_type,
            format!("{:?}", event_type),
        )
    }

    #[test]
    fn test_run_from_events() {
        let run_id = Uuid::new_v4();
        let events = vec![
            event(run_id, None, EventType::RunStarted),
            event(run_id, Some("2019-04-22"), EventType::DebateAssembled),
            event(run_id, Some("2019-04-22"), EventType::EmotionsMerged),
            event(run_id, Some("2019-04-22"), EventType::DebateAggregated),
            event(run_id, Some("1993-05-24"), EventType::DebateSkipped)
                .with_error("Missing source".to_string()),
            event(run_id, None, EventType::RunCompleted),
        ];

        let run = RunSummary::from_events(&events).unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.state, RunState::Completed);
        assert_eq!(run.debates["2019-04-22"], DebateStatus::Aggregated);
        assert_eq!(run.count(DebateStatus::Skipped), 1);
        assert_eq!(run.skipped["1993-05-24"], "Missing source");
    }

    #[test]
    fn test_empty_log_has_no_summary() {
        assert!(RunSummary::from_events(&[]).is_none());
    }
}

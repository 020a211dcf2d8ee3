//! Append-only run log with file-based persistence.
//!
//! Each run gets `runs/{run_id}/events.jsonl` under the engine home. Events
//! are newline-delimited JSON, appended under an exclusive file lock.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::domain::{Event, RunSummary};

/// File-based event log for one run
pub struct RunLog {
    run_id: Uuid,
    run_dir: PathBuf,
    events_path: PathBuf,
}

impl RunLog {
    /// Create or open the log of a run under the configured runs directory
    pub async fn open(run_id: Uuid) -> Result<Self> {
        Self::open_in(&crate::config::runs_dir()?, run_id).await
    }

    /// Create or open the log of a run under `base_dir`
    pub async fn open_in(base_dir: &Path, run_id: Uuid) -> Result<Self> {
        let run_dir = base_dir.join(run_id.to_string());

        fs::create_dir_all(&run_dir)
            .await
            .with_context(|| format!("Failed to create run directory: {}", run_dir.display()))?;

        Ok(Self {
            run_id,
            events_path: run_dir.join("events.jsonl"),
            run_dir,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    /// Append an event to the log
    pub async fn append(&self, event: &Event) -> Result<()> {
        let json = serde_json::to_string(event).context("Failed to serialize event")?;
        let path = self.events_path.clone();

        tokio::task::spawn_blocking(move || append_locked(&path, &json))
            .await
            .context("Event writer task failed")?
    }

    /// Replay all events in order
    pub async fn replay(&self) -> Result<Vec<Event>> {
        if !self.events_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.events_path)
            .await
            .with_context(|| format!("Failed to open events file: {}", self.events_path.display()))?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut events = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let event: Event = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse event: {}", line))?;
            events.push(event);
        }

        Ok(events)
    }

    /// Summary rebuilt from the log, `None` when nothing was logged
    pub async fn summary(&self) -> Result<Option<RunSummary>> {
        Ok(RunSummary::from_events(&self.replay().await?))
    }

    /// List all run ids under `base_dir`
    pub async fn list_runs_in(base_dir: &Path) -> Result<Vec<Uuid>> {
        if !base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        let mut entries = fs::read_dir(base_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Ok(uuid) = Uuid::parse_str(name) {
                        runs.push(uuid);
                    }
                }
            }
        }

        Ok(runs)
    }

    /// List all run ids under the configured runs directory
    pub async fn list_runs() -> Result<Vec<Uuid>> {
        Self::list_runs_in(&crate::config::runs_dir()?).await
    }
}

fn append_locked(path: &Path, json: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open events file: {}", path.display()))?;

    file.lock_exclusive()
        .context("Failed to acquire file lock on events.jsonl")?;

    writeln!(file, "{}", json).context("Failed to write event")?;
    file.flush().context("Failed to flush event")?;

    // Lock is released when file is dropped
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DebateStatus, EventType, RunState};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_append_and_replay_in_order() {
        let temp = TempDir::new().unwrap();
        let run_id = Uuid::new_v4();
        let log = RunLog::open_in(temp.path(), run_id).await.unwrap();

        log.append(&Event::new(run_id, None, EventType::RunStarted, "start".to_string()))
            .await
            .unwrap();
        for date in ["2019-04-16", "2019-04-20", "2019-04-22"] {
            log.append(&Event::new(
                run_id,
                Some(date.to_string()),
                EventType::DebateAssembled,
                "assembled".to_string(),
            ))
            .await
            .unwrap();
        }

        let events = log.replay().await.unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].event_type, EventType::RunStarted);
        assert_eq!(events[3].debate_id.as_deref(), Some("2019-04-22"));

        let summary = log.summary().await.unwrap().unwrap();
        assert_eq!(summary.state, RunState::Running);
        assert_eq!(summary.count(DebateStatus::Assembled), 3);
    }

    #[tokio::test]
    async fn test_list_runs_ignores_other_entries() {
        let temp = TempDir::new().unwrap();
        let run_id = Uuid::new_v4();
        RunLog::open_in(temp.path(), run_id).await.unwrap();
        std::fs::create_dir_all(temp.path().join("not-a-run")).unwrap();

        let runs = RunLog::list_runs_in(temp.path()).await.unwrap();
        assert_eq!(runs, vec![run_id]);
    }

    #[tokio::test]
    async fn test_missing_log_replays_empty() {
        let temp = TempDir::new().unwrap();
        let log = RunLog::open_in(temp.path(), Uuid::new_v4()).await.unwrap();
        assert!(log.replay().await.unwrap().is_empty());
        assert!(log.summary().await.unwrap().is_none());
    }
}

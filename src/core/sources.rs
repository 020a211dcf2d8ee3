//! Loading of per-debate source files.
//!
//! A debate needs the turn and speaker tables plus five annotation files.
//! Any of them missing, or an empty table, skips the debate. Emotion and
//! fallacy responses are optional.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use super::assembler::{DebateSources, SpeakerRow, TurnRow};
use crate::annotations::{parse_claims, parse_intervals, parse_mentions, parse_proposals, MarkupKind};

/// Reasons a debate's sources cannot be used
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Missing source ({kind}): {}", path.display())]
    Missing { kind: &'static str, path: PathBuf },

    #[error("Empty table ({kind}): {}", path.display())]
    EmptyTable { kind: &'static str, path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid record at {}:{line}: {source}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    /// Whether the debate should be skipped rather than the run failed
    pub fn is_skip(&self) -> bool {
        matches!(self, SourceError::Missing { .. } | SourceError::EmptyTable { .. })
    }
}

/// Resolved source paths of one debate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub segments: PathBuf,
    pub speakers: PathBuf,
    pub blocks: PathBuf,
    pub topics: PathBuf,
    pub mentions: PathBuf,
    pub proposals: PathBuf,
    pub claims: PathBuf,
    pub emotions: PathBuf,
    pub fallacies: PathBuf,
}

impl SourcePaths {
    /// Required inputs, in checking order
    pub fn required(&self) -> [(&'static str, &Path); 7] {
        [
            ("segments", &self.segments),
            ("blocks", &self.blocks),
            ("topics", &self.topics),
            ("mentions", &self.mentions),
            ("proposals", &self.proposals),
            ("claims", &self.claims),
            ("speakers", &self.speakers),
        ]
    }

    /// First required input that does not exist
    pub fn first_missing(&self) -> Option<SourceError> {
        self.required()
            .into_iter()
            .find(|(_, path)| !path.exists())
            .map(|(kind, path)| SourceError::Missing {
                kind,
                path: path.to_path_buf(),
            })
    }
}

/// Load and parse everything needed to assemble one debate
pub async fn load_debate_sources(
    paths: &SourcePaths,
    date: &str,
    election_date: &str,
    media: &str,
) -> Result<DebateSources, SourceError> {
    if let Some(missing) = paths.first_missing() {
        return Err(missing);
    }

    let turns: Vec<TurnRow> = read_table(&paths.segments, "segments").await?;
    let speakers: Vec<SpeakerRow> = read_table(&paths.speakers, "speakers").await?;

    let blocks = parse_intervals(&read_text(&paths.blocks).await?, MarkupKind::Block);
    let topics = parse_intervals(&read_text(&paths.topics).await?, MarkupKind::Topic);
    let mentions = parse_mentions(&read_text(&paths.mentions).await?);
    let proposals = parse_proposals(&read_text(&paths.proposals).await?);
    let claims = parse_claims(&read_text(&paths.claims).await?);

    debug!(
        debate = date,
        turns = turns.len(),
        speakers = speakers.len(),
        blocks = blocks.len(),
        topics = topics.len(),
        "Sources loaded"
    );

    Ok(DebateSources {
        date: date.to_string(),
        election_date: election_date.to_string(),
        media: media.to_string(),
        turns,
        speakers,
        blocks,
        topics,
        mentions,
        proposals,
        claims,
    })
}

/// Read a JSON Lines table; blank lines are ignored, an empty table is an error
pub async fn read_table<T: DeserializeOwned>(path: &Path, kind: &'static str) -> Result<Vec<T>, SourceError> {
    let content = read_text(path).await?;
    let mut rows = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(line).map_err(|source| SourceError::Parse {
            path: path.to_path_buf(),
            line: line_no + 1,
            source,
        })?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(SourceError::EmptyTable {
            kind,
            path: path.to_path_buf(),
        });
    }

    Ok(rows)
}

pub async fn read_text(path: &Path) -> Result<String, SourceError> {
    fs::read_to_string(path).await.map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Contents of an optional input, `None` when the file does not exist
pub async fn read_optional(path: &Path) -> Result<Option<String>, SourceError> {
    if !path.exists() {
        return Ok(None);
    }
    read_text(path).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths_in(dir: &Path) -> SourcePaths {
        SourcePaths {
            segments: dir.join("segments.jsonl"),
            speakers: dir.join("speakers.jsonl"),
            blocks: dir.join("blocks.txt"),
            topics: dir.join("topics.txt"),
            mentions: dir.join("mentions.txt"),
            proposals: dir.join("proposals.txt"),
            claims: dir.join("claims.txt"),
            emotions: dir.join("emotions.txt"),
            fallacies: dir.join("fallacies.txt"),
        }
    }

    fn write_all(paths: &SourcePaths, segments: &str) {
        std::fs::write(&paths.segments, segments).unwrap();
        std::fs::write(&paths.speakers, "{\"speaker_name\":\"Ana\"}\n").unwrap();
        std::fs::write(&paths.blocks, "<BLOQUE titulo=\"Intro\" tiempo=\"00:00.000\">\n").unwrap();
        for path in [&paths.topics, &paths.mentions, &paths.proposals, &paths.claims] {
            std::fs::write(path, "").unwrap();
        }
    }

    #[tokio::test]
    async fn test_missing_source_reported() {
        let temp = TempDir::new().unwrap();
        let paths = paths_in(temp.path());
        write_all(&paths, "{\"inicio\":\"00:01.000\",\"nombre\":\"Ana\",\"texto\":\"Hola\"}\n");
        std::fs::remove_file(&paths.claims).unwrap();

        let err = load_debate_sources(&paths, "2019-04-22", "", "").await.unwrap_err();
        assert!(err.is_skip());
        assert!(matches!(err, SourceError::Missing { kind: "claims", .. }));
    }

    #[tokio::test]
    async fn test_empty_table_reported() {
        let temp = TempDir::new().unwrap();
        let paths = paths_in(temp.path());
        write_all(&paths, "\n\n");

        let err = load_debate_sources(&paths, "2019-04-22", "", "").await.unwrap_err();
        assert!(matches!(err, SourceError::EmptyTable { kind: "segments", .. }));
    }

    #[tokio::test]
    async fn test_invalid_row_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let paths = paths_in(temp.path());
        write_all(&paths, "{\"inicio\":\"00:01.000\",\"nombre\":\"Ana\"}\nnot json\n");

        let err = load_debate_sources(&paths, "2019-04-22", "", "").await.unwrap_err();
        assert!(!err.is_skip());
        assert!(matches!(err, SourceError::Parse { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_loads_complete_sources() {
        let temp = TempDir::new().unwrap();
        let paths = paths_in(temp.path());
        write_all(&paths, "{\"inicio\":\"00:01.000\",\"nombre\":\"Ana\",\"texto\":\"Hola\"}\n");

        let sources = load_debate_sources(&paths, "2019-04-22", "2019-04-28", "RTVE")
            .await
            .unwrap();
        assert_eq!(sources.turns.len(), 1);
        assert_eq!(sources.speakers[0].name, "Ana");
        assert_eq!(sources.blocks.len(), 1);
        assert_eq!(sources.media, "RTVE");
        assert!(read_optional(&paths.emotions).await.unwrap().is_none());
    }
}

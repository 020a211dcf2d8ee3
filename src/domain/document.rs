//! The canonical debate document.
//!
//! One document per debate: participants registry, ordered thematic blocks,
//! and the interventions placed into them. Field names serialize in
//! kebab-case, matching the element/attribute names of the debate tree
//! (`full-name`, `participant-id`, `linguistic-stats`, ...).

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;

use super::timecode::Timestamp;

/// Per-turn or per-speaker linguistic style ratios.
///
/// Values come pre-computed from the language analysis stage; any of them
/// may be missing (a turn without verbs has no dependents-per-verb). The
/// upper-case column names of the analysis tables are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinguisticStats {
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "TTR")]
    pub ttr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "STOP_RATIO", alias = "stop_ratio")]
    pub stop_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "AVG_SENT_LEN", alias = "avg_sent_len")]
    pub avg_sent_len: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "AVG_DEP_PER_VERB", alias = "avg_dep_per_verb")]
    pub avg_dep_per_verb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "PUNCT_RATIO", alias = "punct_ratio")]
    pub punct_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "ADJ_RATIO", alias = "adj_ratio")]
    pub adj_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "ADV_RATIO", alias = "adv_ratio")]
    pub adv_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "AVG_DEP_DIST", alias = "avg_dep_dist")]
    pub avg_dep_dist: Option<f64>,
}

impl LinguisticStats {
    /// Attribute names in document order
    pub const FIELDS: [&'static str; 8] = [
        "ttr",
        "stop-ratio",
        "avg-sent-len",
        "avg-dep-per-verb",
        "punct-ratio",
        "adj-ratio",
        "adv-ratio",
        "avg-dep-dist",
    ];

    /// Values paired with their attribute names, in document order
    pub fn entries(&self) -> [(&'static str, Option<f64>); 8] {
        [
            (Self::FIELDS[0], self.ttr),
            (Self::FIELDS[1], self.stop_ratio),
            (Self::FIELDS[2], self.avg_sent_len),
            (Self::FIELDS[3], self.avg_dep_per_verb),
            (Self::FIELDS[4], self.punct_ratio),
            (Self::FIELDS[5], self.adj_ratio),
            (Self::FIELDS[6], self.adv_ratio),
            (Self::FIELDS[7], self.avg_dep_dist),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, v)| v.is_none())
    }
}

/// A speaker registered for one debate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Participant {
    pub id: String,
    pub full_name: String,
    /// Empty when the speaker has no party
    #[serde(default)]
    pub party: String,
    #[serde(flatten)]
    pub stats: LinguisticStats,
}

/// A named-entity mention inside one intervention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub text: String,
}

/// A checkable statement flagged by the fact-checking annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallacy {
    pub id: String,
    pub category: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub id: String,
    pub text: String,
    /// Comma-separated emotion tags, set by merge-back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotions: Option<String>,
}

/// One speaker turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Intervention {
    pub id: String,
    pub participant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub start: Timestamp,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<Mention>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proposals: Vec<Proposal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub claims: Vec<Claim>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallacies: Vec<Fallacy>,
    #[serde(default)]
    pub linguistic_stats: LinguisticStats,
    #[serde(default)]
    pub sentences: Vec<Sentence>,
}

impl Intervention {
    /// Sentence texts joined by single spaces
    pub fn full_text(&self) -> String {
        self.sentences
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whitespace-delimited tokens across all sentences
    pub fn word_count(&self) -> usize {
        self.sentences
            .iter()
            .map(|s| s.text.split_whitespace().count())
            .sum()
    }

    /// Emotion tags of every sentence, in order, blanks removed
    pub fn emotions(&self) -> Vec<String> {
        self.sentences
            .iter()
            .map(|s| s.emotions.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join(",")
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A thematic block of the debate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub topic: String,
    pub start: Timestamp,
    #[serde(default)]
    pub interventions: Vec<Intervention>,
}

/// The canonical debate document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Document {
    /// Debate date, also the debate id
    pub date: String,
    #[serde(default)]
    pub election_date: String,
    #[serde(default)]
    pub media: String,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(date: impl Into<String>, election_date: impl Into<String>, media: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            election_date: election_date.into(),
            media: media.into(),
            participants: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// The debate id
    pub fn debate_id(&self) -> &str {
        &self.date
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn participant_by_name(&self, name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.full_name == name)
    }

    /// All interventions in document order
    pub fn interventions(&self) -> impl Iterator<Item = &Intervention> {
        self.blocks.iter().flat_map(|b| b.interventions.iter())
    }

    pub fn interventions_mut(&mut self) -> impl Iterator<Item = &mut Intervention> {
        self.blocks.iter_mut().flat_map(|b| b.interventions.iter_mut())
    }

    pub fn intervention_count(&self) -> usize {
        self.blocks.iter().map(|b| b.interventions.len()).sum()
    }

    /// SHA256 of the compact JSON form, as "sha256:<hex>"
    pub fn digest(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self).context("Failed to serialize document")?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
    }

    /// Load a document from a JSON file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read document: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse document: {}", path.display()))
    }

    /// Save the document as pretty JSON, creating parent directories
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write document: {}", path.display()))?;

        Ok(())
    }
}

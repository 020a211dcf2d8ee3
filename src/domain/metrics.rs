//! Aggregate statistics records.
//!
//! One [`Accumulator`] shape serves all three scopes (debate, speaker,
//! party). Counters and the deduplicated text maps are independent: a
//! recurring formatted text overwrites its origin but every occurrence is
//! still counted.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::document::{LinguisticStats, Mention};

/// emotion → occurrences
pub type EmotionCounts = BTreeMap<String, usize>;

/// Running sum of one ratio plus how many values went into it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatTotal {
    pub sum: f64,
    pub count: usize,
}

impl StatTotal {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.sum += v;
            self.count += 1;
        }
    }

    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Summed linguistic ratios, one running total per attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinguisticTotals {
    pub ttr: StatTotal,
    pub stop_ratio: StatTotal,
    pub avg_sent_len: StatTotal,
    pub avg_dep_per_verb: StatTotal,
    pub punct_ratio: StatTotal,
    pub adj_ratio: StatTotal,
    pub adv_ratio: StatTotal,
    pub avg_dep_dist: StatTotal,
}

impl LinguisticTotals {
    /// Fold one record in; missing and non-finite values are not counted
    pub fn add(&mut self, stats: &LinguisticStats) {
        self.ttr.add(stats.ttr);
        self.stop_ratio.add(stats.stop_ratio);
        self.avg_sent_len.add(stats.avg_sent_len);
        self.avg_dep_per_verb.add(stats.avg_dep_per_verb);
        self.punct_ratio.add(stats.punct_ratio);
        self.adj_ratio.add(stats.adj_ratio);
        self.adv_ratio.add(stats.adv_ratio);
        self.avg_dep_dist.add(stats.avg_dep_dist);
    }

    /// Per-attribute means
    pub fn averages(&self) -> LinguisticStats {
        LinguisticStats {
            ttr: self.ttr.average(),
            stop_ratio: self.stop_ratio.average(),
            avg_sent_len: self.avg_sent_len.average(),
            avg_dep_per_verb: self.avg_dep_per_verb.average(),
            punct_ratio: self.punct_ratio.average(),
            adj_ratio: self.adj_ratio.average(),
            adv_ratio: self.adv_ratio.average(),
            avg_dep_dist: self.avg_dep_dist.average(),
        }
    }

    /// Total number of values folded in, across attributes
    pub fn hits(&self) -> usize {
        [
            self.ttr,
            self.stop_ratio,
            self.avg_sent_len,
            self.avg_dep_per_verb,
            self.punct_ratio,
            self.adj_ratio,
            self.adv_ratio,
            self.avg_dep_dist,
        ]
        .iter()
        .map(|t| t.count)
        .sum()
    }
}

/// Where a deduplicated claim/proposal/fallacy text was last seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextOrigin {
    pub debate_id: String,
    pub intervention_id: String,
    pub full_text: String,
    pub speaker: String,
}

/// Per-topic tally within one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicTally {
    pub count: usize,
    /// Debate and intervention of the first occurrence
    pub debate_id: String,
    pub intervention_id: String,
    /// Text of every occurrence, space-joined
    pub full_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub speakers: Vec<String>,
}

/// Statistics for one scope key (a debate, a speaker or a party)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    pub interventions: usize,
    pub sentences: usize,
    pub words: usize,
    pub claims: usize,
    pub proposals: usize,
    pub fallacies: usize,

    /// Speaker and party scope only
    pub linguistic: LinguisticTotals,

    pub emotions: EmotionCounts,
    /// debate id → emotion counts
    pub emotions_by_debate: BTreeMap<String, EmotionCounts>,
    /// debate id → intervention id → emotion counts
    pub intervention_emotions: BTreeMap<String, BTreeMap<String, EmotionCounts>>,

    /// Keyed by formatted display text, in first-seen order
    pub claims_texts: IndexMap<String, TextOrigin>,
    pub proposals_texts: IndexMap<String, TextOrigin>,
    pub fallacies_texts: IndexMap<String, TextOrigin>,
    pub topics: IndexMap<String, TopicTally>,

    /// debate id → intervention id → mentions, verbatim
    pub intervention_mentions: BTreeMap<String, BTreeMap<String, Vec<Mention>>>,

    pub debates: BTreeSet<String>,
    pub participants: BTreeSet<String>,

    pub sentence_lengths: Vec<usize>,
    pub sentences_per_intervention: Vec<usize>,
    pub intervention_word_counts: Vec<usize>,
}

impl Accumulator {
    /// Count one emotion occurrence under the given debate
    pub fn add_emotion(&mut self, debate_id: &str, emotion: &str) {
        *self.emotions.entry(emotion.to_string()).or_default() += 1;
        *self
            .emotions_by_debate
            .entry(debate_id.to_string())
            .or_default()
            .entry(emotion.to_string())
            .or_default() += 1;
    }

    /// Store the emotion breakdown of one intervention
    pub fn set_intervention_emotions(
        &mut self,
        debate_id: &str,
        intervention_id: &str,
        counts: EmotionCounts,
    ) {
        self.intervention_emotions
            .entry(debate_id.to_string())
            .or_default()
            .insert(intervention_id.to_string(), counts);
    }

    pub fn set_intervention_mentions(
        &mut self,
        debate_id: &str,
        intervention_id: &str,
        mentions: Vec<Mention>,
    ) {
        self.intervention_mentions
            .entry(debate_id.to_string())
            .or_default()
            .insert(intervention_id.to_string(), mentions);
    }

    /// First occurrence seeds the tally, later ones add to it
    pub fn record_topic(
        &mut self,
        topic: &str,
        debate_id: &str,
        intervention_id: &str,
        full_text: &str,
        speaker: Option<&str>,
    ) {
        match self.topics.get_mut(topic) {
            Some(tally) => {
                tally.count += 1;
                tally.full_text.push(' ');
                tally.full_text.push_str(full_text);
                if let Some(speaker) = speaker {
                    tally.speakers.push(speaker.to_string());
                }
            }
            None => {
                self.topics.insert(
                    topic.to_string(),
                    TopicTally {
                        count: 1,
                        debate_id: debate_id.to_string(),
                        intervention_id: intervention_id.to_string(),
                        full_text: full_text.to_string(),
                        speakers: speaker.map(|s| vec![s.to_string()]).unwrap_or_default(),
                    },
                );
            }
        }
    }

    /// Total mentions recorded across interventions
    pub fn mention_count(&self) -> usize {
        self.intervention_mentions
            .values()
            .flat_map(|by_intervention| by_intervention.values())
            .map(Vec::len)
            .sum()
    }
}

/// Record `origin` under `formatted`; a repeat overwrites the origin in place
pub fn record_text(map: &mut IndexMap<String, TextOrigin>, formatted: &str, origin: TextOrigin) {
    map.insert(formatted.to_string(), origin);
}

/// One block's share of a debate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub topic: String,
    pub intervention_count: usize,
}

/// Descriptive information about one processed debate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateInfo {
    pub debate_id: String,
    pub election_date: String,
    pub media: String,
    pub blocks: usize,
    pub blocks_info: Vec<BlockInfo>,
    pub speakers: BTreeSet<String>,
}

/// Run-wide totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalTotals {
    pub debates: usize,
    pub blocks: usize,
    pub interventions: usize,
    pub sentences: usize,
    pub words: usize,
    pub claims: usize,
    pub proposals: usize,
    pub fallacies: usize,
    pub block_topics: BTreeMap<String, usize>,
    pub intervention_topics: BTreeMap<String, usize>,
    pub emotions: EmotionCounts,
}

/// Everything the aggregation produces for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopedMetrics {
    pub totals: GlobalTotals,
    pub debate_info: BTreeMap<String, DebateInfo>,
    pub debates: BTreeMap<String, Accumulator>,
    pub speakers: BTreeMap<String, Accumulator>,
    pub parties: BTreeMap<String, Accumulator>,
}

impl ScopedMetrics {
    /// Write debates.json, speakers.json, parties.json and totals.json
    pub async fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create metrics directory: {}", dir.display()))?;

        write_json(&dir.join("debates.json"), &DebatesFile {
            info: &self.debate_info,
            metrics: &self.debates,
        })
        .await?;
        write_json(&dir.join("speakers.json"), &self.speakers).await?;
        write_json(&dir.join("parties.json"), &self.parties).await?;
        write_json(&dir.join("totals.json"), &self.totals).await?;

        Ok(())
    }
}

#[derive(Serialize)]
struct DebatesFile<'a> {
    info: &'a BTreeMap<String, DebateInfo>,
    metrics: &'a BTreeMap<String, Accumulator>,
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write metrics: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(debate: &str, intervention: &str) -> TextOrigin {
        TextOrigin {
            debate_id: debate.to_string(),
            intervention_id: intervention.to_string(),
            full_text: String::new(),
            speaker: "Ana".to_string(),
        }
    }

    #[test]
    fn test_linguistic_totals_average_per_attribute() {
        let mut totals = LinguisticTotals::default();
        totals.add(&LinguisticStats {
            ttr: Some(0.4),
            avg_dep_per_verb: Some(2.0),
            ..Default::default()
        });
        totals.add(&LinguisticStats {
            ttr: Some(0.6),
            avg_dep_per_verb: Some(f64::NAN),
            ..Default::default()
        });

        let averages = totals.averages();
        assert!((averages.ttr.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(averages.avg_dep_per_verb, Some(2.0));
        assert_eq!(averages.stop_ratio, None);
        assert_eq!(totals.hits(), 3);
    }

    #[test]
    fn test_record_text_overwrites_origin_keeps_position() {
        let mut map = IndexMap::new();
        record_text(&mut map, "Ana: A", origin("d1", "i001"));
        record_text(&mut map, "Ana: B", origin("d1", "i002"));
        record_text(&mut map, "Ana: A", origin("d2", "i007"));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get_index(0).unwrap().0, "Ana: A");
        assert_eq!(map["Ana: A"].debate_id, "d2");
        assert_eq!(map["Ana: A"].intervention_id, "i007");
    }

    #[test]
    fn test_record_topic_seeds_then_appends() {
        let mut acc = Accumulator::default();
        acc.record_topic("Paro", "d1", "i000", "uno", None);
        acc.record_topic("Paro", "d1", "i004", "dos", None);

        let tally = &acc.topics["Paro"];
        assert_eq!(tally.count, 2);
        assert_eq!(tally.intervention_id, "i000");
        assert_eq!(tally.full_text, "uno dos");
        assert!(tally.speakers.is_empty());
    }

    #[test]
    fn test_add_emotion_indexes_by_debate() {
        let mut acc = Accumulator::default();
        acc.add_emotion("d1", "ira");
        acc.add_emotion("d1", "ira");
        acc.add_emotion("d2", "miedo");

        assert_eq!(acc.emotions["ira"], 2);
        assert_eq!(acc.emotions_by_debate["d1"]["ira"], 2);
        assert_eq!(acc.emotions_by_debate["d2"]["miedo"], 1);
        assert!(acc.emotions_by_debate["d2"].get("ira").is_none());
    }
}

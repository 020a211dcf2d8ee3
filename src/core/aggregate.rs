//! Aggregation of assembled documents into scoped statistics.
//!
//! One engine lives for one run. Each document is folded in turn; speaker
//! and party accumulators are shared across debates, so documents must be
//! folded sequentially and in a stable order.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::domain::metrics::record_text;
use crate::domain::{
    BlockInfo, DebateInfo, Document, EmotionCounts, Intervention, Participant, ScopedMetrics,
    TextOrigin,
};

/// Speaker key used when a participant cannot be resolved or has no name
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// Party key used for speakers without a party
pub const NO_PARTY: &str = "No party";

/// Settings the aggregation depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationSettings {
    /// Pseudo-speakers whose claims and proposals are not indexed
    pub moderators: Vec<String>,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            moderators: vec!["MODERADOR".to_string(), "DECLARACIONES".to_string()],
        }
    }
}

/// Per-run aggregation state
#[derive(Debug, Default)]
pub struct AggregationEngine {
    settings: AggregationSettings,
    metrics: ScopedMetrics,
}

/// Scope keys of one intervention's speaker
struct SpeakerKeys {
    speaker: String,
    party: String,
}

impl SpeakerKeys {
    fn resolve(participant: Option<&Participant>) -> Self {
        let speaker = participant
            .map(|p| p.full_name.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_SPEAKER)
            .to_string();
        let party = participant
            .map(|p| p.party.trim())
            .filter(|party| !party.is_empty())
            .unwrap_or(NO_PARTY)
            .to_string();
        Self { speaker, party }
    }
}

impl AggregationEngine {
    pub fn new(settings: AggregationSettings) -> Self {
        Self {
            settings,
            metrics: ScopedMetrics::default(),
        }
    }

    fn is_moderator(&self, speaker: &str) -> bool {
        self.settings.moderators.iter().any(|m| m == speaker)
    }

    /// Fold one document into the accumulators
    pub fn fold(&mut self, doc: &Document) {
        let debate_id = doc.debate_id().to_string();

        if self.metrics.debates.contains_key(&debate_id) {
            warn!(debate = %debate_id, "Debate already aggregated in this run, merging");
        } else {
            self.metrics.totals.debates += 1;
        }

        let participants: HashMap<&str, &Participant> =
            doc.participants.iter().map(|p| (p.id.as_str(), p)).collect();

        self.metrics.totals.blocks += doc.blocks.len();
        let mut blocks_info = Vec::with_capacity(doc.blocks.len());
        let mut speakers = BTreeSet::new();

        for block in &doc.blocks {
            *self
                .metrics
                .totals
                .block_topics
                .entry(block.topic.clone())
                .or_default() += 1;

            for intervention in &block.interventions {
                let keys = SpeakerKeys::resolve(
                    participants.get(intervention.participant_id.as_str()).copied(),
                );
                self.fold_intervention(&debate_id, intervention, &keys);
                speakers.insert(keys.speaker);
            }

            blocks_info.push(BlockInfo {
                topic: block.topic.clone(),
                intervention_count: block.interventions.len(),
            });
        }

        let info = self
            .metrics
            .debate_info
            .entry(debate_id.clone())
            .or_insert_with(|| DebateInfo {
                debate_id: debate_id.clone(),
                ..Default::default()
            });
        info.election_date = doc.election_date.clone();
        info.media = doc.media.clone();
        info.blocks += doc.blocks.len();
        info.blocks_info.extend(blocks_info);
        info.speakers.extend(speakers);

        debug!(
            debate = %debate_id,
            interventions = doc.intervention_count(),
            "Document folded"
        );
    }

    fn fold_intervention(&mut self, debate_id: &str, intervention: &Intervention, keys: &SpeakerKeys) {
        let moderator = self.is_moderator(&keys.speaker);
        let ScopedMetrics {
            totals,
            debates,
            speakers,
            parties,
            ..
        } = &mut self.metrics;

        let full_text = intervention.full_text();
        let sentence_lengths: Vec<usize> = intervention
            .sentences
            .iter()
            .map(|s| s.text.split_whitespace().count())
            .collect();
        let words: usize = sentence_lengths.iter().sum();

        let mut emotions = EmotionCounts::new();
        for emotion in intervention.emotions() {
            *emotions.entry(emotion).or_default() += 1;
        }

        let origin = |speaker: &str| TextOrigin {
            debate_id: debate_id.to_string(),
            intervention_id: intervention.id.clone(),
            full_text: full_text.clone(),
            speaker: speaker.to_string(),
        };

        let mut indexed_texts: Vec<(Kind, String)> = Vec::new();
        if !moderator {
            for claim in &intervention.claims {
                let text = claim.text.trim();
                if !text.is_empty() {
                    indexed_texts.push((Kind::Claim, format!("{}: {}", keys.speaker, text)));
                }
            }
            for proposal in &intervention.proposals {
                let text = proposal.text.trim();
                if !text.is_empty() {
                    indexed_texts.push((Kind::Proposal, format!("{}: {}", keys.speaker, text)));
                }
            }
        }
        for fallacy in &intervention.fallacies {
            indexed_texts.push((
                Kind::Fallacy,
                format!("{} ({}): {}", keys.speaker, fallacy.category, fallacy.text.trim()),
            ));
        }

        let debate = debates.entry(debate_id.to_string()).or_default();
        let speaker = speakers.entry(keys.speaker.clone()).or_default();
        let party = parties.entry(keys.party.clone()).or_default();

        for acc in [&mut *debate, &mut *speaker, &mut *party] {
            acc.interventions += 1;
            acc.sentences += intervention.sentences.len();
            acc.words += words;
            acc.claims += intervention.claims.len();
            acc.proposals += intervention.proposals.len();
            acc.fallacies += intervention.fallacies.len();
            acc.debates.insert(debate_id.to_string());

            acc.sentence_lengths.extend_from_slice(&sentence_lengths);
            acc.sentences_per_intervention.push(intervention.sentences.len());
            acc.intervention_word_counts.push(words);

            for (emotion, count) in &emotions {
                for _ in 0..*count {
                    acc.add_emotion(debate_id, emotion);
                }
            }
            acc.set_intervention_emotions(debate_id, &intervention.id, emotions.clone());
            acc.set_intervention_mentions(debate_id, &intervention.id, intervention.mentions.clone());

            for (kind, formatted) in &indexed_texts {
                let map = match kind {
                    Kind::Claim => &mut acc.claims_texts,
                    Kind::Proposal => &mut acc.proposals_texts,
                    Kind::Fallacy => &mut acc.fallacies_texts,
                };
                record_text(map, formatted, origin(&keys.speaker));
            }
        }

        speaker.linguistic.add(&intervention.linguistic_stats);
        party.linguistic.add(&intervention.linguistic_stats);
        party.participants.insert(keys.speaker.clone());

        if let Some(topic) = intervention.topic.as_deref().filter(|t| !t.is_empty()) {
            debate.record_topic(topic, debate_id, &intervention.id, &full_text, Some(&keys.speaker));
            speaker.record_topic(topic, debate_id, &intervention.id, &full_text, None);
            party.record_topic(topic, debate_id, &intervention.id, &full_text, None);
            *totals.intervention_topics.entry(topic.to_string()).or_default() += 1;
        }

        totals.interventions += 1;
        totals.sentences += intervention.sentences.len();
        totals.words += words;
        totals.claims += intervention.claims.len();
        totals.proposals += intervention.proposals.len();
        totals.fallacies += intervention.fallacies.len();
        for (emotion, count) in emotions {
            *totals.emotions.entry(emotion).or_default() += count;
        }
    }

    /// Current state, without consuming the engine
    pub fn metrics(&self) -> &ScopedMetrics {
        &self.metrics
    }

    pub fn finish(self) -> ScopedMetrics {
        self.metrics
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Claim,
    Proposal,
    Fallacy,
}

/// Fold a sequence of documents with one engine
pub fn aggregate<'a>(
    documents: impl IntoIterator<Item = &'a Document>,
    settings: AggregationSettings,
) -> ScopedMetrics {
    let mut engine = AggregationEngine::new(settings);
    for doc in documents {
        engine.fold(doc);
    }
    engine.finish()
}

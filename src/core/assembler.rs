//! Document assembly.
//!
//! Builds the canonical debate document from the turn table, the speaker
//! table and the recovered annotation lists. Turns are placed into the block
//! whose interval contains their start; turns that no block covers are
//! dropped and never receive an intervention id.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::sentences::SentenceSplitter;
use super::temporal::{assign_interval, assign_interval_index, lookup_exact};
use crate::annotations::{IntervalList, TimedGroups};
use crate::domain::{
    parse_timecode, Block, Claim, Document, Intervention, LinguisticStats, Mention, Participant,
    Proposal, Sentence, Timestamp,
};

/// One row of the turn table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRow {
    #[serde(alias = "inicio")]
    pub start: String,
    #[serde(default, alias = "fin")]
    pub end: Option<String>,
    #[serde(alias = "nombre")]
    pub speaker: String,
    #[serde(default, alias = "partido_nombre")]
    pub party: Option<String>,
    #[serde(default, alias = "texto")]
    pub text: String,
    #[serde(flatten)]
    pub stats: LinguisticStats,
}

/// One row of the unique-speaker table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerRow {
    #[serde(rename = "speaker_name", alias = "name")]
    pub name: String,
    #[serde(flatten)]
    pub stats: LinguisticStats,
}

/// Everything needed to assemble one debate
#[derive(Debug, Clone, Default)]
pub struct DebateSources {
    pub date: String,
    pub election_date: String,
    pub media: String,
    pub turns: Vec<TurnRow>,
    pub speakers: Vec<SpeakerRow>,
    pub blocks: IntervalList,
    pub topics: IntervalList,
    pub mentions: TimedGroups<(String, String)>,
    pub proposals: TimedGroups<String>,
    pub claims: TimedGroups<String>,
}

/// What happened to the turns of one debate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    /// Turns that became interventions
    pub placed: usize,
    /// Turns no block covers
    pub unassigned: usize,
    /// Turns whose start could not be parsed
    pub unparseable: usize,
    /// Speakers missing from the speaker table, registered on first sight
    pub unregistered_speakers: Vec<String>,
}

/// Assemble the canonical document for one debate
pub fn assemble(sources: &DebateSources, splitter: &SentenceSplitter) -> (Document, AssemblyReport) {
    let mut report = AssemblyReport::default();
    let mut doc = Document::new(&sources.date, &sources.election_date, &sources.media);

    let mut registry = register_participants(sources, &mut doc);

    doc.blocks = sources
        .blocks
        .iter()
        .enumerate()
        .map(|(k, (topic, start))| Block {
            id: format!("b{}", k),
            topic: topic.clone(),
            start: *start,
            interventions: Vec::new(),
        })
        .collect();

    if doc.blocks.is_empty() {
        warn!(debate = %sources.date, "No blocks, every turn will be dropped");
    }

    let mut turns: Vec<(Timestamp, &TurnRow)> = Vec::with_capacity(sources.turns.len());
    for (row, turn) in sources.turns.iter().enumerate() {
        match parse_timecode(&turn.start) {
            Ok(start) => turns.push((start, turn)),
            Err(e) => {
                warn!(debate = %sources.date, row, error = %e, "Turn start unparseable, dropped");
                report.unparseable += 1;
            }
        }
    }
    turns.sort_by_key(|(start, _)| *start);

    let mut next_id = 0usize;

    for (start, turn) in turns {
        let Some(block_index) = assign_interval_index(&start, &sources.blocks) else {
            report.unassigned += 1;
            continue;
        };

        let topic = assign_interval(&start, &sources.topics).cloned();

        let mentions = lookup_exact(&start, &sources.mentions)
            .map(|found| number_mentions(found))
            .unwrap_or_default();

        let proposals = lookup_exact(&start, &sources.proposals)
            .map(|found| {
                found
                    .iter()
                    .enumerate()
                    .map(|(k, text)| Proposal {
                        id: format!("pr{}", k),
                        text: text.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let claims = lookup_exact(&start, &sources.claims)
            .map(|found| {
                found
                    .iter()
                    .enumerate()
                    .map(|(k, text)| Claim {
                        id: format!("r{}", k),
                        text: text.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let participant_id = match registry.get(turn.speaker.as_str()) {
            Some(id) => id.clone(),
            None => {
                let id = format!("p{}", sources.speakers.len() + report.unregistered_speakers.len());
                warn!(
                    debate = %sources.date,
                    speaker = %turn.speaker,
                    participant = %id,
                    "Speaker missing from speaker table, registered without stats"
                );
                doc.participants.push(Participant {
                    id: id.clone(),
                    full_name: turn.speaker.clone(),
                    party: turn.party.clone().unwrap_or_default(),
                    stats: LinguisticStats::default(),
                });
                registry.insert(turn.speaker.clone(), id.clone());
                report.unregistered_speakers.push(turn.speaker.clone());
                id
            }
        };

        let sentences = splitter
            .split(&turn.text)
            .into_iter()
            .map(|(k, text)| Sentence {
                id: format!("s{}", k),
                text: text.to_string(),
                emotions: None,
            })
            .collect();

        doc.blocks[block_index].interventions.push(Intervention {
            id: format!("i{:03}", next_id),
            participant_id,
            topic,
            start,
            mentions,
            proposals,
            claims,
            fallacies: Vec::new(),
            linguistic_stats: turn.stats.clone(),
            sentences,
        });
        next_id += 1;
        report.placed += 1;
    }

    debug!(
        debate = %sources.date,
        placed = report.placed,
        unassigned = report.unassigned,
        "Document assembled"
    );

    (doc, report)
}

/// Register one participant per unique speaker name, keyed by name.
///
/// Ids follow the row position in the speaker table; a repeated name is
/// skipped without renumbering the rows after it.
fn register_participants(sources: &DebateSources, doc: &mut Document) -> HashMap<String, String> {
    let mut registry = HashMap::new();

    for (row, speaker) in sources.speakers.iter().enumerate() {
        if registry.contains_key(&speaker.name) {
            continue;
        }

        let id = format!("p{}", row);
        let party = sources
            .turns
            .iter()
            .find(|turn| turn.speaker == speaker.name)
            .and_then(|turn| turn.party.clone())
            .unwrap_or_default();

        doc.participants.push(Participant {
            id: id.clone(),
            full_name: speaker.name.clone(),
            party,
            stats: speaker.stats.clone(),
        });
        registry.insert(speaker.name.clone(), id);
    }

    registry
}

/// Deduplicate by (type, text), sort, and number `e0..`
fn number_mentions(found: &[(String, String)]) -> Vec<Mention> {
    let unique: BTreeSet<&(String, String)> = found.iter().collect();
    unique
        .into_iter()
        .enumerate()
        .map(|(k, (kind, text))| Mention {
            id: format!("e{}", k),
            kind: kind.clone(),
            text: text.clone(),
        })
        .collect()
}

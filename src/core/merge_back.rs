//! Merge-back of externally computed annotations.
//!
//! Classifier responses arrive as loosely formatted text, one element per
//! line. Each line is parsed on its own; lines that fail are skipped and
//! counted. Records are joined to the document by identifier, first match
//! in document order wins, and unmatched records are dropped.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::annotations::{escape, parse_fragment};
use crate::domain::{Document, Fallacy};

/// Outcome of one merge-back pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Records that changed the document
    pub applied: usize,
    /// Records that matched but were already present
    pub unchanged: usize,
    /// Records with no matching node
    pub unmatched: usize,
    /// Lines that could not be parsed or lacked a required attribute
    pub malformed: usize,
}

impl MergeReport {
    pub fn matched(&self) -> usize {
        self.applied + self.unchanged
    }
}

/// (block, intervention) position of each intervention id, first occurrence
fn intervention_index(doc: &Document) -> HashMap<String, (usize, usize)> {
    let mut index = HashMap::new();
    for (b, block) in doc.blocks.iter().enumerate() {
        for (i, intervention) in block.interventions.iter().enumerate() {
            index.entry(intervention.id.clone()).or_insert((b, i));
        }
    }
    index
}

/// (block, intervention, sentence) position of each id pair, first occurrence
fn sentence_index(doc: &Document) -> HashMap<(String, String), (usize, usize, usize)> {
    let mut index = HashMap::new();
    for (b, block) in doc.blocks.iter().enumerate() {
        for (i, intervention) in block.interventions.iter().enumerate() {
            for (s, sentence) in intervention.sentences.iter().enumerate() {
                index
                    .entry((intervention.id.clone(), sentence.id.clone()))
                    .or_insert((b, i, s));
            }
        }
    }
    index
}

/// Apply `<emotion int_id sent_id tags/>` records to sentences
pub fn merge_emotions(doc: &mut Document, response: &str) -> MergeReport {
    let index = sentence_index(doc);
    let mut report = MergeReport::default();

    for (line_no, line) in response.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fragment = match parse_fragment(line) {
            Ok(fragment) => fragment,
            Err(e) => {
                debug!(line = line_no + 1, error = %e, "Skipping malformed emotion record");
                report.malformed += 1;
                continue;
            }
        };

        let (Some(int_id), Some(sent_id), Some(tags)) = (
            fragment.attr("int_id"),
            fragment.attr("sent_id"),
            fragment.attr("tags"),
        ) else {
            debug!(line = line_no + 1, "Emotion record missing int_id/sent_id/tags");
            report.malformed += 1;
            continue;
        };

        let Some(&(b, i, s)) = index.get(&(int_id.to_string(), sent_id.to_string())) else {
            report.unmatched += 1;
            continue;
        };

        let sentence = &mut doc.blocks[b].interventions[i].sentences[s];
        if sentence.emotions.as_deref() == Some(tags) {
            report.unchanged += 1;
        } else {
            sentence.emotions = Some(tags.to_string());
            report.applied += 1;
        }
    }

    if report.unmatched > 0 {
        warn!(
            debate = %doc.date,
            unmatched = report.unmatched,
            "Emotion records without a matching sentence were dropped"
        );
    }

    report
}

/// Apply `<fallacy int_id category>text</fallacy>` records to interventions.
///
/// The text may also come in a `text` attribute. A fallacy already present
/// with the same category and text is not added again.
pub fn merge_fallacies(doc: &mut Document, response: &str) -> MergeReport {
    let index = intervention_index(doc);
    let mut report = MergeReport::default();

    for (line_no, line) in response.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fragment = match parse_fragment(line) {
            Ok(fragment) => fragment,
            Err(e) => {
                debug!(line = line_no + 1, error = %e, "Skipping malformed fallacy record");
                report.malformed += 1;
                continue;
            }
        };

        let text = match fragment.text.trim() {
            "" => fragment.attr("text").unwrap_or("").trim(),
            body => body,
        };

        let (Some(int_id), Some(category)) = (fragment.attr("int_id"), fragment.attr("category")) else {
            debug!(line = line_no + 1, "Fallacy record missing int_id/category");
            report.malformed += 1;
            continue;
        };

        let Some(&(b, i)) = index.get(int_id) else {
            report.unmatched += 1;
            continue;
        };

        let intervention = &mut doc.blocks[b].interventions[i];
        if intervention
            .fallacies
            .iter()
            .any(|f| f.category == category && f.text == text)
        {
            report.unchanged += 1;
            continue;
        }

        let id = format!("f{}", intervention.fallacies.len());
        intervention.fallacies.push(Fallacy {
            id,
            category: category.to_string(),
            text: text.to_string(),
        });
        report.applied += 1;
    }

    if report.unmatched > 0 {
        warn!(
            debate = %doc.date,
            unmatched = report.unmatched,
            "Fallacy records without a matching intervention were dropped"
        );
    }

    report
}

/// The reduced document sent to the classifier.
///
/// Only intervention and sentence ids and the sentence texts survive, as
/// `<debate><intervention id="..."><sentence id="...">text</sentence>...`.
pub fn classifier_request(doc: &Document) -> String {
    let mut out = String::from("<debate>");

    for intervention in doc.interventions() {
        let sentences: Vec<_> = intervention
            .sentences
            .iter()
            .filter(|s| !s.text.trim().is_empty())
            .collect();

        if sentences.is_empty() {
            out.push_str(&format!("<intervention id=\"{}\" />", escape(&intervention.id)));
            continue;
        }

        out.push_str(&format!("<intervention id=\"{}\">", escape(&intervention.id)));
        for sentence in sentences {
            out.push_str(&format!(
                "<sentence id=\"{}\">{}</sentence>",
                escape(&sentence.id),
                escape(sentence.text.trim())
            ));
        }
        out.push_str("</intervention>");
    }

    out.push_str("</debate>");
    out
}

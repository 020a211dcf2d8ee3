//! Recovery of time-indexed annotation lists from markup text.
//!
//! Annotation files are loosely structured: one `<TAG attr="value" ...>`
//! element per line, and for grouped sources a bare timecode line that opens
//! the group the following elements belong to:
//!
//! ```text
//! 00:01:02.500
//! <MENCION tipo="PER" texto="Ana">
//! <MENCION tipo="ORG" texto="X">
//! 00:01:09.120
//! ...
//! ```
//!
//! Lines that do not carry the required attributes are skipped, never fatal.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::domain::timecode::{parse_timecode, Timestamp};

static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Za-z_][\w.-]*)\s*=\s*"([^"]*)""#).unwrap());

static LEADING_TIMECODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d{2}:)?\d{2}:\d{2}\.\d{3}").unwrap());

/// `(label, start)` pairs, sorted by start
pub type IntervalList = Vec<(String, Timestamp)>;

/// `(time, items)` groups, sorted by time
pub type TimedGroups<T> = Vec<(Timestamp, Vec<T>)>;

/// The annotation sources and the markup each one uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupKind {
    Block,
    Topic,
    Mention,
    Proposal,
    Claim,
}

impl MarkupKind {
    /// Element marker searched for in each line
    pub fn marker(&self) -> &'static str {
        match self {
            MarkupKind::Block => "<BLOQUE",
            MarkupKind::Topic => "<TEMA",
            MarkupKind::Mention => "<MENCION",
            MarkupKind::Proposal => "<PROPUESTA",
            MarkupKind::Claim => "<REVISABLE",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkupKind::Block => "blocks",
            MarkupKind::Topic => "topics",
            MarkupKind::Mention => "mentions",
            MarkupKind::Proposal => "proposals",
            MarkupKind::Claim => "claims",
        }
    }
}

/// Attributes of a markup line; the first occurrence of a name wins
pub fn parse_attributes(line: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    for caps in ATTRIBUTE.captures_iter(line) {
        attributes
            .entry(caps[1].to_string())
            .or_insert_with(|| caps[2].to_string());
    }
    attributes
}

/// Timecode at the very start of a line (`HH:MM:SS.mmm` or `MM:SS.mmm`)
pub fn leading_timecode(line: &str) -> Option<Timestamp> {
    let found = LEADING_TIMECODE.find(line)?;
    parse_timecode(found.as_str()).ok()
}

/// Parse a block or topic file into a sorted interval list.
///
/// Each marked line needs a `titulo` and a `tiempo` attribute.
pub fn parse_intervals(content: &str, kind: MarkupKind) -> IntervalList {
    let mut intervals = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        if !line.contains(kind.marker()) {
            continue;
        }

        let attributes = parse_attributes(line);
        let (Some(title), Some(time)) = (attributes.get("titulo"), attributes.get("tiempo")) else {
            warn!(kind = kind.as_str(), line = line_no + 1, "Markup line missing titulo/tiempo, skipped");
            continue;
        };

        match parse_timecode(time) {
            Ok(start) => intervals.push((title.clone(), start)),
            Err(e) => {
                warn!(kind = kind.as_str(), line = line_no + 1, error = %e, "Unparseable tiempo, skipped");
            }
        }
    }

    intervals.sort_by_key(|(_, start)| *start);
    intervals
}

/// Parse a grouped file: timecode lines open groups, marked lines add items
fn parse_groups<T>(
    content: &str,
    kind: MarkupKind,
    extract: impl Fn(&HashMap<String, String>) -> Option<T>,
) -> TimedGroups<T> {
    let mut groups = Vec::new();
    let mut current: Option<(Timestamp, Vec<T>)> = None;
    let mut orphans = 0usize;

    for (line_no, line) in content.lines().enumerate() {
        if let Some(time) = leading_timecode(line) {
            if let Some(group) = current.take() {
                groups.push(group);
            }
            current = Some((time, Vec::new()));
        } else if line.contains(kind.marker()) {
            let attributes = parse_attributes(line);
            let Some(item) = extract(&attributes) else {
                warn!(kind = kind.as_str(), line = line_no + 1, "Markup line missing attributes, skipped");
                continue;
            };
            match current.as_mut() {
                Some((_, items)) => items.push(item),
                None => orphans += 1,
            }
        }
    }

    if let Some(group) = current.take() {
        groups.push(group);
    }

    if orphans > 0 {
        debug!(kind = kind.as_str(), orphans, "Items before the first timecode were ignored");
    }

    groups.sort_by_key(|(time, _)| *time);
    groups
}

/// Entity mentions as `(type, text)` pairs
pub fn parse_mentions(content: &str) -> TimedGroups<(String, String)> {
    parse_groups(content, MarkupKind::Mention, |attrs| {
        Some((attrs.get("tipo")?.clone(), attrs.get("texto")?.clone()))
    })
}

/// Proposal summaries
pub fn parse_proposals(content: &str) -> TimedGroups<String> {
    parse_groups(content, MarkupKind::Proposal, |attrs| attrs.get("resumen").cloned())
}

/// Fact-checkable statements
pub fn parse_claims(content: &str) -> TimedGroups<String> {
    parse_groups(content, MarkupKind::Claim, |attrs| attrs.get("afirmacion").cloned())
}

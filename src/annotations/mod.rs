//! Annotation text formats.
//!
//! - markup: time-indexed `<TAG attr="value">` annotation files
//! - fragment: single-line elements returned by the classifier

pub mod fragment;
pub mod markup;

pub use fragment::{decode_entities, escape, parse_fragment, Fragment, FragmentError};
pub use markup::{
    leading_timecode, parse_attributes, parse_claims, parse_intervals, parse_mentions,
    parse_proposals, IntervalList, MarkupKind, TimedGroups,
};

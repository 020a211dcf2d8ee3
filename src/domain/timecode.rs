//! Timecodes recovered from transcripts and annotation files.
//!
//! Sources write the same instant in different shapes (`MM:SS.fff` in
//! annotation markup, `HH:MM:SS.ffffff` in segment tables). Every value is
//! normalized to whole microseconds so that equal instants are equal values,
//! whichever file they were recovered from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MICROS_PER_SECOND: u64 = 1_000_000;

/// Errors raised while parsing a timecode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimecodeError {
    #[error("Invalid timecode shape: {0:?} (expected HH:MM:SS.ffffff or MM:SS.ffffff)")]
    Shape(String),

    #[error("Invalid timecode field {field} in {input:?}")]
    Field { field: &'static str, input: String },

    #[error("Timecode field {field} out of range in {input:?}")]
    OutOfRange { field: &'static str, input: String },
}

/// An instant on the debate timeline, in microseconds from the start
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Build from fractional seconds, rounded to the nearest microsecond.
    /// Negative and non-finite inputs clamp to zero.
    pub fn from_secs_f64(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Self::ZERO;
        }
        Self((seconds * MICROS_PER_SECOND as f64).round() as u64)
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    /// Seconds with fractional microseconds
    pub fn as_secs_f64(&self) -> f64 {
        let whole = self.0 / MICROS_PER_SECOND;
        let micros = self.0 % MICROS_PER_SECOND;
        whole as f64 + micros as f64 / 1e6
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.0 / MICROS_PER_SECOND;
        let micros = self.0 % MICROS_PER_SECOND;
        write!(
            f,
            "{:02}:{:02}:{:02}.{:06}",
            total_secs / 3600,
            (total_secs / 60) % 60,
            total_secs % 60,
            micros
        )
    }
}

impl FromStr for Timestamp {
    type Err = TimecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_timecode(s)
    }
}

/// Parse `HH:MM:SS.ffffff` or `MM:SS.ffffff` into a [`Timestamp`].
///
/// The fraction takes one to six digits and is read as a decimal fraction
/// of a second (`.5` is half a second). Hours stay below 24 and minutes and
/// seconds below 60.
pub fn parse_timecode(input: &str) -> Result<Timestamp, TimecodeError> {
    let text = input.trim();
    let parts: Vec<&str> = text.split(':').collect();

    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => (None, *m, *s),
        [h, m, s] => (Some(*h), *m, *s),
        _ => return Err(TimecodeError::Shape(input.to_string())),
    };

    let (whole_seconds, fraction) = seconds
        .split_once('.')
        .ok_or_else(|| TimecodeError::Shape(input.to_string()))?;

    let hours = match hours {
        Some(h) => parse_field(h, "hours", input)?,
        None => 0,
    };
    let minutes = parse_field(minutes, "minutes", input)?;
    let whole_seconds = parse_field(whole_seconds, "seconds", input)?;
    let micros = parse_fraction(fraction, input)?;

    if hours >= 24 {
        return Err(out_of_range("hours", input));
    }
    if minutes >= 60 {
        return Err(out_of_range("minutes", input));
    }
    if whole_seconds >= 60 {
        return Err(out_of_range("seconds", input));
    }

    let total_secs = hours * 3600 + minutes * 60 + whole_seconds;
    Ok(Timestamp(total_secs * MICROS_PER_SECOND + micros))
}

fn parse_field(field: &str, name: &'static str, input: &str) -> Result<u64, TimecodeError> {
    if field.is_empty() || field.len() > 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimecodeError::Field {
            field: name,
            input: input.to_string(),
        });
    }
    field.parse().map_err(|_| TimecodeError::Field {
        field: name,
        input: input.to_string(),
    })
}

fn parse_fraction(fraction: &str, input: &str) -> Result<u64, TimecodeError> {
    if fraction.is_empty() || fraction.len() > 6 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimecodeError::Field {
            field: "fraction",
            input: input.to_string(),
        });
    }

    // Right-pad to six digits: ".5" is 500000 microseconds
    let padded = format!("{:0<6}", fraction);
    padded.parse().map_err(|_| TimecodeError::Field {
        field: "fraction",
        input: input.to_string(),
    })
}

fn out_of_range(field: &'static str, input: &str) -> TimecodeError {
    TimecodeError::OutOfRange {
        field,
        input: input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minutes_form() {
        let ts = parse_timecode("01:02.500").unwrap();
        assert_eq!(ts.as_micros(), 62_500_000);
        assert_eq!(ts.as_secs_f64(), 62.5);
    }

    #[test]
    fn test_parse_hours_form() {
        let ts = parse_timecode("01:00:00.000001").unwrap();
        assert_eq!(ts.as_micros(), 3_600_000_001);
    }

    #[test]
    fn test_independent_formats_compare_equal() {
        let short = parse_timecode("01:02.500").unwrap();
        let long = parse_timecode("00:01:02.500000").unwrap();
        assert_eq!(short, long);
        assert_eq!(short.as_secs_f64().to_bits(), long.as_secs_f64().to_bits());
    }

    #[test]
    fn test_fraction_is_decimal() {
        assert_eq!(parse_timecode("00:01.5").unwrap().as_micros(), 1_500_000);
        assert_eq!(parse_timecode("00:01.050").unwrap().as_micros(), 1_050_000);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(matches!(parse_timecode("12"), Err(TimecodeError::Shape(_))));
        assert!(matches!(parse_timecode("12:34"), Err(TimecodeError::Shape(_))));
        assert!(matches!(parse_timecode("1:2:3:4.0"), Err(TimecodeError::Shape(_))));
        assert!(parse_timecode("aa:00.000").is_err());
        assert!(parse_timecode("00:00.1234567").is_err());
        assert!(parse_timecode("00:00.").is_err());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            parse_timecode("00:61.000"),
            Err(TimecodeError::OutOfRange { field: "seconds", .. })
        ));
        assert!(matches!(
            parse_timecode("24:00:00.000"),
            Err(TimecodeError::OutOfRange { field: "hours", .. })
        ));
    }

    #[test]
    fn test_display_round_trips() {
        let ts = parse_timecode("1:02:03.04").unwrap();
        assert_eq!(ts.to_string(), "01:02:03.040000");
        assert_eq!(ts.to_string().parse::<Timestamp>().unwrap(), ts);
    }

    #[test]
    fn test_from_secs_f64() {
        assert_eq!(Timestamp::from_secs_f64(119.9).as_micros(), 119_900_000);
        assert_eq!(Timestamp::from_secs_f64(-3.0), Timestamp::ZERO);
        assert_eq!(Timestamp::from_secs_f64(f64::NAN), Timestamp::ZERO);
    }
}

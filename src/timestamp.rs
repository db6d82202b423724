//! Millisecond-exact timestamp formatting and parsing.
//!
//! This is the single most error-prone primitive in subtitle handling, so it
//! lives in one place and both the exporter and the parsers go through it.
//!
//! Rounding policy: we round to the nearest millisecond (never truncate), and
//! a format → parse → format round trip is the identity for any value that is
//! already millisecond-aligned. Hours are zero-padded to two digits but may
//! exceed 24 without wrapping.

use crate::error::{Error, Result};

/// Separator between seconds and milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MillisSeparator {
    /// `HH:MM:SS,mmm` — SRT convention.
    Comma,
    /// `HH:MM:SS.mmm` — WebVTT and display convention.
    Dot,
}

impl MillisSeparator {
    fn as_char(self) -> char {
        match self {
            Self::Comma => ',',
            Self::Dot => '.',
        }
    }
}

/// Format seconds as `HH:MM:SS?mmm` with the given millisecond separator.
pub fn format_timestamp(seconds: f64, separator: MillisSeparator) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;

    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;

    let s = total_s % 60;
    let total_m = total_s / 60;

    let m = total_m % 60;
    let h = total_m / 60;

    let sep = separator.as_char();
    format!("{h:02}:{m:02}:{s:02}{sep}{ms:03}")
}

/// Parse `HH:MM:SS,mmm` or `HH:MM:SS.mmm` back into seconds.
///
/// Accepts either separator regardless of source format so SRT and VTT
/// parsing share one code path. Minutes and seconds must be < 60; hours are
/// unbounded (long recordings are real).
pub fn parse_timestamp(value: &str) -> Result<f64> {
    let value = value.trim();
    let (hms, millis) = value
        .split_once([',', '.'])
        .ok_or_else(|| Error::parse(format!("timestamp '{value}' has no millisecond part")))?;

    let mut parts = hms.split(':');
    let (h, m, s) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(m), Some(s), None) => (h, m, s),
        _ => {
            return Err(Error::parse(format!(
                "timestamp '{value}' does not have three HH:MM:SS fields"
            )));
        }
    };

    let hours: u64 = parse_field(h, "hours", value)?;
    let minutes: u64 = parse_field(m, "minutes", value)?;
    let seconds: u64 = parse_field(s, "seconds", value)?;
    if minutes >= 60 || seconds >= 60 {
        return Err(Error::parse(format!(
            "timestamp '{value}' has out-of-range minutes or seconds"
        )));
    }

    if millis.len() != 3 {
        return Err(Error::parse(format!(
            "timestamp '{value}' must carry exactly 3 millisecond digits"
        )));
    }
    let ms: u64 = parse_field(millis, "milliseconds", value)?;

    let total_ms = ((hours * 60 + minutes) * 60 + seconds) * 1000 + ms;
    Ok(total_ms as f64 / 1000.0)
}

fn parse_field(raw: &str, what: &str, original: &str) -> Result<u64> {
    raw.parse::<u64>()
        .map_err(|_| Error::parse(format!("timestamp '{original}' has non-numeric {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_zero() {
        assert_eq!(format_timestamp(0.0, MillisSeparator::Dot), "00:00:00.000");
        assert_eq!(
            format_timestamp(0.0, MillisSeparator::Comma),
            "00:00:00,000"
        );
    }

    #[test]
    fn rounds_to_nearest_millisecond() {
        assert_eq!(
            format_timestamp(0.0004, MillisSeparator::Dot),
            "00:00:00.000"
        );
        assert_eq!(
            format_timestamp(0.0006, MillisSeparator::Dot),
            "00:00:00.001"
        );
        assert_eq!(
            format_timestamp(1.9995, MillisSeparator::Dot),
            "00:00:02.000"
        );
    }

    #[test]
    fn hours_exceed_24_without_wrapping() {
        assert_eq!(
            format_timestamp(90_000.5, MillisSeparator::Comma),
            "25:00:00,500"
        );
    }

    #[test]
    fn parses_both_separators() {
        assert_eq!(parse_timestamp("00:00:05,500").unwrap(), 5.5);
        assert_eq!(parse_timestamp("00:00:05.500").unwrap(), 5.5);
        assert_eq!(parse_timestamp("01:02:03.004").unwrap(), 3723.004);
    }

    #[test]
    fn format_parse_format_is_identity() {
        for &value in &[0.0, 0.001, 5.5, 59.999, 61.2, 3599.001, 90_000.5] {
            for sep in [MillisSeparator::Comma, MillisSeparator::Dot] {
                let formatted = format_timestamp(value, sep);
                let parsed = parse_timestamp(&formatted).unwrap();
                assert_eq!(format_timestamp(parsed, sep), formatted);
                assert_eq!(parsed, value);
            }
        }
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "5.5", "00:00:05", "00:61:00,000", "00:00:60,000",
                    "aa:00:00,000", "00:00:00,12", "00:00:00,1234"] {
            assert!(parse_timestamp(bad).is_err(), "expected parse failure for '{bad}'");
        }
    }
}

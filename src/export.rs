//! Transcript serialization into the five interchange formats.
//!
//! Every formatter here is a pure function of the transcript: no I/O, no
//! hidden state, byte-identical output for identical input. Callers persist
//! or transmit [`Export::content`] unchanged; nothing in this module touches
//! storage.
//!
//! An empty transcript is a valid input for every format and produces
//! well-formed, empty-body output (e.g. `WEBVTT\n\n` for VTT) rather than an
//! error.

use std::fmt::Write as _;

use serde::Serialize;

use crate::export_format::ExportFormat;
use crate::segments::{Segment, Transcript};
use crate::timestamp::{MillisSeparator, format_timestamp};

/// Result of exporting a transcript: the serialized content and the MIME
/// type callers should attach when transmitting it.
#[derive(Debug, Clone, Serialize)]
pub struct Export {
    pub content: String,
    pub mime_type: &'static str,
}

/// Serialize a transcript in the requested format.
///
/// Dispatch is a single exhaustive match so adding a format is a localized,
/// compiler-checked change.
pub fn export(transcript: &Transcript, format: ExportFormat) -> Export {
    let content = match format {
        ExportFormat::Txt => format_txt(transcript),
        ExportFormat::Srt => format_srt(transcript),
        ExportFormat::Vtt => format_vtt(transcript),
        ExportFormat::Json => format_json(transcript),
        ExportFormat::Tsv => format_tsv(transcript),
    };

    Export {
        content,
        mime_type: format.mime_type(),
    }
}

fn format_txt(transcript: &Transcript) -> String {
    let mut out = transcript.full_text();
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn format_srt(transcript: &Transcript) -> String {
    let mut out = String::new();
    // 1-based cue indices; every segment is emitted so index continuity is
    // preserved for downstream subtitle players.
    for (i, segment) in transcript.segments().iter().enumerate() {
        let start = format_timestamp(segment.start_seconds(), MillisSeparator::Comma);
        let end = format_timestamp(segment.end_seconds(), MillisSeparator::Comma);
        let _ = writeln!(out, "{}", i + 1);
        let _ = writeln!(out, "{start} --> {end}");
        let _ = writeln!(out, "{}", segment.text());
        out.push('\n');
    }
    out
}

fn format_vtt(transcript: &Transcript) -> String {
    // WebVTT files begin with a mandatory header line followed by a blank line.
    let mut out = String::from("WEBVTT\n\n");
    for segment in transcript.segments() {
        let start = format_timestamp(segment.start_seconds(), MillisSeparator::Dot);
        let end = format_timestamp(segment.end_seconds(), MillisSeparator::Dot);
        let _ = writeln!(out, "{start} --> {end}");
        let _ = writeln!(out, "{}", segment.text());
        out.push('\n');
    }
    out
}

/// JSON view with display-format timestamps so exported files stay
/// self-describing (raw float seconds are easy to misread in a text editor).
#[derive(Serialize)]
struct JsonDocument<'a> {
    text: String,
    segments: Vec<JsonSegment<'a>>,
}

#[derive(Serialize)]
struct JsonSegment<'a> {
    start: String,
    end: String,
    text: &'a str,
}

fn format_json(transcript: &Transcript) -> String {
    let document = JsonDocument {
        text: transcript.full_text(),
        segments: transcript.segments().iter().map(json_segment).collect(),
    };

    // Serialization of this shape cannot fail: no maps with non-string keys,
    // no fallible Serialize impls.
    serde_json::to_string_pretty(&document).unwrap_or_default()
}

fn json_segment(segment: &Segment) -> JsonSegment<'_> {
    JsonSegment {
        start: format_timestamp(segment.start_seconds(), MillisSeparator::Dot),
        end: format_timestamp(segment.end_seconds(), MillisSeparator::Dot),
        text: segment.text(),
    }
}

/// TSV header row. The parser requires it verbatim.
pub(crate) const TSV_HEADER: &str = "start\tend\ttext";

fn format_tsv(transcript: &Transcript) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{TSV_HEADER}");
    // Plain seconds with exactly 3 fractional digits: one representation for
    // every row, millisecond precision, trivially machine-readable.
    for segment in transcript.segments() {
        let _ = writeln!(
            out,
            "{:.3}\t{:.3}\t{}",
            segment.start_seconds(),
            segment.end_seconds(),
            segment.text()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::Segment;

    fn transcript(entries: &[(f64, f64, &str)]) -> Transcript {
        let segments = entries
            .iter()
            .map(|&(start, end, text)| Segment::new(start, end, text).unwrap())
            .collect();
        Transcript::new(segments).unwrap()
    }

    #[test]
    fn txt_is_full_text_with_trailing_newline() {
        let t = transcript(&[(0.0, 1.0, "hello"), (1.0, 2.0, "world")]);
        let out = export(&t, ExportFormat::Txt);
        assert_eq!(out.content, "hello\nworld\n");
        assert_eq!(out.mime_type, "text/plain");
    }

    #[test]
    fn srt_formats_farsi_segment_exactly() {
        let t = transcript(&[(0.0, 5.5, "سلام دنیا")]);
        let out = export(&t, ExportFormat::Srt);
        assert_eq!(out.content, "1\n00:00:00,000 --> 00:00:05,500\nسلام دنیا\n\n");
    }

    #[test]
    fn srt_indices_are_sequential_and_one_based() {
        let t = transcript(&[(0.0, 1.0, "a"), (1.0, 2.0, "b"), (2.0, 3.0, "c")]);
        let content = export(&t, ExportFormat::Srt).content;
        assert!(content.starts_with("1\n"));
        assert!(content.contains("\n\n2\n"));
        assert!(content.contains("\n\n3\n"));
    }

    #[test]
    fn vtt_has_header_and_dot_separator() {
        let t = transcript(&[(0.0, 1.2345, "hello")]);
        let content = export(&t, ExportFormat::Vtt).content;
        assert_eq!(content, "WEBVTT\n\n00:00:00.000 --> 00:00:01.235\nhello\n\n");
    }

    #[test]
    fn json_carries_display_timestamps() {
        let t = transcript(&[(0.0, 5.5, "سلام دنیا")]);
        let out = export(&t, ExportFormat::Json);
        assert_eq!(out.mime_type, "application/json");

        let parsed: serde_json::Value = serde_json::from_str(&out.content).unwrap();
        assert_eq!(parsed["text"], "سلام دنیا");
        assert_eq!(parsed["segments"][0]["start"], "00:00:00.000");
        assert_eq!(parsed["segments"][0]["end"], "00:00:05.500");
    }

    #[test]
    fn tsv_has_header_and_three_decimal_seconds() {
        let t = transcript(&[(0.0, 5.5, "hello"), (5.5, 61.25, "world")]);
        let content = export(&t, ExportFormat::Tsv).content;
        assert_eq!(
            content,
            "start\tend\ttext\n0.000\t5.500\thello\n5.500\t61.250\tworld\n"
        );
    }

    #[test]
    fn empty_transcript_is_well_formed_for_every_format() {
        let t = Transcript::empty();
        assert_eq!(export(&t, ExportFormat::Txt).content, "");
        assert_eq!(export(&t, ExportFormat::Srt).content, "");
        assert_eq!(export(&t, ExportFormat::Vtt).content, "WEBVTT\n\n");
        assert_eq!(export(&t, ExportFormat::Tsv).content, "start\tend\ttext\n");

        let parsed: serde_json::Value =
            serde_json::from_str(&export(&t, ExportFormat::Json).content).unwrap();
        assert_eq!(parsed["text"], "");
        assert_eq!(parsed["segments"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn export_is_deterministic() {
        let t = transcript(&[(0.0, 1.5, "a"), (2.0, 3.25, "b")]);
        for format in ExportFormat::ALL {
            let first = export(&t, format);
            let second = export(&t, format);
            assert_eq!(first.content, second.content, "{format} must be idempotent");
        }
    }
}

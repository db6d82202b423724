//! Parsers that read exported transcripts back into [`Transcript`] values.
//!
//! TXT is intentionally absent: it carries no timestamps and cannot be
//! re-imported losslessly. The other four formats round-trip: parsing an
//! exporter's output reproduces the original transcript at millisecond
//! precision.
//!
//! Parsers are strict about structure (headers, timing lines, field counts)
//! but lenient about CRLF line endings and runs of blank lines, since files
//! coming back from editors and subtitle tools rarely stay byte-pristine.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::export::TSV_HEADER;
use crate::export_format::ExportFormat;
use crate::segments::{Segment, Transcript};
use crate::timestamp::parse_timestamp;

/// Parse serialized transcript content in the given format.
///
/// Fails with [`Error::Validation`] for [`ExportFormat::Txt`]; the other
/// variants dispatch to their dedicated parser.
pub fn parse(content: &str, format: ExportFormat) -> Result<Transcript> {
    match format {
        ExportFormat::Txt => Err(Error::validation(
            "txt carries no timestamps and cannot be parsed back into a transcript",
        )),
        ExportFormat::Srt => parse_srt(content),
        ExportFormat::Vtt => parse_vtt(content),
        ExportFormat::Json => parse_json(content),
        ExportFormat::Tsv => parse_tsv(content),
    }
}

/// Parse SubRip content: indexed cue blocks separated by blank lines.
pub fn parse_srt(content: &str) -> Result<Transcript> {
    let mut segments = Vec::new();
    for block in cue_blocks(content) {
        let mut lines = block.iter();

        let index_line = lines
            .next()
            .ok_or_else(|| Error::parse("SRT cue block was empty"))?;
        index_line
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::parse(format!("SRT cue index '{index_line}' is not a number")))?;

        let timing = lines
            .next()
            .ok_or_else(|| Error::parse("SRT cue is missing its timing line"))?;
        let (start, end) = parse_timing_line(timing)?;

        segments.push(cue_segment(start, end, lines.as_slice())?);
    }
    Transcript::new(segments)
}

/// Parse WebVTT content: a `WEBVTT` header followed by cue blocks.
pub fn parse_vtt(content: &str) -> Result<Transcript> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = content
        .strip_prefix("WEBVTT")
        .ok_or_else(|| Error::parse("VTT content does not start with a WEBVTT header"))?;

    let mut segments = Vec::new();
    for block in cue_blocks(rest) {
        let mut lines = block.iter();
        let mut first = lines
            .next()
            .ok_or_else(|| Error::parse("VTT cue block was empty"))?;

        // Cues may carry an optional identifier line before the timing line.
        let mut text_lines = lines.as_slice();
        if !first.contains("-->") {
            first = lines
                .next()
                .ok_or_else(|| Error::parse(format!("VTT cue '{first}' has no timing line")))?;
            text_lines = lines.as_slice();
        }
        let (start, end) = parse_timing_line(first)?;

        segments.push(cue_segment(start, end, text_lines)?);
    }
    Transcript::new(segments)
}

#[derive(Deserialize)]
struct JsonDocument {
    #[allow(dead_code)]
    text: String,
    segments: Vec<JsonSegment>,
}

#[derive(Deserialize)]
struct JsonSegment {
    start: String,
    end: String,
    text: String,
}

/// Parse the JSON export shape (`{"text": ..., "segments": [...]}`).
pub fn parse_json(content: &str) -> Result<Transcript> {
    let document: JsonDocument = serde_json::from_str(content)?;
    let mut segments = Vec::with_capacity(document.segments.len());
    for entry in document.segments {
        let start = parse_timestamp(&entry.start)?;
        let end = parse_timestamp(&entry.end)?;
        segments.push(Segment::new(start, end, entry.text)?);
    }
    Transcript::new(segments)
}

/// Parse TSV content with the exporter's `start\tend\ttext` header.
pub fn parse_tsv(content: &str) -> Result<Transcript> {
    let mut lines = content.lines();
    match lines.next() {
        Some(header) if header.trim_end_matches('\r') == TSV_HEADER => {}
        other => {
            return Err(Error::parse(format!(
                "TSV header must be '{}', got {:?}",
                TSV_HEADER.replace('\t', "\\t"),
                other.unwrap_or_default()
            )));
        }
    }

    let mut segments = Vec::new();
    for line in lines {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let mut fields = line.splitn(3, '\t');
        let (start, end, text) = match (fields.next(), fields.next(), fields.next()) {
            (Some(start), Some(end), Some(text)) => (start, end, text),
            _ => {
                return Err(Error::parse(format!(
                    "TSV row '{line}' does not have 3 tab-separated fields"
                )));
            }
        };
        let start = parse_seconds(start)?;
        let end = parse_seconds(end)?;
        segments.push(Segment::new(start, end, text)?);
    }
    Transcript::new(segments)
}

/// Split cue text into blank-line-separated blocks of trimmed lines.
fn cue_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn parse_timing_line(line: &str) -> Result<(f64, f64)> {
    let (start, end) = line
        .split_once("-->")
        .ok_or_else(|| Error::parse(format!("'{line}' is not a cue timing line")))?;
    Ok((parse_timestamp(start)?, parse_timestamp(end)?))
}

fn cue_segment(start: f64, end: f64, text_lines: &[&str]) -> Result<Segment> {
    if text_lines.is_empty() {
        return Err(Error::parse("cue has no text lines"));
    }
    Segment::new(start, end, text_lines.join("\n"))
}

fn parse_seconds(raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::parse(format!("'{raw}' is not a number of seconds")))
}

#[cfg(feature = "cli")]
use clap::ValueEnum;

use crate::error::{Error, Result};

/// The supported export formats for a finished transcript.
///
/// Why this exists:
/// - We want a single, strongly-typed representation of export formats
///   across the CLI, the queue, and library code.
/// - Using an enum avoids stringly-typed conditionals and makes adding a
///   format an exhaustive-checked, localized change.
///
/// Integration notes:
/// - `ValueEnum` allows this enum to be used directly as a CLI flag with `clap`.
/// - Each variant maps to one formatting function in [`crate::export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(ValueEnum))]
pub enum ExportFormat {
    /// Plain text, one segment per line, no timestamps.
    Txt,

    /// SubRip subtitles (indexed cues, comma millisecond separator).
    Srt,

    /// WebVTT subtitles (dot millisecond separator).
    Vtt,

    /// Structured JSON with display-format timestamps.
    Json,

    /// Tab-separated values with a header row.
    Tsv,
}

impl ExportFormat {
    /// Every supported format, in display order.
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Txt,
        ExportFormat::Srt,
        ExportFormat::Vtt,
        ExportFormat::Json,
        ExportFormat::Tsv,
    ];

    /// MIME type callers should attach when transmitting exported content.
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Txt => "text/plain",
            ExportFormat::Srt => "application/x-subrip",
            ExportFormat::Vtt => "text/vtt",
            ExportFormat::Json => "application/json",
            ExportFormat::Tsv => "text/tab-separated-values",
        }
    }

    /// Conventional file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Srt => "srt",
            ExportFormat::Vtt => "vtt",
            ExportFormat::Json => "json",
            ExportFormat::Tsv => "tsv",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "txt" => Ok(ExportFormat::Txt),
            "srt" => Ok(ExportFormat::Srt),
            "vtt" => Ok(ExportFormat::Vtt),
            "json" => Ok(ExportFormat::Json),
            "tsv" => Ok(ExportFormat::Tsv),
            other => Err(Error::validation(format!(
                "unknown export format '{other}' (expected txt, srt, vtt, json, or tsv)"
            ))),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

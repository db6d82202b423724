//! Segment and transcript value objects.
//!
//! Both types validate their invariants at construction and expose no
//! mutation afterwards, so every `Transcript` handed to the exporter or the
//! search engine is known-good by the time it exists.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One recognized utterance span.
///
/// Invariant: `0 <= start_seconds < end_seconds` and `text` is non-empty
/// after trimming. Enforced by [`Segment::new`]; fields are private so the
/// invariant cannot be broken after construction.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    start_seconds: f64,
    end_seconds: f64,
    text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    words: Vec<Word>,
}

// Deserialization routes through `Segment::new`/`with_words` so deserialized
// segments carry the same guarantees as constructed ones.
impl<'de> Deserialize<'de> for Segment {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            start_seconds: f64,
            end_seconds: f64,
            text: String,
            #[serde(default)]
            words: Vec<Word>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Segment::new(raw.start_seconds, raw.end_seconds, raw.text)
            .and_then(|segment| segment.with_words(raw.words))
            .map_err(serde::de::Error::custom)
    }
}

/// Word-level sub-token of a segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl Segment {
    /// Create a segment, validating the timing and text invariants.
    pub fn new(start_seconds: f64, end_seconds: f64, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if !start_seconds.is_finite() || !end_seconds.is_finite() {
            return Err(Error::validation("segment timestamps must be finite"));
        }
        if start_seconds < 0.0 {
            return Err(Error::validation(format!(
                "segment start must be non-negative, got {start_seconds}"
            )));
        }
        if start_seconds >= end_seconds {
            return Err(Error::validation(format!(
                "segment start must precede end ({start_seconds} >= {end_seconds})"
            )));
        }
        if text.trim().is_empty() {
            return Err(Error::validation("segment text must be non-empty"));
        }

        Ok(Self {
            start_seconds,
            end_seconds,
            text,
            words: Vec::new(),
        })
    }

    /// Attach word-level timing, validating containment and ordering.
    ///
    /// Each word interval must lie within the segment interval, and word
    /// intervals must be non-decreasing and non-overlapping.
    pub fn with_words(mut self, words: Vec<Word>) -> Result<Self> {
        let mut previous_end = self.start_seconds;
        for (i, word) in words.iter().enumerate() {
            if word.start_seconds < self.start_seconds - TIME_EPSILON
                || word.end_seconds > self.end_seconds + TIME_EPSILON
            {
                return Err(Error::validation(format!(
                    "word {i} [{:.3}, {:.3}] lies outside its segment [{:.3}, {:.3}]",
                    word.start_seconds, word.end_seconds, self.start_seconds, self.end_seconds
                )));
            }
            if word.start_seconds > word.end_seconds {
                return Err(Error::validation(format!(
                    "word {i} has start after end ({} > {})",
                    word.start_seconds, word.end_seconds
                )));
            }
            if word.start_seconds < previous_end - TIME_EPSILON {
                return Err(Error::validation(format!(
                    "word {i} overlaps the previous word (starts at {}, previous ends at {previous_end})",
                    word.start_seconds
                )));
            }
            previous_end = word.end_seconds;
        }
        self.words = words;
        Ok(self)
    }

    pub fn start_seconds(&self) -> f64 {
        self.start_seconds
    }

    pub fn end_seconds(&self) -> f64 {
        self.end_seconds
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    fn key(&self) -> (f64, f64, &str) {
        (self.start_seconds, self.end_seconds, &self.text)
    }
}

/// Word timings coming back from real engines jitter by a few microseconds
/// around segment edges; comparisons at the boundary tolerate that.
const TIME_EPSILON: f64 = 1e-6;

// Equality and ordering are defined by (start, end, text); word-level detail
// is ignored deliberately so round-tripped transcripts compare equal even
// through formats that cannot carry words.
impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Segment {}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        let (s1, e1, t1) = self.key();
        let (s2, e2, t2) = other.key();
        s1.total_cmp(&s2)
            .then_with(|| e1.total_cmp(&e2))
            .then_with(|| t1.cmp(t2))
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered, non-overlapping sequence of segments for one completed job.
///
/// May be empty (silent media is valid). Construction rejects any sequence
/// where `segments[i].end > segments[i+1].start`, naming the offending index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    segments: Vec<Segment>,
}

impl Transcript {
    /// Validate ordering/non-overlap and wrap the sequence.
    pub fn new(segments: Vec<Segment>) -> Result<Self> {
        for i in 1..segments.len() {
            if segments[i - 1].end_seconds > segments[i].start_seconds + TIME_EPSILON {
                return Err(Error::validation(format!(
                    "segment {i} starts at {:.3} before segment {} ends at {:.3}",
                    segments[i].start_seconds,
                    i - 1,
                    segments[i - 1].end_seconds
                )));
            }
        }
        Ok(Self { segments })
    }

    /// An empty transcript (silent or not-yet-transcribed media).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Segment texts joined by newlines.
    ///
    /// This is the display convention; TXT export uses the same joiner so the
    /// two never disagree.
    pub fn full_text(&self) -> String {
        let texts: Vec<&str> = self.segments.iter().map(|s| s.text.as_str()).collect();
        texts.join("\n")
    }
}

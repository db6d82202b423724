//! `farscribe` — transcript modelling, export, and job queueing for Farsi media.
//!
//! This crate provides:
//! - A validated segment/transcript model
//! - Pure export formatters (TXT, SRT, VTT, JSON, TSV) and matching parsers
//! - Case-insensitive search and highlighting over segments
//! - A file queue that serializes jobs through an external transcription engine
//!
//! Speech recognition itself is a collaborator behind the
//! [`engine::TranscriptionEngine`] trait; this crate owns everything around
//! it: validation, lifecycle, and format correctness. The library is designed
//! to be driven identically by a CLI, an HTTP handler, or a UI event loop.

// Segment and transcript data structures.
pub mod segments;

// Timestamp formatting/parsing shared by every format.
pub mod timestamp;

// Export format selection, serialization, and re-parsing.
pub mod export;
pub mod export_format;
pub mod import;

// Segment filtering and match highlighting.
pub mod search;

// Job queue and the engine/media boundaries it drives.
pub mod engine;
pub mod media;
pub mod queue;

// Crate-wide error type.
pub mod error;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

pub use crate::error::{Error, Result};
pub use crate::export::{Export, export};
pub use crate::export_format::ExportFormat;
pub use crate::queue::{FileQueueManager, JobId, JobSnapshot, JobState, QueueConfig};
pub use crate::segments::{Segment, Transcript, Word};

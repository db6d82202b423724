use thiserror::Error;

use crate::media::MediaRef;
use crate::segments::Segment;

/// Failure modes at the transcription-engine boundary.
///
/// The queue never lets these escape past the job that triggered them; a
/// failed engine call marks that job `Failed` and leaves every other job
/// (and the manager itself) untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("transcription model failed: {0}")]
    Model(String),

    #[error("transcription timed out")]
    Timeout,

    #[error("unsupported media format: {0}")]
    UnsupportedFormat(String),

    #[error("transcription cancelled")]
    Cancelled,
}

/// One request handed to the engine: the media to decode plus a language hint.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub media: MediaRef,
    /// Language hint (e.g. `"fa"`). `None` lets the engine auto-detect.
    pub language: Option<String>,
}

/// Best-effort progress sink passed into the engine.
///
/// Engines that expose no granular progress may simply never call it; the
/// queue forces progress to 100 on completion regardless.
pub type ProgressFn = dyn Fn(u8) + Send + Sync;

/// The external speech-recognition engine, treated as an opaque collaborator.
///
/// Implementations are expected to block (model inference is CPU/GPU bound),
/// so the queue always invokes them on a blocking worker thread. The returned
/// segments must be ordered by start time; the queue re-validates them before
/// attaching a transcript, so a misbehaving engine fails its job rather than
/// corrupting the queue.
pub trait TranscriptionEngine: Send + Sync {
    fn transcribe(
        &self,
        request: &EngineRequest,
        progress: &ProgressFn,
    ) -> std::result::Result<Vec<Segment>, EngineError>;
}

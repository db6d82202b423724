use thiserror::Error;

use crate::engine::EngineError;

/// Farscribe's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Farscribe's crate-wide error type.
///
/// The taxonomy is deliberately small:
/// - `Validation` covers malformed segments, transcripts, and job input. It is
///   always local to the offending call and never crashes the queue.
/// - `Engine` wraps transcription-engine failures; the queue converts these
///   into a job-level `Failed` state rather than letting them propagate.
/// - `Decode` covers unsupported or corrupt media, surfaced the same way.
/// - `Export` should be unreachable once transcript invariants are enforced
///   at construction; treat any occurrence as a programming-error signal.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("parse failed: {0}")]
    Parse(String),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

//! Media references and the supported-container preflight check.
//!
//! Actual demuxing/decoding is an external capability; the queue only needs
//! enough knowledge to reject obviously unsupported files before burning an
//! engine slot on them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Audio container extensions the transcription pipeline accepts.
pub const AUDIO_EXTENSIONS: [&str; 7] = ["mp3", "wav", "m4a", "flac", "ogg", "aac", "wma"];

/// Video container extensions the transcription pipeline accepts.
pub const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "mkv", "mov", "webm", "avi", "flv", "wmv"];

/// A reference to submitted media: either a path on disk or raw bytes that
/// were uploaded/dragged in. Bytes are shared, not copied, so cloning a job
/// snapshot stays cheap.
#[derive(Debug, Clone)]
pub enum MediaRef {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

impl MediaRef {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Fail fast for containers the pipeline cannot decode.
    ///
    /// Path references are checked by extension; byte references are passed
    /// through, since the engine probes those itself.
    pub(crate) fn preflight(&self) -> Result<()> {
        let MediaRef::Path(path) = self else {
            return Ok(());
        };
        if is_supported_container(path) {
            return Ok(());
        }
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("<none>");
        Err(Error::Decode(format!(
            "unsupported media container '.{extension}' for '{}'",
            path.display()
        )))
    }
}

/// Whether the file extension names a supported audio or video container.
pub fn is_supported_container(path: &Path) -> bool {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    let extension = extension.to_ascii_lowercase();
    AUDIO_EXTENSIONS.contains(&extension.as_str()) || VIDEO_EXTENSIONS.contains(&extension.as_str())
}

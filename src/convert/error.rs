use std::path::Path;

use thiserror::Error;

use super::format::Format;

/// Why a conversion did not produce a file.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The pair is not in the conversion matrix.
    #[error("unsupported conversion: {from} -> {to}")]
    Unsupported { from: Format, to: Format },

    /// The underlying decoder, encoder or external tool failed.
    #[error("{stage} failed: {message}")]
    Library { stage: &'static str, message: String },

    /// A video source has no audio stream to extract.
    #[error("source has no audio track")]
    NoAudioTrack,

    /// Temporary storage could not be written.
    #[error("temporary storage error: {0}")]
    Io(#[from] std::io::Error),

    /// A matrix pair has no routine. Only raised at startup.
    #[error("no conversion routine registered for {from} -> {to}")]
    MissingRoute { from: Format, to: Format },
}

/// Read a whole source file.
pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>, ConvertError> {
    std::fs::read(path).map_err(ConvertError::unreadable_input)
}

impl ConvertError {
    pub(crate) fn library(stage: &'static str, message: impl ToString) -> Self {
        Self::Library { stage, message: message.to_string() }
    }

    /// The source file could not be opened or read. `Io` is reserved for
    /// temporary storage.
    pub(crate) fn unreadable_input(err: std::io::Error) -> Self {
        Self::library("input read", err)
    }

    /// Short stable name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unsupported { .. } => "unsupported",
            Self::Library { .. } => "library",
            Self::NoAudioTrack => "no_audio_track",
            Self::Io(_) => "io",
            Self::MissingRoute { .. } => "missing_route",
        }
    }
}

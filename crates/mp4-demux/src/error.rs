//! Error types for mp4-demux.

use std::io;
use thiserror::Error;

/// Result type for mp4-demux operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for mp4-demux operations.
///
/// `FormatError`, `CodecUnsupported` and `Exception` are the three kinds
/// surfaced to callers through [`crate::sink::DemuxEvent::Error`]; the rest
/// are internal plumbing that gets folded into one of those three at the
/// box-walker/driver boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// A structural MP4 rule was violated: bad box size, wrong version,
    /// sample-count mismatch, malformed `avcC`, and similar.
    #[error("MP4: {0}")]
    FormatError(String),

    /// The `stsd` sample entry isn't `avc1`.
    #[error("codec unsupported: {0}")]
    CodecUnsupported(String),

    /// Propagated from the loader, or an unexpected failure.
    #[error("{0}")]
    Exception(String),

    /// I/O error occurred (demo CLI file reads; the core parser itself does
    /// no I/O).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Buffer too small for the requested read.
    #[error("buffer underflow: need {need} bytes, have {have}")]
    BufferUnderflow { need: usize, have: usize },
}

impl Error {
    /// Create a `FormatError` from a message.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::FormatError(msg.into())
    }

    /// Create a `CodecUnsupported` error from a message.
    pub fn codec_unsupported(msg: impl Into<String>) -> Self {
        Self::CodecUnsupported(msg.into())
    }

    /// Classify this error into the three kinds `onError` distinguishes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FormatError(_) => ErrorKind::FormatError,
            Self::CodecUnsupported(_) => ErrorKind::CodecUnsupported,
            Self::BufferUnderflow { .. } => ErrorKind::FormatError,
            Self::Io(_) | Self::Exception(_) => ErrorKind::Exception,
        }
    }
}

/// The three error kinds the demuxer's `onError` callback distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FormatError,
    CodecUnsupported,
    Exception,
}

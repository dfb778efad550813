//! Error types for seekable stream operations.

use thiserror::Error;

/// Result type alias for seekable stream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Seekable stream error types.
#[derive(Debug, Error)]
pub enum Error {
    /// On-disk structure is corrupted or invalid.
    #[error("corrupted data: {message}")]
    CorruptedData {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Frame checksum verification failed.
    #[error("checksum mismatch: expected 0x{expected:08x}, got 0x{actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Injected encoder or decoder failed.
    #[error("codec error: {source}")]
    Codec {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O error from the underlying source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sink accepted fewer bytes than offered.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// Read past the end of the decompressed stream.
    #[error("end of stream")]
    EndOfStream,

    /// Write attempted after the writer was closed.
    #[error("writer is closed")]
    WriterClosed,

    /// Read attempted after the reader was closed.
    #[error("reader is closed")]
    ReaderClosed,

    /// A single frame exceeds the 32-bit size the format can index.
    #[error("frame of {size} bytes exceeds the maximum frame size")]
    FrameTooLarge { size: usize },

    /// Seek target outside the decompressed stream bounds.
    #[error("invalid seek to {position} in stream of {length} bytes")]
    InvalidSeek { position: i64, length: u64 },

    /// Invalid configuration at construction.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    /// Create a corrupted data error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Error::CorruptedData {
            message: message.into(),
            source: None,
        }
    }

    /// Create a corrupted data error with offset context.
    pub fn corrupted_at(message: impl Into<String>, offset: u64) -> Self {
        Error::CorruptedData {
            message: format!("{} at offset {}", message.into(), offset),
            source: None,
        }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(expected: u32, actual: u32) -> Self {
        Error::ChecksumMismatch { expected, actual }
    }

    /// Wrap an injected codec failure.
    pub fn codec(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Codec {
            source: Box::new(source),
        }
    }

    /// Create a short write error.
    pub fn short_write(written: usize, expected: usize) -> Self {
        Error::ShortWrite { written, expected }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
        }
    }

    /// Check whether this error marks the end of the decompressed stream.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }

    /// Check whether this error means the stream bytes cannot be trusted.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::CorruptedData { .. } | Error::ChecksumMismatch { .. }
        )
    }

    /// Get error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::CorruptedData { .. } => "corrupted_data",
            Error::ChecksumMismatch { .. } => "checksum_mismatch",
            Error::Codec { .. } => "codec_error",
            Error::Io(_) => "io_error",
            Error::ShortWrite { .. } => "short_write",
            Error::EndOfStream => "end_of_stream",
            Error::WriterClosed => "writer_closed",
            Error::ReaderClosed => "reader_closed",
            Error::FrameTooLarge { .. } => "frame_too_large",
            Error::InvalidSeek { .. } => "invalid_seek",
            Error::InvalidConfig { .. } => "invalid_config",
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(io) => io,
            Error::EndOfStream => std::io::Error::new(std::io::ErrorKind::UnexpectedEof, err),
            Error::InvalidSeek { .. } => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
            }
            Error::CorruptedData { .. } | Error::ChecksumMismatch { .. } => {
                std::io::Error::new(std::io::ErrorKind::InvalidData, err)
            }
            other => std::io::Error::other(other),
        }
    }
}

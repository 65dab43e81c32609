//! Error types for the compressors.

use thiserror::Error;

/// An error returned by a [Compressor](crate::Compressor).
#[derive(Error, Debug)]
pub enum CompressorError {
    /// The compressor reached its target output size. This is a signal for the caller to close
    /// the channel rather than a failure.
    #[error("compressor is full")]
    Full,
    /// The compression stream was already closed.
    #[error("compressor is closed")]
    Closed,
    /// The target output size was zero.
    #[error("target output size must be non-zero")]
    ZeroTarget,
    /// The approximate compression ratio was outside of `(0, 1]`.
    #[error("approximate compression ratio must be in (0, 1], got {0}")]
    InvalidRatio(f64),
    /// The underlying compression stream failed.
    #[error("compression stream error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompressorError {
    /// Returns `true` if the error is the [CompressorError::Full] sentinel.
    pub const fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }
}

/// An error returned when decompressing a channel payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompressionError {
    /// The payload was empty.
    #[error("empty channel payload")]
    Empty,
    /// The first byte did not identify a supported compression algorithm.
    #[error("unsupported channel version byte: {0:#04x}")]
    UnsupportedVersion(u8),
    /// The zlib stream was malformed.
    #[error("zlib decompression failed: {0}")]
    Zlib(String),
    /// The brotli stream was malformed.
    #[error("brotli decompression failed: {0}")]
    Brotli(String),
    /// The decompressed payload exceeded the size limit.
    #[error("decompressed payload exceeds {0} bytes")]
    TooLarge(usize),
}

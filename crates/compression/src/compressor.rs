//! The [Compressor] dispatch type.

use crate::{
    CompressorConfig, CompressorError, CompressorKind, NonCompressor, RatioCompressor,
    ShadowCompressor,
};

/// A channel compressor, one of the supported fullness strategies.
#[derive(Debug)]
pub enum Compressor {
    /// See [RatioCompressor].
    Ratio(RatioCompressor),
    /// See [ShadowCompressor].
    Shadow(ShadowCompressor),
    /// See [NonCompressor].
    None(NonCompressor),
}

macro_rules! dispatch {
    ($self:ident, $inner:ident => $body:expr) => {
        match $self {
            Self::Ratio($inner) => $body,
            Self::Shadow($inner) => $body,
            Self::None($inner) => $body,
        }
    };
}

impl Compressor {
    /// Creates the compressor selected by [CompressorConfig::kind].
    pub fn new(config: CompressorConfig) -> Result<Self, CompressorError> {
        Ok(match config.kind {
            CompressorKind::Ratio => Self::Ratio(RatioCompressor::new(config)?),
            CompressorKind::Shadow => Self::Shadow(ShadowCompressor::new(config)?),
            CompressorKind::None => Self::None(NonCompressor::new(config)?),
        })
    }

    /// Compresses `data`. Returns [CompressorError::Full] when the input was refused because the
    /// compressor is full.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, CompressorError> {
        dispatch!(self, c => c.write(data))
    }

    /// Drains ready output into `buf`, returning the number of bytes copied.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        dispatch!(self, c => c.read(buf))
    }

    /// The number of output bytes ready to be read.
    pub fn len(&self) -> usize {
        dispatch!(self, c => c.len())
    }

    /// Returns `true` if no output is ready.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes pending input to the output.
    pub fn flush(&mut self) -> Result<(), CompressorError> {
        dispatch!(self, c => c.flush())
    }

    /// Finalizes the output. Must be called before reading out the tail of the stream.
    pub fn close(&mut self) -> Result<(), CompressorError> {
        dispatch!(self, c => c.close())
    }

    /// Clears all state, including the full flag.
    pub fn reset(&mut self) {
        dispatch!(self, c => c.reset())
    }

    /// Returns [CompressorError::Full] if the compressor is full.
    pub fn full_err(&self) -> Result<(), CompressorError> {
        dispatch!(self, c => c.full_err())
    }

    /// Returns `true` if the compressor is full.
    pub fn is_full(&self) -> bool {
        self.full_err().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decompress_channel, CompressionAlgo};

    #[test]
    fn test_dispatch_by_kind() {
        let base = CompressorConfig { target_output_size: 1_000, ..Default::default() };
        for kind in [CompressorKind::Ratio, CompressorKind::Shadow, CompressorKind::None] {
            let mut compressor = Compressor::new(CompressorConfig { kind, ..base }).unwrap();
            match (&compressor, kind) {
                (Compressor::Ratio(_), CompressorKind::Ratio) |
                (Compressor::Shadow(_), CompressorKind::Shadow) |
                (Compressor::None(_), CompressorKind::None) => {}
                _ => panic!("unexpected variant for {kind}"),
            }

            compressor.write(b"the quick brown fox").unwrap();
            assert!(!compressor.is_full());
            compressor.close().unwrap();
            let mut out = vec![0u8; compressor.len()];
            assert_eq!(compressor.read(&mut out), out.len());
            assert!(compressor.is_empty());
            assert_eq!(decompress_channel(&out, 1024).unwrap(), b"the quick brown fox");
        }
    }

    #[test]
    fn test_brotli_none_is_stored_zlib() {
        let config = CompressorConfig {
            target_output_size: 1_000,
            kind: CompressorKind::None,
            algo: CompressionAlgo::Brotli10,
            ..Default::default()
        };
        let mut compressor = Compressor::new(config).unwrap();
        compressor.write(&[7u8; 10]).unwrap();
        compressor.close().unwrap();
        let mut out = vec![0u8; compressor.len()];
        compressor.read(&mut out);
        assert_eq!(out[0] & 0x0F, crate::ZLIB_DEFLATE_COMPRESSION_METHOD);
    }

    #[test]
    fn test_zero_target_rejected() {
        assert!(matches!(
            Compressor::new(CompressorConfig::default()),
            Err(CompressorError::ZeroTarget)
        ));
    }
}

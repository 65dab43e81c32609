//! A compressor that does not compress.

use crate::{
    stream::{CompressionStream, StreamLevel},
    CompressorConfig, CompressorError,
};

/// Wraps the input in a zlib stream with compression disabled, flushing after every write.
///
/// Full once the produced output reaches the target output size.
#[derive(Debug)]
pub struct NonCompressor {
    config: CompressorConfig,
    stream: CompressionStream,
}

impl NonCompressor {
    /// Creates a new [NonCompressor].
    pub fn new(config: CompressorConfig) -> Result<Self, CompressorError> {
        if config.target_output_size == 0 {
            return Err(CompressorError::ZeroTarget);
        }
        Ok(Self { config, stream: CompressionStream::new(config.algo, StreamLevel::Stored) })
    }

    /// Writes and flushes `data`.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, CompressorError> {
        self.full_err()?;
        self.stream.write(data)?;
        self.stream.flush()?;
        Ok(data.len())
    }

    /// Drains ready output into `buf`.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        self.stream.read(buf)
    }

    /// The number of output bytes ready to be read.
    pub fn len(&self) -> usize {
        self.stream.ready_len()
    }

    /// Returns `true` if no output is ready.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes pending input.
    pub fn flush(&mut self) -> Result<(), CompressorError> {
        self.stream.flush()
    }

    /// Finalizes the output.
    pub fn close(&mut self) -> Result<(), CompressorError> {
        self.stream.close()
    }

    /// Clears all state.
    pub fn reset(&mut self) {
        self.stream.reset();
    }

    /// Returns [CompressorError::Full] once the produced output reaches the target.
    pub fn full_err(&self) -> Result<(), CompressorError> {
        if self.stream.total_len() as u64 >= self.config.target_output_size {
            return Err(CompressorError::Full);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompressionAlgo, CompressorKind};

    #[test]
    fn test_output_tracks_input() {
        let config = CompressorConfig {
            target_output_size: 1000,
            approx_compr_ratio: 1.0,
            kind: CompressorKind::None,
            algo: CompressionAlgo::Zlib,
        };
        let mut compressor = NonCompressor::new(config).unwrap();
        compressor.write(&[0u8; 600]).unwrap();
        // Every write is flushed, so the stored bytes are readable right away.
        assert!(compressor.len() >= 600);
        assert!(compressor.full_err().is_ok());

        compressor.write(&[0u8; 600]).unwrap();
        assert!(compressor.full_err().unwrap_err().is_full());
        assert!(compressor.write(&[0u8; 1]).unwrap_err().is_full());
    }
}

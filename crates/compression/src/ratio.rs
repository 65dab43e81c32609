//! The ratio compressor.

use crate::{
    stream::{CompressionStream, StreamLevel},
    CompressorConfig, CompressorError,
};

/// A compressor that estimates its output from the configured compression ratio.
///
/// The compressor is full once the raw input reaches `target_output_size / approx_compr_ratio`.
/// It never flushes, so the estimate is cheap but imprecise.
#[derive(Debug)]
pub struct RatioCompressor {
    config: CompressorConfig,
    stream: CompressionStream,
    input_bytes: u64,
}

impl RatioCompressor {
    /// Creates a new [RatioCompressor].
    pub fn new(config: CompressorConfig) -> Result<Self, CompressorError> {
        if config.target_output_size == 0 {
            return Err(CompressorError::ZeroTarget);
        }
        if !(config.approx_compr_ratio > 0.0 && config.approx_compr_ratio <= 1.0) {
            return Err(CompressorError::InvalidRatio(config.approx_compr_ratio));
        }
        Ok(Self {
            config,
            stream: CompressionStream::new(config.algo, StreamLevel::Best),
            input_bytes: 0,
        })
    }

    /// The raw input size at which the compressor becomes full.
    pub fn input_threshold(&self) -> u64 {
        (self.config.target_output_size as f64 / self.config.approx_compr_ratio) as u64
    }

    /// Compresses `data`. Fails with [CompressorError::Full] if a prior write filled the
    /// compressor.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, CompressorError> {
        self.full_err()?;
        self.input_bytes += data.len() as u64;
        self.stream.write(data)?;
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

    /// Flushes pending input to the output.
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
        self.input_bytes = 0;
    }

    /// Returns [CompressorError::Full] once the input threshold is reached.
    pub fn full_err(&self) -> Result<(), CompressorError> {
        if self.input_bytes >= self.input_threshold() {
            return Err(CompressorError::Full);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompressionAlgo, CompressorKind};

    fn config(target: u64, ratio: f64) -> CompressorConfig {
        CompressorConfig {
            target_output_size: target,
            approx_compr_ratio: ratio,
            kind: CompressorKind::Ratio,
            algo: CompressionAlgo::Zlib,
        }
    }

    #[test]
    fn test_input_threshold() {
        let compressor = RatioCompressor::new(config(1000, 0.4)).unwrap();
        assert_eq!(compressor.input_threshold(), 2500);
        let compressor = RatioCompressor::new(config(1000, 1.0)).unwrap();
        assert_eq!(compressor.input_threshold(), 1000);
    }

    #[test]
    fn test_full_after_threshold() {
        let mut compressor = RatioCompressor::new(config(100, 0.5)).unwrap();
        assert_eq!(compressor.write(&[1; 150]).unwrap(), 150);
        assert!(compressor.full_err().is_ok());
        // The write that crosses the threshold is still accepted.
        compressor.write(&[2; 100]).unwrap();
        assert!(compressor.full_err().unwrap_err().is_full());
        assert!(compressor.write(&[3]).unwrap_err().is_full());

        compressor.reset();
        assert!(compressor.full_err().is_ok());
        assert!(compressor.is_empty());
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(RatioCompressor::new(config(0, 0.5)), Err(CompressorError::ZeroTarget)));
        assert!(matches!(
            RatioCompressor::new(config(10, 0.0)),
            Err(CompressorError::InvalidRatio(_))
        ));
        assert!(matches!(
            RatioCompressor::new(config(10, 1.5)),
            Err(CompressorError::InvalidRatio(_))
        ));
    }
}

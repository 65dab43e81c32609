//! The shadow compressor.

use crate::{
    stream::{CompressionStream, StreamLevel},
    CompressorConfig, CompressorError, SAFE_COMPRESSION_OVERHEAD,
};
use tracing::trace;

/// A compressor that writes every input to two streams.
///
/// The primary stream is never flushed before close, so it compresses as well as possible. The
/// shadow stream receives the same input and is flushed whenever the running size estimate
/// crosses the target. The flushed shadow length plus the algorithm's close overhead is an upper
/// bound on the primary stream's final size.
///
/// The first write is always accepted, even when it alone exceeds the target, so that oversized
/// batches can still be split across frames.
#[derive(Debug)]
pub struct ShadowCompressor {
    config: CompressorConfig,
    compressor: CompressionStream,
    shadow: CompressionStream,
    bound: u64,
    input_bytes: u64,
    full: bool,
}

impl ShadowCompressor {
    /// Creates a new [ShadowCompressor].
    pub fn new(config: CompressorConfig) -> Result<Self, CompressorError> {
        if config.target_output_size == 0 {
            return Err(CompressorError::ZeroTarget);
        }
        Ok(Self {
            config,
            compressor: CompressionStream::new(config.algo, StreamLevel::Best),
            shadow: CompressionStream::new(config.algo, StreamLevel::Best),
            bound: SAFE_COMPRESSION_OVERHEAD,
            input_bytes: 0,
            full: false,
        })
    }

    /// The current upper bound on the closed output size.
    pub const fn bound(&self) -> u64 {
        self.bound
    }

    /// Compresses `data`.
    ///
    /// Fails with [CompressorError::Full] if a prior write filled the compressor, or if this write
    /// would overflow the target and something was already written.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, CompressorError> {
        self.full_err()?;
        self.shadow.write(data)?;

        let target = self.config.target_output_size;
        let mut new_bound = self.bound + data.len() as u64;
        if new_bound > target {
            self.shadow.flush()?;
            new_bound = self.shadow.total_len() as u64 + self.config.algo.close_overhead();
            trace!(
                target: "compressor",
                "Flushed shadow stream, bound {} -> {new_bound} (target {target})",
                self.bound
            );
            if new_bound > target {
                self.full = true;
                if self.input_bytes > 0 {
                    return Err(CompressorError::Full);
                }
            }
        }

        self.bound = new_bound;
        self.input_bytes += data.len() as u64;
        self.compressor.write(data)?;
        Ok(data.len())
    }

    /// Drains ready output of the primary stream into `buf`.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        self.compressor.read(buf)
    }

    /// The number of primary output bytes ready to be read.
    pub fn len(&self) -> usize {
        self.compressor.ready_len()
    }

    /// Returns `true` if no output is ready.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes the primary stream.
    pub fn flush(&mut self) -> Result<(), CompressorError> {
        self.compressor.flush()
    }

    /// Finalizes the primary stream.
    pub fn close(&mut self) -> Result<(), CompressorError> {
        self.compressor.close()
    }

    /// Clears both streams and the full flag.
    pub fn reset(&mut self) {
        self.compressor.reset();
        self.shadow.reset();
        self.bound = SAFE_COMPRESSION_OVERHEAD;
        self.input_bytes = 0;
        self.full = false;
    }

    /// Returns [CompressorError::Full] once the bound exceeded the target.
    pub fn full_err(&self) -> Result<(), CompressorError> {
        if self.full {
            return Err(CompressorError::Full);
        }
        Ok(())
    }
}

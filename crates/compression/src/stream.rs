//! A single incremental compression stream whose output can be drained while it is still open.

use crate::{CompressionAlgo, CompressorError, CHANNEL_VERSION_BROTLI};
use core::fmt;
use flate2::{write::ZlibEncoder, Compression};
use std::io::Write;

/// The brotli window size, as a base 2 logarithm.
const BROTLI_LG_WINDOW: u32 = 22;

/// The internal buffer size of the brotli writer.
const BROTLI_BUFFER_SIZE: usize = 4096;

enum Encoder {
    Zlib(ZlibEncoder<Vec<u8>>),
    Brotli(Box<brotli::CompressorWriter<Vec<u8>>>),
}

/// The compression effort of a [CompressionStream].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamLevel {
    /// The best level of the configured algorithm.
    Best,
    /// Zlib with compression disabled.
    Stored,
}

/// An incremental compression stream over an in-memory buffer.
///
/// Output produced by the encoder stays in the buffer; [CompressionStream::read] advances a cursor
/// over it so that already emitted frames are never read twice.
pub(crate) struct CompressionStream {
    algo: CompressionAlgo,
    level: StreamLevel,
    encoder: Option<Encoder>,
    finished: Vec<u8>,
    read_offset: usize,
}

impl fmt::Debug for CompressionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionStream")
            .field("algo", &self.algo)
            .field("level", &self.level)
            .field("closed", &self.encoder.is_none())
            .field("total_len", &self.total_len())
            .field("read_offset", &self.read_offset)
            .finish()
    }
}

impl CompressionStream {
    /// Creates a new stream.
    pub(crate) fn new(algo: CompressionAlgo, level: StreamLevel) -> Self {
        let mut stream =
            Self { algo, level, encoder: None, finished: Vec::new(), read_offset: 0 };
        stream.reset();
        stream
    }

    fn fresh_encoder(&self) -> Encoder {
        match (self.level, self.algo.brotli_quality()) {
            (StreamLevel::Best, Some(quality)) => {
                Encoder::Brotli(Box::new(brotli::CompressorWriter::new(
                    vec![CHANNEL_VERSION_BROTLI],
                    BROTLI_BUFFER_SIZE,
                    quality,
                    BROTLI_LG_WINDOW,
                )))
            }
            (StreamLevel::Best, None) => {
                Encoder::Zlib(ZlibEncoder::new(Vec::new(), Compression::best()))
            }
            (StreamLevel::Stored, _) => {
                Encoder::Zlib(ZlibEncoder::new(Vec::new(), Compression::none()))
            }
        }
    }

    /// Compresses `data` into the stream.
    pub(crate) fn write(&mut self, data: &[u8]) -> Result<(), CompressorError> {
        match self.encoder.as_mut().ok_or(CompressorError::Closed)? {
            Encoder::Zlib(enc) => enc.write_all(data)?,
            Encoder::Brotli(enc) => enc.write_all(data)?,
        }
        Ok(())
    }

    /// Flushes all pending input into the output buffer without closing the stream.
    pub(crate) fn flush(&mut self) -> Result<(), CompressorError> {
        match self.encoder.as_mut().ok_or(CompressorError::Closed)? {
            Encoder::Zlib(enc) => enc.flush()?,
            Encoder::Brotli(enc) => enc.flush()?,
        }
        Ok(())
    }

    /// Finalizes the stream. Closing an already closed stream is a no-op.
    pub(crate) fn close(&mut self) -> Result<(), CompressorError> {
        if let Some(encoder) = self.encoder.take() {
            self.finished = match encoder {
                Encoder::Zlib(enc) => enc.finish()?,
                Encoder::Brotli(enc) => enc.into_inner(),
            };
        }
        Ok(())
    }

    /// Returns `true` once [CompressionStream::close] was called.
    pub(crate) const fn is_closed(&self) -> bool {
        self.encoder.is_none()
    }

    fn output(&self) -> &[u8] {
        match &self.encoder {
            Some(Encoder::Zlib(enc)) => enc.get_ref(),
            Some(Encoder::Brotli(enc)) => enc.get_ref(),
            None => &self.finished,
        }
    }

    /// The number of bytes the stream produced so far, including bytes already read.
    pub(crate) fn total_len(&self) -> usize {
        self.output().len()
    }

    /// The number of produced bytes not read yet.
    pub(crate) fn ready_len(&self) -> usize {
        self.total_len().saturating_sub(self.read_offset)
    }

    /// Copies ready bytes into `buf`, returning how many were copied.
    pub(crate) fn read(&mut self, buf: &mut [u8]) -> usize {
        let start = self.read_offset;
        let output = self.output();
        let n = buf.len().min(output.len().saturating_sub(start));
        buf[..n].copy_from_slice(&output[start..start + n]);
        self.read_offset += n;
        n
    }

    /// Discards all state and starts a fresh stream.
    pub(crate) fn reset(&mut self) {
        self.encoder = Some(self.fresh_encoder());
        self.finished.clear();
        self.read_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompress_channel;

    #[test]
    fn test_zlib_read_while_open() {
        let mut stream = CompressionStream::new(CompressionAlgo::Zlib, StreamLevel::Best);
        stream.write(&[0xAB; 512]).unwrap();
        stream.flush().unwrap();
        let ready = stream.ready_len();
        assert!(ready > 0);

        let mut head = vec![0u8; 4];
        assert_eq!(stream.read(&mut head), 4);
        assert_eq!(stream.ready_len(), ready - 4);

        stream.close().unwrap();
        let mut tail = vec![0u8; stream.ready_len()];
        stream.read(&mut tail);
        head.extend(tail);
        assert_eq!(decompress_channel(&head, 1024).unwrap(), vec![0xAB; 512]);
    }

    #[test]
    fn test_brotli_prefix() {
        let mut stream = CompressionStream::new(CompressionAlgo::Brotli10, StreamLevel::Best);
        assert_eq!(stream.total_len(), 1);
        stream.write(b"hello brotli").unwrap();
        stream.close().unwrap();
        let mut out = vec![0u8; stream.ready_len()];
        stream.read(&mut out);
        assert_eq!(out[0], CHANNEL_VERSION_BROTLI);
        assert_eq!(decompress_channel(&out, 1024).unwrap(), b"hello brotli");
    }

    #[test]
    fn test_write_after_close() {
        let mut stream = CompressionStream::new(CompressionAlgo::Zlib, StreamLevel::Stored);
        stream.close().unwrap();
        assert!(stream.is_closed());
        assert!(matches!(stream.write(&[1]), Err(CompressorError::Closed)));
        stream.reset();
        assert!(!stream.is_closed());
        assert_eq!(stream.ready_len(), 0);
    }
}

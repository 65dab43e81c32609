//! Channel payload decompression.

use crate::{DecompressionError, CHANNEL_VERSION_BROTLI};
use std::io::Read;

/// The zlib compression method, found in the low nibble of the first byte of a zlib stream.
pub const ZLIB_DEFLATE_COMPRESSION_METHOD: u8 = 8;

/// The reserved zlib compression method.
pub const ZLIB_RESERVED_COMPRESSION_METHOD: u8 = 15;

/// Decompresses a channel payload, selecting the algorithm from its first byte.
///
/// Zlib streams are recognized by their compression method nibble, brotli streams by the
/// [CHANNEL_VERSION_BROTLI] prefix. The output is limited to `max_size` bytes.
pub fn decompress_channel(data: &[u8], max_size: usize) -> Result<Vec<u8>, DecompressionError> {
    let first = *data.first().ok_or(DecompressionError::Empty)?;
    let method = first & 0x0F;

    if method == ZLIB_DEFLATE_COMPRESSION_METHOD || method == ZLIB_RESERVED_COMPRESSION_METHOD {
        return miniz_oxide::inflate::decompress_to_vec_zlib_with_limit(data, max_size).map_err(
            |e| match e.status {
                miniz_oxide::inflate::TINFLStatus::HasMoreOutput => {
                    DecompressionError::TooLarge(max_size)
                }
                status => DecompressionError::Zlib(format!("{status:?}")),
            },
        );
    }

    if first == CHANNEL_VERSION_BROTLI {
        let mut out = Vec::new();
        let mut reader = brotli::Decompressor::new(&data[1..], 4096).take(max_size as u64 + 1);
        reader
            .read_to_end(&mut out)
            .map_err(|e| DecompressionError::Brotli(e.to_string()))?;
        if out.len() > max_size {
            return Err(DecompressionError::TooLarge(max_size));
        }
        return Ok(out);
    }

    Err(DecompressionError::UnsupportedVersion(first))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompress_brotli() {
        use std::io::Write;

        let mut writer = brotli::CompressorWriter::new(vec![CHANNEL_VERSION_BROTLI], 4096, 11, 22);
        writer.write_all(b"brotli channel payload").unwrap();
        let compressed = writer.into_inner();
        assert_eq!(decompress_channel(&compressed, 100).unwrap(), b"brotli channel payload");
        assert_eq!(decompress_channel(&compressed, 10), Err(DecompressionError::TooLarge(10)));
    }

    #[test]
    fn test_decompress_zlib_limit() {
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&[0u8; 100], 9);
        assert_eq!(decompress_channel(&compressed, 100).unwrap(), vec![0u8; 100]);
        assert_eq!(
            decompress_channel(&compressed, 50),
            Err(DecompressionError::TooLarge(50))
        );
    }

    #[test]
    fn test_unsupported_version() {
        assert_eq!(decompress_channel(&[], 1), Err(DecompressionError::Empty));
        assert_eq!(
            decompress_channel(&[0x02, 0x00], 1),
            Err(DecompressionError::UnsupportedVersion(0x02))
        );
    }
}

//! EIP-4844 blob encoding of frame data.
//!
//! A blob holds 4096 field elements of 32 bytes. The two high order bits of every field element
//! must be zero, so each field element carries 31 full bytes plus 6 bits in its first byte. Four
//! field elements form a round of 127 bytes: four 31-byte chunks and three bytes split into 6-bit
//! pieces across the four leading bytes.
//!
//! The first round starts with the encoding version and a 24-bit big-endian length.

use crate::errors::BlobError;
use alloy_eips::eip4844::{Blob, BYTES_PER_BLOB};

/// The blob encoding version
pub const BLOB_ENCODING_VERSION: u8 = 0;

/// Maximum blob data size
pub const BLOB_MAX_DATA_SIZE: usize = (4 * 31 + 3) * 1024 - 4; // 130044

/// Blob Encoding/Decoding Rounds
pub const BLOB_ENCODING_ROUNDS: usize = 1024;

/// Bytes carried by one round of four field elements.
const BYTES_PER_ROUND: usize = 4 * 31 + 3;

/// Encodes `data` into a blob.
pub fn blob_from_data(data: &[u8]) -> Result<Blob, BlobError> {
    if data.len() > BLOB_MAX_DATA_SIZE {
        return Err(BlobError::DataTooLarge(data.len()));
    }

    let mut blob = Blob::ZERO;
    let mut reader = data;
    let mut write_pos = 0;
    for round in 0..BLOB_ENCODING_ROUNDS {
        if reader.is_empty() {
            break;
        }

        let mut chunks = [[0u8; 31]; 4];
        if round == 0 {
            chunks[0][0] = BLOB_ENCODING_VERSION;
            chunks[0][1..4].copy_from_slice(&(data.len() as u32).to_be_bytes()[1..]);
            read_into(&mut reader, &mut chunks[0][4..]);
        } else {
            read_into(&mut reader, &mut chunks[0]);
        }
        let x = read_byte(&mut reader);
        read_into(&mut reader, &mut chunks[1]);
        let y = read_byte(&mut reader);
        read_into(&mut reader, &mut chunks[2]);
        let z = read_byte(&mut reader);
        read_into(&mut reader, &mut chunks[3]);

        let high = [
            x & 0b0011_1111,
            (y & 0b0000_1111) | ((x & 0b1100_0000) >> 2),
            z & 0b0011_1111,
            ((z & 0b1100_0000) >> 2) | ((y & 0b1111_0000) >> 4),
        ];
        for (chunk, first) in chunks.iter().zip(high) {
            blob[write_pos] = first;
            blob[write_pos + 1..write_pos + 32].copy_from_slice(chunk);
            write_pos += 32;
        }
    }

    Ok(blob)
}

/// Decodes the data held by a blob written with [blob_from_data].
///
/// Returns a [BlobError] if a field element has either of its two high order bits set, if the
/// version or length is invalid, or if any byte past the encoded length is nonzero.
pub fn blob_to_data(blob: &Blob) -> Result<Vec<u8>, BlobError> {
    if blob[1] != BLOB_ENCODING_VERSION {
        return Err(BlobError::InvalidEncodingVersion);
    }
    let length = u32::from_be_bytes([0, blob[2], blob[3], blob[4]]) as usize;
    if length > BLOB_MAX_DATA_SIZE {
        return Err(BlobError::InvalidLength);
    }

    let mut stream = Vec::with_capacity(BLOB_ENCODING_ROUNDS * BYTES_PER_ROUND);
    for round in blob.chunks_exact(4 * 32) {
        let mut high = [0u8; 4];
        for (first, element) in high.iter_mut().zip(round.chunks_exact(32)) {
            if element[0] & 0b1100_0000 != 0 {
                return Err(BlobError::InvalidFieldElement);
            }
            *first = element[0];
        }

        let x = (high[0] & 0b0011_1111) | ((high[1] & 0b0011_0000) << 2);
        let y = (high[1] & 0b0000_1111) | ((high[3] & 0b0000_1111) << 4);
        let z = (high[2] & 0b0011_1111) | ((high[3] & 0b0011_0000) << 2);
        stream.extend_from_slice(&round[1..32]);
        stream.push(x);
        stream.extend_from_slice(&round[33..64]);
        stream.push(y);
        stream.extend_from_slice(&round[65..96]);
        stream.push(z);
        stream.extend_from_slice(&round[97..128]);
    }

    // The version and length prefix occupy the first four bytes of the stream.
    let end = 4 + length;
    if stream[end..].iter().any(|b| *b != 0) {
        return Err(BlobError::InvalidFieldElement);
    }
    stream.truncate(end);
    stream.drain(..4);
    Ok(stream)
}

/// Returns the number of blobs needed to carry `len` bytes.
pub const fn blobs_needed(len: usize) -> usize {
    len.div_ceil(BLOB_MAX_DATA_SIZE)
}

fn read_into(reader: &mut &[u8], out: &mut [u8]) {
    let n = out.len().min(reader.len());
    out[..n].copy_from_slice(&reader[..n]);
    *reader = &reader[n..];
}

fn read_byte(reader: &mut &[u8]) -> u8 {
    match reader.split_first() {
        Some((byte, rest)) => {
            *reader = rest;
            *byte
        }
        None => 0,
    }
}

const _: () = assert!(BLOB_ENCODING_ROUNDS * 4 * 32 == BYTES_PER_BLOB);

//! This module contains the [Frame] type and its wire format.

use crate::errors::FrameDecodingError;
use rand::RngCore;

/// The length of a channel id.
pub const CHANNEL_ID_LENGTH: usize = 16;

/// A channel id, unique per channel builder.
pub type ChannelId = [u8; CHANNEL_ID_LENGTH];

/// The version byte prefixed to the frames of a calldata transaction or a blob.
pub const DERIVATION_VERSION_0: u8 = 0;

/// Frame overhead: channel id, frame number, data length and the `is_last` byte.
pub const FRAME_OVERHEAD: usize = CHANNEL_ID_LENGTH + 2 + 4 + 1;

/// The maximum data length of a frame the derivation pipeline accepts.
pub const MAX_FRAME_LEN: usize = 1_000_000;

/// Generates a random [ChannelId].
pub fn random_channel_id() -> ChannelId {
    let mut id = ChannelId::default();
    rand::thread_rng().fill_bytes(&mut id);
    id
}

/// A channel frame is a segment of a channel's data.
///
/// *Encoding*
/// frame = `channel_id ++ frame_number ++ frame_data_length ++ frame_data ++ is_last`
/// * channel_id        = bytes16
/// * frame_number      = uint16
/// * frame_data_length = uint32
/// * frame_data        = bytes
/// * is_last           = bool
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// The id of the channel the frame belongs to.
    pub id: ChannelId,
    /// The number of the frame.
    pub number: u16,
    /// The data within the frame.
    pub data: Vec<u8>,
    /// Whether or not the frame is the last in the sequence.
    pub is_last: bool,
}

impl Frame {
    /// Encode the frame into a byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut encoded = Vec::with_capacity(self.size());
        encoded.extend_from_slice(&self.id);
        encoded.extend_from_slice(&self.number.to_be_bytes());
        encoded.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        encoded.extend_from_slice(&self.data);
        encoded.push(self.is_last as u8);
        encoded
    }

    /// Decode a frame from the start of `encoded`, returning the number of bytes consumed.
    pub fn decode(encoded: &[u8]) -> Result<(usize, Self), FrameDecodingError> {
        if encoded.len() < FRAME_OVERHEAD {
            return Err(FrameDecodingError::TooShort);
        }

        let mut id = ChannelId::default();
        id.copy_from_slice(&encoded[..16]);
        let number = u16::from_be_bytes([encoded[16], encoded[17]]);
        let data_len =
            u32::from_be_bytes([encoded[18], encoded[19], encoded[20], encoded[21]]) as usize;

        if data_len > MAX_FRAME_LEN {
            return Err(FrameDecodingError::DataTooLarge(data_len));
        }
        if encoded.len() < FRAME_OVERHEAD + data_len {
            return Err(FrameDecodingError::Truncated);
        }

        let data = encoded[22..22 + data_len].to_vec();
        let is_last = match encoded[22 + data_len] {
            0 => false,
            1 => true,
            other => return Err(FrameDecodingError::InvalidIsLast(other)),
        };
        Ok((FRAME_OVERHEAD + data_len, Self { id, number, data, is_last }))
    }

    /// Parses the frames of an L1 transaction's data: `DERIVATION_VERSION_0 ++ Frame(s)`.
    ///
    /// All frames must parse, no data may be left over, and there must be at least one frame.
    pub fn parse_frames(encoded: &[u8]) -> Result<Vec<Self>, FrameDecodingError> {
        let (version, data) = encoded.split_first().ok_or(FrameDecodingError::NoFrames)?;
        if *version != DERIVATION_VERSION_0 {
            return Err(FrameDecodingError::UnsupportedVersion(*version));
        }

        let mut frames = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let (frame_length, frame) = Self::decode(&data[offset..])?;
            frames.push(frame);
            offset += frame_length;
        }

        if frames.is_empty() {
            return Err(FrameDecodingError::NoFrames);
        }
        Ok(frames)
    }

    /// The encoded size of the frame.
    pub fn size(&self) -> usize {
        self.data.len() + FRAME_OVERHEAD
    }
}

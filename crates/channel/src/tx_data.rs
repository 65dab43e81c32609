//! Transaction data: the frames carried by a single L1 transaction.

use crate::{
    blob::blob_from_data,
    errors::BlobError,
    frame::{ChannelId, DERIVATION_VERSION_0},
};
use alloy_eips::eip4844::Blob;
use alloy_primitives::{hex, Bytes};
use core::fmt;

/// Identifies a frame by its channel and frame number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    /// The id of the channel the frame belongs to.
    pub channel_id: ChannelId,
    /// The frame number.
    pub number: u16,
}

/// An encoded frame, ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameData {
    /// The encoded frame.
    pub data: Vec<u8>,
    /// The id of the frame.
    pub id: FrameId,
}

/// Identifies a transaction by the ordered ids of the frames it carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TxId(pub Vec<FrameId>);

impl TxId {
    /// The frame ids of the transaction.
    pub fn frames(&self) -> &[FrameId] {
        &self.0
    }
}

impl fmt::Display for TxId {
    /// Renders consecutive frames of one channel as `chid:0+1+2`, separating channels with `|`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut current: Option<ChannelId> = None;
        for frame in &self.0 {
            if current == Some(frame.channel_id) {
                write!(f, "+{}", frame.number)?;
            } else {
                if current.is_some() {
                    write!(f, "|")?;
                }
                current = Some(frame.channel_id);
                write!(f, "{}:{}", hex::encode(frame.channel_id), frame.number)?;
            }
        }
        Ok(())
    }
}

/// The frames of a single transaction, and whether they go into blobs or calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxData {
    /// The frames, in submission order.
    pub frames: Vec<FrameData>,
    /// Whether the frames are submitted as blobs, one frame per blob.
    pub as_blob: bool,
}

impl TxData {
    /// The [TxId] of the transaction.
    pub fn id(&self) -> TxId {
        TxId(self.frames.iter().map(|f| f.id).collect())
    }

    /// The total encoded length of all frames.
    pub fn len(&self) -> usize {
        self.frames.iter().map(|f| f.data.len()).sum()
    }

    /// Returns `true` if the transaction carries no frame data.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The calldata of the transaction: the derivation version byte followed by all frames.
    pub fn call_data(&self) -> Bytes {
        let mut data = Vec::with_capacity(1 + self.len());
        data.push(DERIVATION_VERSION_0);
        for frame in &self.frames {
            data.extend_from_slice(&frame.data);
        }
        data.into()
    }

    /// One blob per frame, each holding the derivation version byte followed by the frame.
    pub fn blobs(&self) -> Result<Vec<Blob>, BlobError> {
        self.frames
            .iter()
            .map(|frame| {
                let mut data = Vec::with_capacity(1 + frame.data.len());
                data.push(DERIVATION_VERSION_0);
                data.extend_from_slice(&frame.data);
                blob_from_data(&data)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{blob::blob_to_data, Frame};

    fn frame_data(channel_id: ChannelId, number: u16, is_last: bool) -> FrameData {
        let frame = Frame { id: channel_id, number, data: vec![number as u8; 8], is_last };
        FrameData { data: frame.encode(), id: FrameId { channel_id, number } }
    }

    #[test]
    fn test_tx_id_display() {
        let a = [0xAA; 16];
        let b = [0xBB; 16];
        let id = TxId(vec![
            FrameId { channel_id: a, number: 0 },
            FrameId { channel_id: a, number: 1 },
            FrameId { channel_id: b, number: 0 },
        ]);
        assert_eq!(
            id.to_string(),
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa:0+1|bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb:0"
        );
        assert_eq!(TxId::default().to_string(), "");
    }

    #[test]
    fn test_call_data_parses_back_into_frames() {
        let id = [7; 16];
        let tx = TxData {
            frames: vec![frame_data(id, 0, false), frame_data(id, 1, true)],
            as_blob: false,
        };
        let call_data = tx.call_data();
        assert_eq!(call_data[0], DERIVATION_VERSION_0);
        assert_eq!(call_data.len(), 1 + tx.len());

        let frames = Frame::parse_frames(&call_data).unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames[1].is_last);
        assert_eq!(tx.id().frames()[1], FrameId { channel_id: id, number: 1 });
    }

    #[test]
    fn test_one_blob_per_frame() {
        let id = [9; 16];
        let tx = TxData {
            frames: vec![frame_data(id, 0, false), frame_data(id, 1, true)],
            as_blob: true,
        };
        let blobs = tx.blobs().unwrap();
        assert_eq!(blobs.len(), 2);
        for (blob, frame) in blobs.iter().zip(&tx.frames) {
            let data = blob_to_data(blob).unwrap();
            assert_eq!(data[0], DERIVATION_VERSION_0);
            assert_eq!(&data[1..], frame.data.as_slice());
        }
    }
}

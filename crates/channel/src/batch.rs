//! This module contains the [SingleBatch] type and the [BatchEncoder] seam.

use crate::{errors::BatchEncodingError, L2Block};
use alloy_primitives::{BlockHash, Bytes};
use alloy_rlp::{Decodable, Encodable, Header, RlpDecodable, RlpEncodable};
use core::fmt::{self, Debug};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The type byte of a deposit transaction. Deposits are derived from L1 and never batched.
pub const DEPOSIT_TX_TYPE: u8 = 0x7E;

/// The type of batches a channel carries.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum BatchType {
    /// One batch per L2 block.
    #[default]
    Single = 0,
    /// Span batches covering a range of L2 blocks.
    Span = 1,
}

impl TryFrom<u8> for BatchType {
    type Error = BatchEncodingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Single),
            1 => Ok(Self::Span),
            other => Err(BatchEncodingError::UnknownBatchType(other)),
        }
    }
}

impl From<BatchType> for u8 {
    fn from(value: BatchType) -> Self {
        value as Self
    }
}

impl fmt::Display for BatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Span => write!(f, "span"),
        }
    }
}

/// Represents a single batch: a single encoded L2 block
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct SingleBatch {
    /// Block hash of the previous L2 block
    pub parent_hash: BlockHash,
    /// The batch epoch number. Same as the first L1 block number in the epoch.
    pub epoch_num: u64,
    /// The block hash of the first L1 block in the epoch
    pub epoch_hash: BlockHash,
    /// The L2 block timestamp of this batch
    pub timestamp: u64,
    /// The L2 block transactions in this batch
    pub transactions: Vec<Bytes>,
}

impl SingleBatch {
    /// Builds the batch of an L2 block, dropping its deposit transactions.
    pub fn from_block(block: &L2Block) -> Self {
        Self {
            parent_hash: block.info.parent_hash,
            epoch_num: block.info.l1_origin.number,
            epoch_hash: block.info.l1_origin.hash,
            timestamp: block.info.timestamp,
            transactions: block
                .transactions
                .iter()
                .filter(|tx| tx.first() != Some(&DEPOSIT_TX_TYPE))
                .cloned()
                .collect(),
        }
    }

    /// Returns `true` if any transaction is empty or a deposit.
    pub fn has_invalid_transactions(&self) -> bool {
        self.transactions.iter().any(|tx| tx.first().map_or(true, |ty| *ty == DEPOSIT_TX_TYPE))
    }

    /// Encodes the batch as channel data: an RLP string holding the batch type byte followed by
    /// the RLP encoded batch.
    pub fn encode_batch_data(&self) -> Vec<u8> {
        let mut inner = Vec::with_capacity(self.length() + 1);
        inner.push(BatchType::Single as u8);
        self.encode(&mut inner);

        let mut out = Vec::with_capacity(inner.len() + 5);
        Header { list: false, payload_length: inner.len() }.encode(&mut out);
        out.extend_from_slice(&inner);
        out
    }

    /// Decodes one batch written by [SingleBatch::encode_batch_data], advancing `buf`.
    pub fn decode_batch_data(buf: &mut &[u8]) -> Result<Self, BatchEncodingError> {
        let header = Header::decode(buf)?;
        if header.list {
            return Err(BatchEncodingError::Rlp(alloy_rlp::Error::UnexpectedList));
        }
        if buf.len() < header.payload_length {
            return Err(BatchEncodingError::Rlp(alloy_rlp::Error::InputTooShort));
        }
        let data: &[u8] = *buf;
        let (payload, rest) = data.split_at(header.payload_length);
        *buf = rest;

        let (ty, mut body) = payload.split_first().ok_or(BatchEncodingError::EmptyBatch)?;
        if *ty != BatchType::Single as u8 {
            return Err(BatchEncodingError::UnknownBatchType(*ty));
        }
        Ok(Self::decode(&mut body)?)
    }
}

/// Converts L2 blocks into the batch bytes written to a channel.
pub trait BatchEncoder: Debug + Send + Sync {
    /// The batch type this encoder produces.
    fn batch_type(&self) -> BatchType;

    /// Encodes `block` into channel data.
    fn encode_block(&self, block: &L2Block) -> Result<Vec<u8>, BatchEncodingError>;
}

/// A [BatchEncoder] producing one [SingleBatch] per block.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleBatchEncoder;

impl BatchEncoder for SingleBatchEncoder {
    fn batch_type(&self) -> BatchType {
        BatchType::Single
    }

    fn encode_block(&self, block: &L2Block) -> Result<Vec<u8>, BatchEncodingError> {
        Ok(SingleBatch::from_block(block).encode_batch_data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockId, L2BlockRef};
    use alloy_primitives::{b256, bytes};

    fn block() -> L2Block {
        L2Block {
            info: L2BlockRef {
                hash: b256!("1111111111111111111111111111111111111111111111111111111111111111"),
                number: 7,
                parent_hash: b256!(
                    "2222222222222222222222222222222222222222222222222222222222222222"
                ),
                timestamp: 1_700_000_000,
                l1_origin: BlockId::new(
                    b256!("3333333333333333333333333333333333333333333333333333333333333333"),
                    42,
                ),
                sequence_number: 1,
            },
            transactions: vec![bytes!("7e01"), bytes!("02f8aa"), bytes!("01c0")],
        }
    }

    #[test]
    fn test_from_block_drops_deposits() {
        let batch = SingleBatch::from_block(&block());
        assert_eq!(batch.epoch_num, 42);
        assert_eq!(batch.timestamp, 1_700_000_000);
        assert_eq!(batch.transactions, vec![bytes!("02f8aa"), bytes!("01c0")]);
        assert!(!batch.has_invalid_transactions());
    }

    #[test]
    fn test_batch_data_framing() {
        let encoded = SingleBatchEncoder.encode_block(&block()).unwrap();
        // An RLP string whose payload starts with the single batch type.
        let mut buf = encoded.as_slice();
        let header = Header::decode(&mut buf).unwrap();
        assert!(!header.list);
        assert_eq!(header.payload_length, buf.len());
        assert_eq!(buf[0], BatchType::Single as u8);

        let mut buf = encoded.as_slice();
        let decoded = SingleBatch::decode_batch_data(&mut buf).unwrap();
        assert!(buf.is_empty());
        assert_eq!(decoded, SingleBatch::from_block(&block()));
    }

    #[test]
    fn test_empty_transaction_encoded() {
        let mut block = block();
        block.transactions.push(Bytes::new());
        let encoded = SingleBatchEncoder.encode_block(&block).unwrap();
        let decoded = SingleBatch::decode_batch_data(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded.transactions.len(), 3);
        assert!(decoded.transactions[2].is_empty());
    }

    #[test]
    fn test_batch_type_from_u8() {
        assert_eq!(BatchType::try_from(0).unwrap(), BatchType::Single);
        assert_eq!(BatchType::try_from(1).unwrap(), BatchType::Span);
        assert!(matches!(BatchType::try_from(2), Err(BatchEncodingError::UnknownBatchType(2))));
    }
}

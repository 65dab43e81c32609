//! This module contains the block types consumed by the channel manager.

use alloy_primitives::{BlockHash, BlockNumber, Bytes, B256};
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifies a block by its hash and number.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub struct BlockId {
    /// The block hash
    pub hash: BlockHash,
    /// The block number
    pub number: BlockNumber,
}

impl BlockId {
    /// Instantiates a new [BlockId].
    pub const fn new(hash: BlockHash, number: BlockNumber) -> Self {
        Self { hash, number }
    }

    /// Returns `true` if this is the zero value.
    pub fn is_zero(&self) -> bool {
        self.hash.is_zero() && self.number == 0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash, self.number)
    }
}

/// A reference to an L2 block.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct L2BlockRef {
    /// The block hash
    pub hash: B256,
    /// The block number
    pub number: u64,
    /// The parent block hash
    pub parent_hash: B256,
    /// The block timestamp
    pub timestamp: u64,
    /// The L1 origin of the L2 block
    #[cfg_attr(feature = "serde", serde(rename = "l1origin"))]
    pub l1_origin: BlockId,
    /// The distance to the first block of the associated epoch
    #[cfg_attr(feature = "serde", serde(rename = "sequenceNumber"))]
    pub sequence_number: u64,
}

impl L2BlockRef {
    /// Returns the [BlockId] of the block.
    pub const fn id(&self) -> BlockId {
        BlockId { hash: self.hash, number: self.number }
    }
}

impl fmt::Display for L2BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} (origin {})", self.hash, self.number, self.l1_origin.number)
    }
}

/// An L2 block together with its encoded transactions.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct L2Block {
    /// The block reference.
    pub info: L2BlockRef,
    /// The EIP-2718 encoded transactions, deposits included.
    pub transactions: Vec<Bytes>,
}

impl L2Block {
    /// Instantiates a new [L2Block].
    pub const fn new(info: L2BlockRef, transactions: Vec<Bytes>) -> Self {
        Self { info, transactions }
    }

    /// The block hash.
    pub const fn hash(&self) -> B256 {
        self.info.hash
    }

    /// The parent block hash.
    pub const fn parent_hash(&self) -> B256 {
        self.info.parent_hash
    }

    /// The block number.
    pub const fn number(&self) -> u64 {
        self.info.number
    }

    /// Returns the [BlockId] of the block.
    pub const fn id(&self) -> BlockId {
        self.info.id()
    }
}

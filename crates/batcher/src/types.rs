//! Views of L1 and L2 returned by the batch submitter's collaborators.

use alloy_primitives::B256;
use kona_channel::{BlockId, L2BlockRef};
use serde::{Deserialize, Serialize};

/// The rollup node's view of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    /// The L1 head seen by the rollup node.
    pub head_l1: BlockId,
    /// The L2 safe head, derived from L1 data.
    pub safe_l2: L2BlockRef,
    /// The L2 unsafe head, the tip of the sequencer's chain.
    pub unsafe_l2: L2BlockRef,
}

/// An L1 block header, reduced to the fields the batch submitter reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct L1Header {
    /// The block hash.
    pub hash: B256,
    /// The block number.
    pub number: u64,
    /// The base fee per gas, absent before London.
    pub base_fee: Option<u128>,
}

impl L1Header {
    /// Returns the [BlockId] of the header.
    pub const fn id(&self) -> BlockId {
        BlockId::new(self.hash, self.number)
    }
}

/// Suggested L1 fee caps, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GasCaps {
    /// The priority fee per gas.
    pub tip_cap: u128,
    /// The base fee per gas.
    pub base_fee: u128,
    /// The blob base fee per blob gas.
    pub blob_base_fee: u128,
}

//! Collaborators of the batch submitter.

use crate::{
    errors::{AltDaError, TxManagerError},
    tx::{L1Receipt, TxCandidate},
    types::{GasCaps, L1Header, SyncStatus},
};
use alloy_primitives::Bytes;
use async_trait::async_trait;
use core::fmt::{Debug, Display};
use kona_channel::L2Block;

/// Fetches L2 blocks from the sequencer's execution client.
#[async_trait]
pub trait L2BlockSource: Debug + Send {
    /// The error type for the [L2BlockSource].
    type Error: Display + Send;

    /// Returns the block with the given number, transactions included.
    async fn block_by_number(&mut self, number: u64) -> Result<L2Block, Self::Error>;
}

/// Reports the sync status of the rollup node.
#[async_trait]
pub trait RollupStatusProvider: Debug + Send {
    /// The error type for the [RollupStatusProvider].
    type Error: Display + Send;

    /// Returns the current [SyncStatus].
    async fn sync_status(&mut self) -> Result<SyncStatus, Self::Error>;
}

/// Fetches L1 headers.
#[async_trait]
pub trait L1HeaderSource: Debug + Send {
    /// The error type for the [L1HeaderSource].
    type Error: Display + Send;

    /// Returns the header of the latest L1 block.
    async fn latest_header(&mut self) -> Result<L1Header, Self::Error>;
}

/// Suggests L1 fee caps.
#[async_trait]
pub trait L1GasOracle: Debug + Send {
    /// The error type for the [L1GasOracle].
    type Error: Display + Send;

    /// Returns the current [GasCaps].
    async fn suggest_caps(&mut self) -> Result<GasCaps, Self::Error>;
}

/// Signs, sends and tracks L1 transactions until they are included.
#[async_trait]
pub trait TxManager: Debug + Send + Sync {
    /// Sends the transaction and waits for its inclusion.
    async fn send(&self, candidate: TxCandidate) -> Result<L1Receipt, TxManagerError>;

    /// Returns `true` once the transaction manager stopped accepting transactions.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Stores frame data on an alternative DA layer.
#[async_trait]
pub trait AltDaClient: Debug + Send + Sync {
    /// Stores `data` and returns its commitment.
    async fn set_input(&self, data: Bytes) -> Result<Bytes, AltDaError>;
}

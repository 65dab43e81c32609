//! Transaction candidates, references and receipts.

use crate::errors::TxManagerError;
use alloy_eips::eip4844::Blob;
use alloy_primitives::{Address, Bytes, B256};
use kona_channel::{BlockId, TxId};
use std::fmt;

/// The gas charged for every transaction.
pub const TX_GAS: u64 = 21_000;

/// The gas charged per zero calldata byte.
pub const TX_DATA_ZERO_GAS: u64 = 4;

/// The gas charged per nonzero calldata byte.
pub const TX_DATA_NON_ZERO_GAS: u64 = 16;

/// Returns the intrinsic gas of a plain transaction carrying `data`.
pub fn intrinsic_gas(data: &[u8]) -> u64 {
    let zeros = data.iter().filter(|b| **b == 0).count() as u64;
    let non_zeros = data.len() as u64 - zeros;
    TX_GAS + zeros * TX_DATA_ZERO_GAS + non_zeros * TX_DATA_NON_ZERO_GAS
}

/// A transaction for the [TxManager](crate::TxManager) to sign and send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxCandidate {
    /// The batch inbox address.
    pub to: Address,
    /// The calldata.
    pub data: Bytes,
    /// The blobs, empty for calldata transactions.
    pub blobs: Vec<Blob>,
    /// The gas limit. Estimated by the transaction manager if `None`.
    pub gas_limit: Option<u64>,
}

impl TxCandidate {
    /// Creates a calldata transaction.
    pub const fn calldata(to: Address, data: Bytes) -> Self {
        Self { to, data, blobs: Vec::new(), gas_limit: None }
    }

    /// Creates a blob transaction with empty calldata.
    pub const fn blob(to: Address, blobs: Vec<Blob>) -> Self {
        Self { to, data: Bytes::new(), blobs, gas_limit: None }
    }

    /// Returns `true` if the transaction carries blobs.
    pub fn is_blob(&self) -> bool {
        !self.blobs.is_empty()
    }

    /// Sets the gas limit.
    pub const fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

/// Identifies a sent transaction in its receipt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TxRef {
    /// The frames carried by the transaction. Empty for cancel transactions.
    pub id: TxId,
    /// Whether the transaction cancels a transaction stuck in the mempool.
    pub is_cancel: bool,
    /// Whether the transaction carries blobs.
    pub is_blob: bool,
}

impl TxRef {
    /// Creates a reference to a batch transaction.
    pub const fn new(id: TxId, is_blob: bool) -> Self {
        Self { id, is_cancel: false, is_blob }
    }

    /// Creates a reference to a cancel transaction.
    pub const fn cancel(is_blob: bool) -> Self {
        Self { id: TxId(Vec::new()), is_cancel: true, is_blob }
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_cancel {
            return write!(f, "cancel (blob: {})", self.is_blob);
        }
        write!(f, "{} (blob: {})", self.id, self.is_blob)
    }
}

/// The L1 receipt of an included transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct L1Receipt {
    /// The transaction hash.
    pub tx_hash: B256,
    /// The hash of the including block.
    pub block_hash: B256,
    /// The number of the including block.
    pub block_number: u64,
}

impl L1Receipt {
    /// The [BlockId] of the including block.
    pub const fn block_id(&self) -> BlockId {
        BlockId::new(self.block_hash, self.block_number)
    }
}

/// The outcome of one send, delivered on the receipts channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt<T> {
    /// The reference passed with the send.
    pub id: T,
    /// The receipt, or why the transaction was not included.
    pub result: Result<L1Receipt, TxManagerError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::bytes;

    #[test]
    fn test_intrinsic_gas() {
        assert_eq!(intrinsic_gas(&[]), 21_000);
        assert_eq!(intrinsic_gas(&bytes!("00")), 21_004);
        assert_eq!(intrinsic_gas(&bytes!("0001ff00")), 21_000 + 2 * 4 + 2 * 16);
    }

    #[test]
    fn test_candidates() {
        let to = Address::with_last_byte(0xFF);
        let calldata = TxCandidate::calldata(to, bytes!("00aa")).with_gas_limit(21_020);
        assert!(!calldata.is_blob());
        assert_eq!(calldata.gas_limit, Some(21_020));

        let blob = TxCandidate::blob(to, vec![Blob::ZERO]);
        assert!(blob.is_blob());
        assert!(blob.data.is_empty());
        assert_eq!(blob.gas_limit, None);
    }

    #[test]
    fn test_cancel_ref() {
        let cancel = TxRef::cancel(false);
        assert!(cancel.is_cancel);
        assert!(cancel.id.0.is_empty());
        assert_eq!(cancel.to_string(), "cancel (blob: false)");
    }
}

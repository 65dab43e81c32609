//! Recovery from a mempool slot reserved by a transaction of the other type.
//!
//! A sender may not have blob and non-blob transactions in the mempool at the same time. When a
//! send fails because of that, a cancel transaction of the other type replaces the stuck one.

use crate::{
    errors::TxManagerError,
    tx::{L1Receipt, TxRef},
};
use spin::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// The state of the sender's mempool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxpoolState {
    /// Transactions are sent normally.
    #[default]
    Good,
    /// A send failed because the mempool holds a transaction of the other type.
    Blocked {
        /// Whether the failed transaction carried blobs.
        is_blob: bool,
    },
    /// A cancel transaction was sent and its receipt is outstanding.
    CancelPending,
}

/// Tracks the [TxpoolState] across the driver loop and the receipt handler.
#[derive(Debug, Clone, Default)]
pub struct TxpoolWatchdog {
    state: Arc<Mutex<TxpoolState>>,
}

impl TxpoolWatchdog {
    /// Creates a new [TxpoolWatchdog] in the [TxpoolState::Good] state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    pub fn state(&self) -> TxpoolState {
        *self.state.lock()
    }

    /// Returns `true` if transactions may be sent.
    pub fn is_good(&self) -> bool {
        self.state() == TxpoolState::Good
    }

    /// Updates the state from the receipt of `tx`.
    ///
    /// Any receipt of a cancel transaction clears a pending cancellation, failed or not, since
    /// the stuck transaction may have been included meanwhile.
    pub fn on_receipt(&self, tx: &TxRef, result: &Result<L1Receipt, TxManagerError>) {
        let mut state = self.state.lock();
        match (*state, result) {
            (TxpoolState::Good, Err(TxManagerError::AlreadyReserved)) => {
                warn!(target: "txpool", "Incompatible transaction in txpool, blob: {}", tx.is_blob);
                *state = TxpoolState::Blocked { is_blob: tx.is_blob };
            }
            (TxpoolState::CancelPending, _) if tx.is_cancel => {
                match result {
                    Ok(_) => info!(target: "txpool", "Cancel transaction included"),
                    Err(e) => info!(target: "txpool", "Cancel transaction failed: {e}"),
                }
                info!(target: "txpool", "Txpool may no longer be blocked");
                *state = TxpoolState::Good;
            }
            _ => {}
        }
    }

    /// Moves a blocked txpool to [TxpoolState::CancelPending].
    ///
    /// Returns whether the stuck transaction carried blobs if a cancel transaction must be sent,
    /// `None` otherwise.
    pub fn begin_cancel(&self) -> Option<bool> {
        let mut state = self.state.lock();
        let TxpoolState::Blocked { is_blob } = *state else {
            return None;
        };
        *state = TxpoolState::CancelPending;
        Some(is_blob)
    }
}

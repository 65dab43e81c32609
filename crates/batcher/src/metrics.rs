//! Metrics for the batch submitter.

use lazy_static::lazy_static;
use prometheus::{
    self, register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

lazy_static! {
    /// Tracks batch transactions handed to the tx manager. Receipts are counted per channel.
    pub static ref BATCHER_TXS: IntCounterVec = register_int_counter_vec!(
        "kona_batcher_txs",
        "Number of batch transactions by status",
        &["status"]
    ).expect("Batcher Txs failed to register");

    /// Tracks cancel transactions sent to unblock the txpool.
    pub static ref CANCEL_TXS: IntCounter = register_int_counter!(
        "kona_batcher_cancel_txs",
        "Number of cancel transactions sent"
    ).expect("Cancel Txs failed to register");

    /// Tracks handled L2 reorgs.
    pub static ref REORGS: IntCounter = register_int_counter!(
        "kona_batcher_reorgs",
        "Number of L2 reorgs handled"
    ).expect("Reorgs failed to register");

    /// Tracks failed alt-DA requests.
    pub static ref FAILED_DA_REQUESTS: IntCounter = register_int_counter!(
        "kona_batcher_failed_da_requests",
        "Number of failed alt-DA requests"
    ).expect("Failed DA Requests failed to register");

    /// Tracks L2 blocks loaded into the channel manager.
    pub static ref L2_BLOCKS_LOADED: IntCounter = register_int_counter!(
        "kona_batcher_l2_blocks_loaded",
        "Number of L2 blocks loaded"
    ).expect("L2 Blocks Loaded failed to register");

    /// Tracks the latest L1 block number seen.
    pub static ref L1_TIP: IntGauge = register_int_gauge!(
        "kona_batcher_l1_tip",
        "The latest L1 block number"
    ).expect("L1 Tip failed to register");

    /// Tracks the DA type chosen by the selector.
    pub static ref DA_SELECTIONS: IntCounterVec = register_int_counter_vec!(
        "kona_batcher_da_selections",
        "Number of channel configs chosen by DA type",
        &["da_type"]
    ).expect("DA Selections failed to register");
}

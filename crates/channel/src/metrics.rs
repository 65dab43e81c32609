//! Metrics for channel building and management.

use lazy_static::lazy_static;
use prometheus::{
    self, register_counter_vec, register_gauge, register_histogram, register_int_gauge,
    CounterVec, Gauge, Histogram, IntGauge,
};

lazy_static! {
    /// Tracks channel lifecycle events: opened, fully submitted, timed out.
    pub static ref CHANNEL_EVENTS: CounterVec = register_counter_vec!(
        "kona_channel_events",
        "Number of channel lifecycle events",
        &["event"]
    ).expect("Channel Events failed to register");

    /// Tracks closed channels by the reason they filled up.
    pub static ref CHANNEL_CLOSED: CounterVec = register_counter_vec!(
        "kona_channel_closed",
        "Number of closed channels by full reason",
        &["reason"]
    ).expect("Channel Closed failed to register");

    /// Tracks batch transactions by outcome.
    pub static ref BATCH_TXS: CounterVec = register_counter_vec!(
        "kona_channel_batch_txs",
        "Number of batch transactions by status",
        &["status"]
    ).expect("Batch Txs failed to register");

    /// Tracks the number of L2 blocks waiting to be added to a channel.
    pub static ref PENDING_BLOCKS: IntGauge = register_int_gauge!(
        "kona_channel_pending_blocks",
        "Number of L2 blocks not yet added to a channel"
    ).expect("Pending Blocks failed to register");

    /// Tracks the RLP input bytes of the last closed channel.
    pub static ref CHANNEL_INPUT_BYTES: IntGauge = register_int_gauge!(
        "kona_channel_input_bytes",
        "Input bytes of the last closed channel"
    ).expect("Channel Input Bytes failed to register");

    /// Tracks the output bytes of the last closed channel.
    pub static ref CHANNEL_OUTPUT_BYTES: IntGauge = register_int_gauge!(
        "kona_channel_output_bytes",
        "Output bytes of the last closed channel"
    ).expect("Channel Output Bytes failed to register");

    /// Tracks the compression ratio of the last closed channel.
    pub static ref CHANNEL_COMPRESSION_RATIO: Gauge = register_gauge!(
        "kona_channel_compression_ratio",
        "Compression ratio of the last closed channel"
    ).expect("Channel Compression Ratio failed to register");

    /// Tracks the number of frames per closed channel.
    pub static ref CHANNEL_FRAMES: Histogram = {
        let buckets: [f64; 16] = core::array::from_fn(|i| (1 << i) as f64);
        register_histogram!(
            "kona_channel_frames",
            "Number of frames per closed channel",
            buckets.to_vec()
        ).expect("Channel Frames failed to register")
    };
}

//! Error types for channel building and management.

use crate::BatchType;
use kona_compression::CompressorError;
use thiserror::Error;

/// The reason a channel stopped accepting blocks.
///
/// A builder records the first reason it encounters and never changes it afterwards.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullReason {
    /// The compressor reached its target output size.
    #[error("channel input target reached")]
    InputTargetReached,
    /// Adding the next batch would exceed the max RLP bytes per channel.
    #[error("max RLP bytes per channel exceeded")]
    MaxRlpBytesExceeded,
    /// The 16-bit frame counter is exhausted.
    #[error("max frame index reached")]
    MaxFrameIndex,
    /// The channel was open for the max channel duration.
    #[error("max channel duration reached")]
    MaxDurationReached,
    /// The consensus channel timeout, minus the safety margin, was reached.
    #[error("channel timeout close")]
    ChannelTimeoutClose,
    /// The sequencer window of a contained batch, minus the safety margin, was reached.
    #[error("sequencer window close")]
    SeqWindowClose,
    /// The channel was closed on shutdown.
    #[error("channel terminated")]
    Terminated,
}

impl FullReason {
    /// A short label for the reason, suitable for metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InputTargetReached => "input_target_reached",
            Self::MaxRlpBytesExceeded => "max_rlp_exceeded",
            Self::MaxFrameIndex => "max_frame_index",
            Self::MaxDurationReached => "max_duration_reached",
            Self::ChannelTimeoutClose => "channel_timeout_close",
            Self::SeqWindowClose => "seq_window_close",
            Self::Terminated => "terminated",
        }
    }

    /// Returns `true` for the reasons driven by L1 block height.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::MaxDurationReached | Self::ChannelTimeoutClose | Self::SeqWindowClose)
    }
}

/// An error decoding frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameDecodingError {
    /// The input is shorter than the frame overhead.
    #[error("frame too short to decode")]
    TooShort,
    /// The frame data length exceeds the maximum frame length.
    #[error("frame data too large: {0} bytes")]
    DataTooLarge(usize),
    /// The frame data length points past the end of the input.
    #[error("frame data truncated")]
    Truncated,
    /// The `is_last` byte was neither 0 nor 1.
    #[error("invalid is_last byte: {0}")]
    InvalidIsLast(u8),
    /// The transaction data carried no frames.
    #[error("no frames to parse")]
    NoFrames,
    /// The transaction data used an unknown derivation version.
    #[error("unsupported derivation version: {0}")]
    UnsupportedVersion(u8),
}

/// An error encoding or decoding blobs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobError {
    /// The data does not fit into a blob.
    #[error("data too large for a blob: {0} bytes")]
    DataTooLarge(usize),
    /// A field element had one of its two high order bits set.
    #[error("invalid field element")]
    InvalidFieldElement,
    /// The blob used an unknown encoding version.
    #[error("invalid encoding version")]
    InvalidEncodingVersion,
    /// The encoded length exceeds the maximum blob data size.
    #[error("invalid length")]
    InvalidLength,
}

/// An error encoding L2 blocks into batches.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchEncodingError {
    /// The batch type byte is not known.
    #[error("unknown batch type: {0}")]
    UnknownBatchType(u8),
    /// The batch payload was empty.
    #[error("empty batch payload")]
    EmptyBatch,
    /// RLP encoding failed.
    #[error("rlp error: {0}")]
    Rlp(#[from] alloy_rlp::Error),
}

/// A rejected [ChannelConfig](crate::ChannelConfig).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelConfigError {
    /// The channel timeout is shorter than the safety margin.
    #[error("channel timeout {channel_timeout} is less than the safety margin {sub_safety_margin}")]
    ChannelTimeoutTooShort {
        /// The configured channel timeout.
        channel_timeout: u64,
        /// The configured safety margin.
        sub_safety_margin: u64,
    },
    /// The max frame size cannot hold the frame overhead.
    #[error("max frame size {0} is less than the minimum 23")]
    MaxFrameSizeTooSmall(u64),
    /// A blob frame would not fit into a blob.
    #[error("max frame size {0} exceeds the blob capacity")]
    MaxFrameSizeTooLarge(u64),
    /// The target number of frames is zero.
    #[error("target number of frames must be at least 1")]
    ZeroTargetNumFrames,
    /// More frames per blob transaction than a transaction can carry blobs.
    #[error("too many frames for blob transactions: {0} > 6")]
    TooManyBlobs(usize),
    /// The approximate compression ratio is outside of `(0, 1]`.
    #[error("approximate compression ratio must be in (0, 1], got {0}")]
    InvalidComprRatio(f64),
    /// The configured batch type differs from the encoder's.
    #[error("batch type {config} does not match the encoder's {encoder}")]
    BatchTypeMismatch {
        /// The configured batch type.
        config: BatchType,
        /// The encoder's batch type.
        encoder: BatchType,
    },
}

/// An error returned by the [ChannelBuilder](crate::ChannelBuilder).
#[derive(Error, Debug)]
pub enum ChannelBuilderError {
    /// The channel is full. The block was not added.
    #[error("channel full: {0}")]
    Full(#[from] FullReason),
    /// The block could not be encoded.
    #[error("batch encoding error: {0}")]
    Encoding(#[from] BatchEncodingError),
    /// The compressor failed.
    #[error("compressor error: {0}")]
    Compression(#[from] CompressorError),
    /// A frame number does not fit into 16 bits.
    #[error("frame number overflow")]
    FrameNumberOverflow,
    /// The channel config was rejected.
    #[error("invalid channel config: {0}")]
    Config(#[from] ChannelConfigError),
}

impl ChannelBuilderError {
    /// Returns the [FullReason] if this is a [ChannelBuilderError::Full] error.
    pub const fn full_reason(&self) -> Option<FullReason> {
        match self {
            Self::Full(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// An error returned by the [ChannelManager](crate::ChannelManager).
#[derive(Error, Debug)]
pub enum ChannelManagerError {
    /// The block does not extend the current tip.
    #[error("block does not extend existing chain")]
    Reorg,
    /// No transaction data is available right now.
    #[error("EOF")]
    Eof,
    /// Data is still pending after the manager was closed.
    #[error("pending channels remain after closing channel manager")]
    PendingAfterClose,
    /// The channel config was rejected.
    #[error("invalid channel config: {0}")]
    Config(#[from] ChannelConfigError),
    /// A channel builder failed.
    #[error("channel builder error: {0}")]
    Builder(#[from] ChannelBuilderError),
}

//! This module contains the [ChannelConfig] type.

use crate::{
    blob::BLOB_MAX_DATA_SIZE, errors::ChannelConfigError, frame::FRAME_OVERHEAD, BatchType,
};
use kona_compression::{CompressionAlgo, CompressorConfig, CompressorKind};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The maximum number of blobs a single blob transaction may carry.
pub const MAX_BLOBS_PER_BLOB_TX: usize = 6;

/// The maximum RLP bytes of batches in a channel, before Fjord.
pub const MAX_RLP_BYTES_PER_CHANNEL: u64 = 10_000_000;

/// The maximum RLP bytes of batches in a channel, from Fjord on.
pub const FJORD_MAX_RLP_BYTES_PER_CHANNEL: u64 = 100_000_000;

/// Configures how a channel is built and when it times out.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelConfig {
    /// Number of L1 blocks after a batch's L1 origin by which the batch must be included.
    pub seq_window_size: u64,
    /// Number of L1 blocks allowed between the first and the last frame of a channel.
    pub channel_timeout: u64,
    /// Max number of L1 blocks a channel stays open. Zero disables the limit.
    pub max_channel_duration: u64,
    /// Number of L1 blocks subtracted from the protocol timeouts.
    pub sub_safety_margin: u64,
    /// The maximum encoded size of a frame.
    pub max_frame_size: u64,
    /// The number of frames a channel aims to fill.
    pub target_num_frames: usize,
    /// The compressor fullness strategy.
    pub compressor_kind: CompressorKind,
    /// The compression algorithm.
    pub compression_algo: CompressionAlgo,
    /// The expected compression ratio of the ratio compressor.
    pub approx_compr_ratio: f64,
    /// The batch type carried by the channel.
    pub batch_type: BatchType,
    /// Whether frames are submitted as blobs.
    pub use_blobs: bool,
    /// The maximum RLP bytes of batches in a channel.
    pub max_rlp_bytes_per_channel: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            seq_window_size: 3600,
            channel_timeout: 300,
            max_channel_duration: 0,
            sub_safety_margin: 10,
            max_frame_size: 120_000,
            target_num_frames: 1,
            compressor_kind: CompressorKind::Shadow,
            compression_algo: CompressionAlgo::Zlib,
            approx_compr_ratio: 0.6,
            batch_type: BatchType::Single,
            use_blobs: false,
            max_rlp_bytes_per_channel: MAX_RLP_BYTES_PER_CHANNEL,
        }
    }
}

impl ChannelConfig {
    /// Validates the config.
    pub fn check(&self) -> Result<(), ChannelConfigError> {
        if self.channel_timeout < self.sub_safety_margin {
            return Err(ChannelConfigError::ChannelTimeoutTooShort {
                channel_timeout: self.channel_timeout,
                sub_safety_margin: self.sub_safety_margin,
            });
        }
        if self.max_frame_size < FRAME_OVERHEAD as u64 {
            return Err(ChannelConfigError::MaxFrameSizeTooSmall(self.max_frame_size));
        }
        // A blob carries the derivation version byte in front of the frame.
        if self.use_blobs && self.max_frame_size > BLOB_MAX_DATA_SIZE as u64 - 1 {
            return Err(ChannelConfigError::MaxFrameSizeTooLarge(self.max_frame_size));
        }
        if self.target_num_frames == 0 {
            return Err(ChannelConfigError::ZeroTargetNumFrames);
        }
        if self.use_blobs && self.target_num_frames > MAX_BLOBS_PER_BLOB_TX {
            return Err(ChannelConfigError::TooManyBlobs(self.target_num_frames));
        }
        if self.compressor_kind == CompressorKind::Ratio &&
            !(self.approx_compr_ratio > 0.0 && self.approx_compr_ratio <= 1.0)
        {
            return Err(ChannelConfigError::InvalidComprRatio(self.approx_compr_ratio));
        }
        Ok(())
    }

    /// The number of frames carried by one transaction: all target frames for blob
    /// transactions, a single frame for calldata.
    pub const fn max_frames_per_tx(&self) -> usize {
        if self.use_blobs {
            self.target_num_frames
        } else {
            1
        }
    }

    /// The maximum compressed payload of a channel: the frame payload capacity of all
    /// target frames.
    pub const fn max_data_size(&self) -> u64 {
        self.max_frame_size.saturating_sub(FRAME_OVERHEAD as u64) * self.target_num_frames as u64
    }

    /// The compressor config targeting [ChannelConfig::max_data_size].
    pub const fn compressor_config(&self) -> CompressorConfig {
        CompressorConfig {
            target_output_size: self.max_data_size(),
            approx_compr_ratio: self.approx_compr_ratio,
            kind: self.compressor_kind,
            algo: self.compression_algo,
        }
    }

    /// Returns a blob-submission variant of the config with `target_num_frames` blobs per tx.
    pub const fn with_blobs(mut self, target_num_frames: usize) -> Self {
        self.use_blobs = true;
        self.max_frame_size = BLOB_MAX_DATA_SIZE as u64 - 1;
        self.target_num_frames = target_num_frames;
        self
    }

    /// Returns a calldata-submission variant of the config with the given max frame size.
    pub const fn with_calldata(mut self, max_frame_size: u64) -> Self {
        self.use_blobs = false;
        self.max_frame_size = max_frame_size;
        self.target_num_frames = 1;
        self
    }
}

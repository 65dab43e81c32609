//! This module contains the CLI surface of the batcher.

use crate::config::{BatcherConfig, DaType};
use alloy_primitives::{Address, B256};
use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use kona_channel::{BatchType, BlockId, ChannelConfig};
use kona_compression::{CompressionAlgo, CompressorKind};
use std::time::Duration;

mod parser;
pub use parser::{parse_address, parse_b256, parse_duration};

mod tracing_util;
pub use tracing_util::{init_tracing_subscriber, verbosity_to_level};

/// The batcher CLI arguments. Every flag can also be set through its `BATCHER_` environment
/// variable.
#[derive(Parser, Clone, Debug)]
pub struct BatcherArgs {
    /// Verbosity level (0-4)
    #[arg(long, short, help = "Verbosity level (0-4)", action = ArgAction::Count)]
    pub v: u8,
    /// The L1 address batch transactions are sent to.
    #[clap(long, env = "BATCHER_BATCH_INBOX_ADDRESS", value_parser = parse_address)]
    pub batch_inbox_address: Address,
    /// Hash of the L1 genesis block of the rollup.
    #[clap(long, env = "BATCHER_GENESIS_L1_HASH", value_parser = parse_b256)]
    pub genesis_l1_hash: B256,
    /// Number of the L1 genesis block of the rollup.
    #[clap(long, env = "BATCHER_GENESIS_L1_NUMBER")]
    pub genesis_l1_number: u64,
    /// The interval between two ticks of the driver loop.
    #[clap(
        long,
        env = "BATCHER_POLL_INTERVAL",
        default_value = "6s",
        value_parser = parse_duration
    )]
    pub poll_interval: Duration,
    /// The timeout of a single RPC call.
    #[clap(
        long,
        env = "BATCHER_NETWORK_TIMEOUT",
        default_value = "10s",
        value_parser = parse_duration
    )]
    pub network_timeout: Duration,
    /// The interval between attempts to fetch the safe L1 origin when clearing state.
    #[clap(
        long,
        env = "BATCHER_SAFE_ORIGIN_RETRY_INTERVAL",
        default_value = "5s",
        value_parser = parse_duration
    )]
    pub safe_origin_retry_interval: Duration,
    /// The max number of transactions in flight. Zero means unlimited.
    #[clap(long, env = "BATCHER_MAX_PENDING_TX", default_value_t = 1)]
    pub max_pending_tx: u64,
    /// Publish frames as calldata, blobs, or whichever is cheaper (`auto`).
    #[clap(long, env = "BATCHER_DATA_AVAILABILITY_TYPE", default_value = "calldata")]
    pub data_availability_type: DaType,
    /// Store frames on an alt-DA layer and publish only their commitments.
    #[clap(long, env = "BATCHER_ALTDA_ENABLED")]
    pub altda_enabled: bool,
    /// The max number of concurrent alt-DA requests.
    #[clap(long, env = "BATCHER_ALTDA_MAX_CONCURRENT_DA_REQUESTS", default_value_t = 1)]
    pub altda_max_concurrent_da_requests: u64,
    /// Max number of L1 blocks a channel stays open. Zero disables the limit.
    #[clap(long, env = "BATCHER_MAX_CHANNEL_DURATION", default_value_t = 0)]
    pub max_channel_duration: u64,
    /// Number of L1 blocks subtracted from the channel timeout and the sequencer window.
    #[clap(long, env = "BATCHER_SUB_SAFETY_MARGIN", default_value_t = 10)]
    pub sub_safety_margin: u64,
    /// Number of L1 blocks allowed between the first and the last frame of a channel.
    #[clap(long, env = "BATCHER_CHANNEL_TIMEOUT", default_value_t = 300)]
    pub channel_timeout: u64,
    /// Number of L1 blocks after a batch's L1 origin by which the batch must be included.
    #[clap(long, env = "BATCHER_SEQ_WINDOW_SIZE", default_value_t = 3600)]
    pub seq_window_size: u64,
    /// The maximum encoded size of a calldata frame.
    #[clap(long, env = "BATCHER_MAX_L1_TX_SIZE_BYTES", default_value_t = 120_000)]
    pub max_l1_tx_size_bytes: u64,
    /// The number of frames a channel aims to fill, and blobs per blob transaction.
    #[clap(long, env = "BATCHER_TARGET_NUM_FRAMES", default_value_t = 1)]
    pub target_num_frames: usize,
    /// The compressor fullness strategy: ratio, shadow or none.
    #[clap(long, env = "BATCHER_COMPRESSOR", default_value = "shadow")]
    pub compressor: CompressorKind,
    /// The compression algorithm: zlib, brotli-9, brotli-10 or brotli-11.
    #[clap(long, env = "BATCHER_COMPRESSION_ALGO", default_value = "zlib")]
    pub compression_algo: CompressionAlgo,
    /// The expected compression ratio of the ratio compressor.
    #[clap(long, env = "BATCHER_APPROX_COMPR_RATIO", default_value_t = 0.6)]
    pub approx_compr_ratio: f64,
    /// The batch type: 0 for singular batches, 1 for span batches.
    #[clap(long, env = "BATCHER_BATCH_TYPE", default_value_t = 0)]
    pub batch_type: u8,
    /// The maximum RLP bytes of batches in a channel.
    #[clap(long, env = "BATCHER_MAX_RLP_BYTES_PER_CHANNEL", default_value_t = 10_000_000)]
    pub max_rlp_bytes_per_channel: u64,
}

impl BatcherArgs {
    /// Returns the validated [BatcherConfig] described by the arguments.
    pub fn to_config(&self) -> Result<BatcherConfig> {
        let batch_type =
            BatchType::try_from(self.batch_type).map_err(|e| anyhow!("Invalid batch type: {e}"))?;
        let channel = ChannelConfig {
            seq_window_size: self.seq_window_size,
            channel_timeout: self.channel_timeout,
            max_channel_duration: self.max_channel_duration,
            sub_safety_margin: self.sub_safety_margin,
            max_frame_size: self.max_l1_tx_size_bytes,
            target_num_frames: self.target_num_frames,
            compressor_kind: self.compressor,
            compression_algo: self.compression_algo,
            approx_compr_ratio: self.approx_compr_ratio,
            batch_type,
            use_blobs: self.data_availability_type == DaType::Blobs,
            max_rlp_bytes_per_channel: self.max_rlp_bytes_per_channel,
        };
        let cfg = BatcherConfig {
            poll_interval: self.poll_interval,
            network_timeout: self.network_timeout,
            max_pending_transactions: self.max_pending_tx,
            max_concurrent_da_requests: self.altda_max_concurrent_da_requests,
            use_alt_da: self.altda_enabled,
            batch_inbox_address: self.batch_inbox_address,
            genesis_l1: BlockId::new(self.genesis_l1_hash, self.genesis_l1_number),
            safe_origin_retry_interval: self.safe_origin_retry_interval,
            data_availability: self.data_availability_type,
            channel,
        };
        cfg.check().map_err(|e| anyhow!("Invalid batcher config: {e}"))?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(extra: &[&str]) -> Result<BatcherArgs, clap::Error> {
        let zero_hash = B256::ZERO.to_string();
        let required = [
            "batcher",
            "--batch-inbox-address",
            "0xff00000000000000000000000000000000000010",
            "--genesis-l1-hash",
            zero_hash.as_str(),
            "--genesis-l1-number",
            "100",
        ];
        BatcherArgs::try_parse_from(required.iter().chain(extra).copied())
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.v, 0);
        let cfg = args.to_config().unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(6));
        assert_eq!(cfg.max_pending_transactions, 1);
        assert_eq!(cfg.data_availability, DaType::Calldata);
        assert_eq!(cfg.genesis_l1.number, 100);
        assert_eq!(cfg.channel, ChannelConfig::default());
    }

    #[test]
    fn test_flags() {
        let args = parse(&[
            "-vvv",
            "--poll-interval",
            "500ms",
            "--data-availability-type",
            "blobs",
            "--target-num-frames",
            "6",
            "--compressor",
            "ratio",
            "--compression-algo",
            "brotli-11",
        ])
        .unwrap();
        assert_eq!(args.v, 3);
        let cfg = args.to_config().unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_millis(500));
        assert_eq!(cfg.data_availability, DaType::Blobs);
        assert!(cfg.default_channel_config().use_blobs);
        assert_eq!(cfg.channel.compressor_kind, CompressorKind::Ratio);
        assert_eq!(cfg.channel.compression_algo, CompressionAlgo::Brotli11);
    }

    #[test]
    fn test_invalid_args() {
        let cases = [
            ["--poll-interval", "soon"].as_slice(),
            ["--data-availability-type", "blob"].as_slice(),
            ["--compressor", "gzip"].as_slice(),
        ];
        for args in cases {
            assert!(parse(args).is_err(), "{args:?}");
        }
        assert!(BatcherArgs::try_parse_from(["batcher"]).is_err());
    }

    #[test]
    fn test_invalid_config() {
        let cases = [
            ["--batch-type", "2"].as_slice(),
            ["--poll-interval", "0s"].as_slice(),
            ["--max-l1-tx-size-bytes", "22"].as_slice(),
            ["--data-availability-type", "blobs", "--target-num-frames", "7"].as_slice(),
            ["--altda-enabled", "--data-availability-type", "auto"].as_slice(),
        ];
        for args in cases {
            assert!(parse(args).unwrap().to_config().is_err(), "{args:?}");
        }
    }
}

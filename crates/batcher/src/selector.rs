//! Chooses between calldata and blob channels from current L1 fees.

use crate::{traits::L1GasOracle, tx::TX_GAS, types::GasCaps};
use alloy_eips::eip4844::DATA_GAS_PER_BLOB;
use alloy_primitives::U256;
use async_trait::async_trait;
use kona_channel::{ChannelConfig, ChannelConfigProvider, BLOB_MAX_DATA_SIZE};
use std::time::Duration;
use tracing::{info, warn};

/// A [ChannelConfigProvider] returning the calldata or the blob config, whichever publishes a
/// byte of frame data for less at current L1 fees.
///
/// If the fees cannot be fetched in time, the previously returned config is returned again.
/// Before the first successful query that is the blob config.
#[derive(Debug)]
pub struct DynamicEthChannelConfig<O> {
    oracle: O,
    timeout: Duration,
    calldata_config: ChannelConfig,
    blob_config: ChannelConfig,
    last_is_blobs: bool,
}

impl<O> DynamicEthChannelConfig<O> {
    /// Creates a new [DynamicEthChannelConfig].
    pub const fn new(
        oracle: O,
        timeout: Duration,
        calldata_config: ChannelConfig,
        blob_config: ChannelConfig,
    ) -> Self {
        Self { oracle, timeout, calldata_config, blob_config, last_is_blobs: true }
    }

    /// Returns `true` if calldata is cheaper per byte than blobs under `caps`.
    ///
    /// A blob transaction still pays the intrinsic gas at the execution fee.
    pub fn prefers_calldata(&self, caps: &GasCaps) -> bool {
        let exec_price = U256::from(caps.base_fee) + U256::from(caps.tip_cap);

        // One version byte in front of the frame.
        let calldata_bytes = self.calldata_config.max_frame_size + 1;
        let calldata_gas = U256::from(calldata_bytes * 16 + TX_GAS);
        let calldata_cost = calldata_gas * exec_price;

        let blobs = self.blob_config.target_num_frames as u64;
        let blob_cost = U256::from(DATA_GAS_PER_BLOB * blobs) * U256::from(caps.blob_base_fee) +
            U256::from(TX_GAS) * exec_price;
        let blob_bytes = U256::from(BLOB_MAX_DATA_SIZE as u64 * blobs);

        // blob_cost / blob_bytes > calldata_cost / calldata_bytes
        let blob_side = blob_cost * U256::from(calldata_bytes);
        let calldata_side = calldata_cost * blob_bytes;
        info!(
            target: "da-selector",
            "Compared DA costs, base fee {}, tip cap {}, blob base fee {}, calldata cost {} for {} \
             bytes, blob cost {} for {} bytes",
            caps.base_fee,
            caps.tip_cap,
            caps.blob_base_fee,
            calldata_cost,
            calldata_bytes,
            blob_cost,
            blob_bytes
        );
        blob_side > calldata_side
    }

    fn last_config(&self) -> ChannelConfig {
        if self.last_is_blobs {
            self.blob_config
        } else {
            self.calldata_config
        }
    }
}

#[async_trait]
impl<O> ChannelConfigProvider for DynamicEthChannelConfig<O>
where
    O: L1GasOracle,
{
    async fn channel_config(&mut self) -> ChannelConfig {
        let caps = match tokio::time::timeout(self.timeout, self.oracle.suggest_caps()).await {
            Ok(Ok(caps)) => caps,
            Ok(Err(e)) => {
                warn!(target: "da-selector", "Gas price query failed: {e}, keeping last config");
                return self.last_config();
            }
            Err(_) => {
                warn!(target: "da-selector", "Timed out fetching gas prices, keeping last config");
                return self.last_config();
            }
        };

        self.last_is_blobs = !self.prefers_calldata(&caps);
        if self.last_is_blobs {
            info!(target: "da-selector", "Using blob channel config");
            crate::inc!(DA_SELECTIONS, &["blobs"]);
        } else {
            info!(target: "da-selector", "Using calldata channel config");
            crate::inc!(DA_SELECTIONS, &["calldata"]);
        }
        self.last_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestGasOracle;

    fn new_selector(oracle: TestGasOracle) -> DynamicEthChannelConfig<TestGasOracle> {
        let channel = ChannelConfig::default();
        DynamicEthChannelConfig::new(
            oracle,
            Duration::from_secs(1),
            channel.with_calldata(120_000),
            channel.with_blobs(6),
        )
    }

    fn caps(blob_base_fee: u128) -> GasCaps {
        GasCaps { tip_cap: 1_000, base_fee: 1_000_000, blob_base_fee }
    }

    #[tokio::test]
    async fn test_cheap_blobs() {
        let mut selector = new_selector(TestGasOracle::new(vec![Some(caps(1))]));
        assert!(selector.channel_config().await.use_blobs);
    }

    #[tokio::test]
    async fn test_expensive_blobs() {
        let mut selector = new_selector(TestGasOracle::new(vec![Some(caps(1_000_000_000))]));
        let cfg = selector.channel_config().await;
        assert!(!cfg.use_blobs);
        assert_eq!(cfg.max_frame_size, 120_000);
    }

    #[tokio::test]
    async fn test_query_failure_keeps_last_config() {
        // Blobs before the first successful query.
        let oracle = TestGasOracle::new(vec![None, Some(caps(1_000_000_000))]);
        let mut selector = new_selector(oracle);
        assert!(selector.channel_config().await.use_blobs);
        assert!(!selector.channel_config().await.use_blobs);

        let oracle = TestGasOracle::new(vec![Some(caps(1)), Some(caps(1_000_000_000)), None]);
        let mut selector = new_selector(oracle);
        assert!(selector.channel_config().await.use_blobs);
        assert!(!selector.channel_config().await.use_blobs);
        assert!(!selector.channel_config().await.use_blobs);
    }

    #[test]
    fn test_break_even() {
        let selector = new_selector(TestGasOracle::default());
        // Blob fees high enough to outweigh the calldata premium flip the decision.
        assert!(!selector.prefers_calldata(&caps(10_000)));
        assert!(selector.prefers_calldata(&caps(100_000_000)));
    }
}

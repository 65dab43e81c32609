//! This module contains the [BatcherConfig].

use crate::{errors::BatcherConfigError, selector::DynamicEthChannelConfig, traits::L1GasOracle};
use alloy_primitives::Address;
use core::{fmt, str::FromStr};
use kona_channel::{BlockId, ChannelConfig, ChannelConfigProvider};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The max frame size of calldata channels chosen by the DA selector.
pub const AUTO_CALLDATA_MAX_FRAME_SIZE: u64 = 120_000;

/// How channel frames are published to L1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaType {
    /// One frame per calldata transaction.
    #[default]
    Calldata,
    /// One frame per blob, up to the target number of frames per transaction.
    Blobs,
    /// Calldata or blobs, whichever is cheaper per byte at current L1 fees.
    Auto,
}

impl fmt::Display for DaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calldata => write!(f, "calldata"),
            Self::Blobs => write!(f, "blobs"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for DaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "calldata" => Ok(Self::Calldata),
            "blobs" => Ok(Self::Blobs),
            "auto" => Ok(Self::Auto),
            _ => Err(format!("Invalid data availability type: {s}")),
        }
    }
}

/// Configures the [BatchSubmitter](crate::BatchSubmitter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    /// The interval between two ticks of the driver loop.
    pub poll_interval: Duration,
    /// The timeout of a single RPC call.
    pub network_timeout: Duration,
    /// The max number of transactions in flight. Zero means unlimited.
    pub max_pending_transactions: u64,
    /// The max number of concurrent alt-DA requests.
    pub max_concurrent_da_requests: u64,
    /// Whether frames are stored on an alt-DA layer, publishing only commitments to L1.
    pub use_alt_da: bool,
    /// The L1 address batch transactions are sent to.
    pub batch_inbox_address: Address,
    /// The L1 genesis block of the rollup.
    pub genesis_l1: BlockId,
    /// The interval between attempts to fetch the safe L1 origin when clearing state.
    pub safe_origin_retry_interval: Duration,
    /// How frames are published.
    pub data_availability: DaType,
    /// The channel settings. The DA type decides the submission specific fields.
    pub channel: ChannelConfig,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(6),
            network_timeout: Duration::from_secs(10),
            max_pending_transactions: 1,
            max_concurrent_da_requests: 1,
            use_alt_da: false,
            batch_inbox_address: Address::ZERO,
            genesis_l1: BlockId::default(),
            safe_origin_retry_interval: Duration::from_secs(5),
            data_availability: DaType::Calldata,
            channel: ChannelConfig::default(),
        }
    }
}

impl BatcherConfig {
    /// Validates the config.
    pub fn check(&self) -> Result<(), BatcherConfigError> {
        if self.poll_interval.is_zero() {
            return Err(BatcherConfigError::ZeroPollInterval);
        }
        if self.network_timeout.is_zero() {
            return Err(BatcherConfigError::ZeroNetworkTimeout);
        }
        if self.use_alt_da {
            if self.max_concurrent_da_requests == 0 {
                return Err(BatcherConfigError::ZeroMaxConcurrentDaRequests);
            }
            if self.data_availability != DaType::Calldata {
                return Err(BatcherConfigError::AltDaRequiresCalldata);
            }
        }
        self.default_channel_config().check()?;
        if self.data_availability == DaType::Auto {
            self.calldata_channel_config().check()?;
        }
        Ok(())
    }

    /// The channel config of calldata channels.
    pub const fn calldata_channel_config(&self) -> ChannelConfig {
        match self.data_availability {
            DaType::Auto => self.channel.with_calldata(AUTO_CALLDATA_MAX_FRAME_SIZE),
            _ => {
                let mut cfg = self.channel;
                cfg.use_blobs = false;
                cfg
            }
        }
    }

    /// The channel config of blob channels.
    pub const fn blob_channel_config(&self) -> ChannelConfig {
        self.channel.with_blobs(self.channel.target_num_frames)
    }

    /// The channel config the channel manager starts with. Blobs unless the DA type is calldata.
    pub const fn default_channel_config(&self) -> ChannelConfig {
        match self.data_availability {
            DaType::Calldata => self.calldata_channel_config(),
            DaType::Blobs | DaType::Auto => self.blob_channel_config(),
        }
    }

    /// Returns the [ChannelConfigProvider] for the configured DA type. The DA selector queries
    /// `oracle` only for [DaType::Auto].
    pub fn channel_config_provider<O>(&self, oracle: O) -> Box<dyn ChannelConfigProvider>
    where
        O: L1GasOracle + 'static,
    {
        match self.data_availability {
            DaType::Auto => Box::new(DynamicEthChannelConfig::new(
                oracle,
                self.network_timeout,
                self.calldata_channel_config(),
                self.blob_channel_config(),
            )),
            _ => Box::new(self.default_channel_config()),
        }
    }
}

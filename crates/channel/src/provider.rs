//! The [ChannelConfigProvider] seam.

use crate::ChannelConfig;
use async_trait::async_trait;
use core::fmt::Debug;

/// Supplies the [ChannelConfig] new channels are built with.
///
/// The manager consults the provider before submitting the first transaction of a channel, so an
/// implementation can switch between calldata and blobs as L1 fees change.
#[async_trait]
pub trait ChannelConfigProvider: Debug + Send {
    /// Returns the channel config to use for new channels.
    async fn channel_config(&mut self) -> ChannelConfig;
}

#[async_trait]
impl ChannelConfigProvider for ChannelConfig {
    async fn channel_config(&mut self) -> ChannelConfig {
        *self
    }
}

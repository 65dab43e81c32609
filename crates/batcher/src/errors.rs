//! Error types for the batch submitter.

use kona_channel::{ChannelConfigError, ChannelManagerError};
use thiserror::Error;

/// An error returned by a [TxManager](crate::TxManager) for a single send.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxManagerError {
    /// The mempool already holds a transaction of the other type from this sender.
    #[error("transaction type already reserved")]
    AlreadyReserved,
    /// The transaction manager is closed.
    #[error("transaction manager closed")]
    Closed,
    /// The send was aborted.
    #[error("transaction send cancelled")]
    Cancelled,
    /// Any other send failure.
    #[error("transaction send failed: {0}")]
    Send(String),
}

/// An error returned by an [AltDaClient](crate::AltDaClient).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AltDaError {
    /// The DA server rejected or failed the request.
    #[error("alt-DA request failed: {0}")]
    Request(String),
    /// The request was aborted.
    #[error("alt-DA request cancelled")]
    Cancelled,
}

/// A rejected [BatcherConfig](crate::BatcherConfig).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatcherConfigError {
    /// The poll interval is zero.
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
    /// The network timeout is zero.
    #[error("network timeout must be greater than zero")]
    ZeroNetworkTimeout,
    /// Alt-DA is enabled without allowing any concurrent request.
    #[error("max concurrent DA requests must be greater than zero with alt-DA enabled")]
    ZeroMaxConcurrentDaRequests,
    /// Alt-DA commitments are only published as calldata.
    #[error("alt-DA requires the calldata DA type")]
    AltDaRequiresCalldata,
    /// A derived channel config was rejected.
    #[error("invalid channel config: {0}")]
    Channel(#[from] ChannelConfigError),
}

/// An error of the [BatchSubmitter](crate::BatchSubmitter).
#[derive(Error, Debug)]
pub enum DriverError {
    /// A temporary failure, retried on the next tick.
    #[error("temporary error: {0}")]
    Transient(String),
    /// A loaded block does not extend the blocks already queued.
    #[error("L2 reorg detected")]
    Reorg,
    /// The channel manager failed.
    #[error("channel manager error: {0}")]
    Manager(#[from] ChannelManagerError),
    /// The configuration was rejected.
    #[error("invalid batcher config: {0}")]
    Config(#[from] BatcherConfigError),
    /// An unrecoverable failure.
    #[error("critical error: {0}")]
    Fatal(String),
}

impl DriverError {
    /// Returns `true` if the batch submitter cannot continue.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Fatal(_) | Self::Config(_) | Self::Manager(ChannelManagerError::Config(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(DriverError::Fatal("boom".to_string()).is_fatal());
        assert!(DriverError::Config(BatcherConfigError::ZeroPollInterval).is_fatal());
        assert!(DriverError::Manager(ChannelManagerError::Config(
            ChannelConfigError::ZeroTargetNumFrames
        ))
        .is_fatal());

        assert!(!DriverError::Reorg.is_fatal());
        assert!(!DriverError::Transient("timeout".to_string()).is_fatal());
        assert!(!DriverError::Manager(ChannelManagerError::Eof).is_fatal());
    }
}

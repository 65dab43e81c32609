#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(any(test, feature = "test-utils")), warn(unused_crate_dependencies))]

/// Re-export commonly used types and traits.
pub mod prelude {
    pub use crate::{
        batch::{BatchEncoder, BatchType, SingleBatchEncoder},
        block::{BlockId, L2Block, L2BlockRef},
        config::ChannelConfig,
        errors::{ChannelBuilderError, ChannelConfigError, ChannelManagerError, FullReason},
        manager::ChannelManager,
        provider::ChannelConfigProvider,
        tx_data::{TxData, TxId},
    };
}

mod macros;

#[cfg(feature = "metrics")]
pub mod metrics;

mod block;
pub use block::{BlockId, L2Block, L2BlockRef};

mod batch;
pub use batch::{BatchEncoder, BatchType, SingleBatch, SingleBatchEncoder, DEPOSIT_TX_TYPE};

mod errors;
pub use errors::{
    BatchEncodingError, BlobError, ChannelBuilderError, ChannelConfigError, ChannelManagerError,
    FrameDecodingError, FullReason,
};

mod frame;
pub use frame::{
    random_channel_id, ChannelId, Frame, CHANNEL_ID_LENGTH, DERIVATION_VERSION_0, FRAME_OVERHEAD,
    MAX_FRAME_LEN,
};

mod blob;
pub use blob::{
    blob_from_data, blob_to_data, blobs_needed, BLOB_ENCODING_ROUNDS, BLOB_ENCODING_VERSION,
    BLOB_MAX_DATA_SIZE,
};

mod tx_data;
pub use tx_data::{FrameData, FrameId, TxData, TxId};

mod config;
pub use config::{
    ChannelConfig, FJORD_MAX_RLP_BYTES_PER_CHANNEL, MAX_BLOBS_PER_BLOB_TX,
    MAX_RLP_BYTES_PER_CHANNEL,
};

mod provider;
pub use provider::ChannelConfigProvider;

mod builder;
pub use builder::ChannelBuilder;

mod channel;
pub use channel::Channel;

mod manager;
pub use manager::ChannelManager;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

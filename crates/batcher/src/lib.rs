#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(any(test, feature = "test-utils")), warn(unused_crate_dependencies))]

/// Re-export commonly used types and traits.
pub mod prelude {
    pub use crate::{
        config::{BatcherConfig, DaType},
        driver::BatchSubmitter,
        errors::{AltDaError, BatcherConfigError, DriverError, TxManagerError},
        queue::TxQueue,
        selector::DynamicEthChannelConfig,
        traits::{
            AltDaClient, L1GasOracle, L1HeaderSource, L2BlockSource, RollupStatusProvider,
            TxManager,
        },
        tx::{L1Receipt, TxCandidate, TxReceipt, TxRef},
        txpool::{TxpoolState, TxpoolWatchdog},
        types::{GasCaps, L1Header, SyncStatus},
    };
    pub use kona_channel::prelude::*;
}

mod macros;

#[cfg(feature = "metrics")]
pub mod metrics;

mod errors;
pub use errors::{AltDaError, BatcherConfigError, DriverError, TxManagerError};

mod types;
pub use types::{GasCaps, L1Header, SyncStatus};

mod tx;
pub use tx::{
    intrinsic_gas, L1Receipt, TxCandidate, TxReceipt, TxRef, TX_DATA_NON_ZERO_GAS,
    TX_DATA_ZERO_GAS, TX_GAS,
};

mod traits;
pub use traits::{
    AltDaClient, L1GasOracle, L1HeaderSource, L2BlockSource, RollupStatusProvider, TxManager,
};

mod config;
pub use config::{BatcherConfig, DaType, AUTO_CALLDATA_MAX_FRAME_SIZE};

mod selector;
pub use selector::DynamicEthChannelConfig;

mod txpool;
pub use txpool::{TxpoolState, TxpoolWatchdog};

mod queue;
pub use queue::TxQueue;

mod driver;
pub use driver::{BatchSubmitter, ALT_DA_TX_DATA_VERSION};

pub mod cli;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

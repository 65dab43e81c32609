//! Test utilities for `kona-batcher`.

mod providers;
pub use providers::{
    TestAltDaClient, TestGasOracle, TestL1HeaderSource, TestL2BlockSource, TestProviderError,
    TestRollupStatus, TestTxManager,
};

pub use kona_channel::test_utils::{child_block, test_l2_blocks, CollectingLayer, TraceStorage};

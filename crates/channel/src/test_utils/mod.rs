//! Test utilities for channel building and management.

mod tracing;
pub use tracing::{CollectingLayer, LogLine, TraceStorage};

mod blocks;
pub use blocks::{child_block, random_tx, test_l2_blocks};

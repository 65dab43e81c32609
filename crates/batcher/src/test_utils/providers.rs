//! Mock collaborators of the batch submitter.
//!
//! The L2 and rollup mocks share their state between clones, so a test can keep a handle while
//! the [BatchSubmitter](crate::BatchSubmitter) owns the other.

use crate::{
    errors::{AltDaError, TxManagerError},
    traits::{
        AltDaClient, L1GasOracle, L1HeaderSource, L2BlockSource, RollupStatusProvider, TxManager,
    },
    tx::{L1Receipt, TxCandidate},
    types::{GasCaps, L1Header, SyncStatus},
};
use alloy_primitives::{keccak256, Bytes, B256};
use async_trait::async_trait;
use kona_channel::L2Block;
use spin::Mutex;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use thiserror::Error;

/// An error for the test providers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TestProviderError {
    /// The requested L2 block is unknown.
    #[error("block not found: {0}")]
    BlockNotFound(u64),
    /// No sync status is set.
    #[error("sync status unavailable")]
    NoSyncStatus,
    /// No L1 header is set.
    #[error("L1 header unavailable")]
    NoHeader,
    /// The scripted gas price query failed.
    #[error("gas price unavailable")]
    NoGasCaps,
}

/// A mock [L2BlockSource] serving blocks by number.
#[derive(Debug, Clone, Default)]
pub struct TestL2BlockSource {
    /// The served blocks.
    pub blocks: Arc<Mutex<Vec<L2Block>>>,
}

impl TestL2BlockSource {
    /// Creates a new [TestL2BlockSource] serving `blocks`.
    pub fn new(blocks: Vec<L2Block>) -> Self {
        Self { blocks: Arc::new(Mutex::new(blocks)) }
    }

    /// Replaces the served blocks.
    pub fn set_blocks(&self, blocks: Vec<L2Block>) {
        *self.blocks.lock() = blocks;
    }
}

#[async_trait]
impl L2BlockSource for TestL2BlockSource {
    type Error = TestProviderError;

    async fn block_by_number(&mut self, number: u64) -> Result<L2Block, Self::Error> {
        self.blocks
            .lock()
            .iter()
            .find(|b| b.number() == number)
            .cloned()
            .ok_or(TestProviderError::BlockNotFound(number))
    }
}

/// A mock [RollupStatusProvider] returning the last set [SyncStatus].
#[derive(Debug, Clone, Default)]
pub struct TestRollupStatus {
    /// The returned status, an error if `None`.
    pub status: Arc<Mutex<Option<SyncStatus>>>,
}

impl TestRollupStatus {
    /// Creates a new [TestRollupStatus] returning `status`.
    pub fn new(status: SyncStatus) -> Self {
        Self { status: Arc::new(Mutex::new(Some(status))) }
    }

    /// Sets the returned status.
    pub fn set_status(&self, status: Option<SyncStatus>) {
        *self.status.lock() = status;
    }
}

#[async_trait]
impl RollupStatusProvider for TestRollupStatus {
    type Error = TestProviderError;

    async fn sync_status(&mut self) -> Result<SyncStatus, Self::Error> {
        (*self.status.lock()).ok_or(TestProviderError::NoSyncStatus)
    }
}

/// A mock [L1HeaderSource] returning a fixed header.
#[derive(Debug, Clone, Default)]
pub struct TestL1HeaderSource {
    /// The returned header, an error if `None`.
    pub header: Arc<Mutex<Option<L1Header>>>,
}

impl TestL1HeaderSource {
    /// Creates a new [TestL1HeaderSource] returning the header of block `number`.
    pub fn new(number: u64) -> Self {
        let header = L1Header { hash: keccak256(number.to_be_bytes()), number, base_fee: None };
        Self { header: Arc::new(Mutex::new(Some(header))) }
    }

    /// Sets the returned header.
    pub fn set_header(&self, header: Option<L1Header>) {
        *self.header.lock() = header;
    }
}

#[async_trait]
impl L1HeaderSource for TestL1HeaderSource {
    type Error = TestProviderError;

    async fn latest_header(&mut self) -> Result<L1Header, Self::Error> {
        (*self.header.lock()).ok_or(TestProviderError::NoHeader)
    }
}

/// A mock [L1GasOracle] returning scripted fee caps in order. A `None` entry, or an exhausted
/// script, fails the query.
#[derive(Debug, Clone, Default)]
pub struct TestGasOracle {
    /// The scripted answers.
    pub caps: VecDeque<Option<GasCaps>>,
}

impl TestGasOracle {
    /// Creates a new [TestGasOracle].
    pub fn new(caps: Vec<Option<GasCaps>>) -> Self {
        Self { caps: caps.into() }
    }
}

#[async_trait]
impl L1GasOracle for TestGasOracle {
    type Error = TestProviderError;

    async fn suggest_caps(&mut self) -> Result<GasCaps, Self::Error> {
        self.caps.pop_front().flatten().ok_or(TestProviderError::NoGasCaps)
    }
}

/// A mock [TxManager] recording every candidate.
///
/// Sends succeed with a receipt in the current inclusion block unless a scripted result is
/// queued.
#[derive(Debug, Default)]
pub struct TestTxManager {
    delay: Duration,
    inclusion_block: Mutex<u64>,
    results: Mutex<VecDeque<Result<L1Receipt, TxManagerError>>>,
    sent: Mutex<Vec<TxCandidate>>,
}

impl TestTxManager {
    /// Creates a new [TestTxManager] taking `delay` for every send.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay, ..Default::default() }
    }

    /// Queues the result of a future send.
    pub fn push_result(&self, result: Result<L1Receipt, TxManagerError>) {
        self.results.lock().push_back(result);
    }

    /// Sets the L1 block successful sends are included in.
    pub fn set_inclusion_block(&self, number: u64) {
        *self.inclusion_block.lock() = number;
    }

    /// Returns all candidates sent so far.
    pub fn sent(&self) -> Vec<TxCandidate> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl TxManager for TestTxManager {
    async fn send(&self, candidate: TxCandidate) -> Result<L1Receipt, TxManagerError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let tx_hash = keccak256(&candidate.data);
        self.sent.lock().push(candidate);
        if let Some(result) = self.results.lock().pop_front() {
            return result;
        }
        let block_number = *self.inclusion_block.lock();
        Ok(L1Receipt { tx_hash, block_hash: keccak256(block_number.to_be_bytes()), block_number })
    }
}

/// A mock [AltDaClient] committing to inputs by their hash.
#[derive(Debug, Default)]
pub struct TestAltDaClient {
    delay: Duration,
    failures: Mutex<VecDeque<AltDaError>>,
    inputs: Mutex<Vec<Bytes>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl TestAltDaClient {
    /// Creates a client taking `delay` to store each input.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay, ..Default::default() }
    }

    /// The most requests that were in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Fails the next request with `err`.
    pub fn push_failure(&self, err: AltDaError) {
        self.failures.lock().push_back(err);
    }

    /// Returns all inputs stored so far.
    pub fn inputs(&self) -> Vec<Bytes> {
        self.inputs.lock().clone()
    }

    /// The commitment returned for `data`.
    pub fn commitment(data: &[u8]) -> B256 {
        keccak256(data)
    }
}

#[async_trait]
impl AltDaClient for TestAltDaClient {
    async fn set_input(&self, data: Bytes) -> Result<Bytes, AltDaError> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = self.failures.lock().pop_front() {
            return Err(err);
        }
        let commitment = Self::commitment(&data);
        self.inputs.lock().push(data);
        Ok(commitment.to_vec().into())
    }
}

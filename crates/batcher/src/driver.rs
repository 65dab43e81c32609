//! This module contains the [BatchSubmitter], the driver loop of the batcher.

use crate::{
    config::BatcherConfig,
    errors::{AltDaError, DriverError},
    queue::TxQueue,
    traits::{AltDaClient, L1HeaderSource, L2BlockSource, RollupStatusProvider, TxManager},
    tx::{intrinsic_gas, TxCandidate, TxReceipt, TxRef},
    txpool::TxpoolWatchdog,
};
use alloy_eips::eip4844::Blob;
use alloy_primitives::{Address, Bytes};
use core::{fmt::Display, future::Future};
use kona_channel::{
    BlockId, ChannelConfigProvider, ChannelManager, ChannelManagerError, SingleBatchEncoder,
    TxData,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{
        mpsc::{self, UnboundedReceiver, UnboundedSender},
        Mutex, OwnedSemaphorePermit, Semaphore,
    },
    time::MissedTickBehavior,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, trace, warn};

/// The version byte of calldata carrying an alt-DA commitment instead of frames.
pub const ALT_DA_TX_DATA_VERSION: u8 = 0x01;

/// Loads unsafe L2 blocks into the [ChannelManager] and publishes its transaction data to L1.
///
/// Ticks and receipts are handled in a single loop, so the manager is only ever mutated by one
/// of them at a time. The [shutdown token](Self::shutdown_token) stops the loop after the
/// remaining data was published. The [kill token](Self::kill_token) aborts everything in flight.
#[derive(Debug)]
pub struct BatchSubmitter<B, S, H, T> {
    cfg: BatcherConfig,
    l2: B,
    rollup: S,
    l1: H,
    queue: TxQueue<T>,
    manager: Arc<Mutex<ChannelManager>>,
    txpool: TxpoolWatchdog,
    alt_da: Option<Arc<dyn AltDaClient>>,
    da_permits: Arc<Semaphore>,
    da_tasks: TaskTracker,
    /// The last block added to the manager, `None` to restart from the safe head.
    last_stored_block: Option<BlockId>,
    receipts_tx: UnboundedSender<TxReceipt<TxRef>>,
    receipts_rx: UnboundedReceiver<TxReceipt<TxRef>>,
    shutdown: CancellationToken,
    kill: CancellationToken,
}

impl<B, S, H, T> BatchSubmitter<B, S, H, T>
where
    B: L2BlockSource,
    S: RollupStatusProvider,
    H: L1HeaderSource,
    T: TxManager + 'static,
{
    /// Creates a new [BatchSubmitter].
    pub fn new(
        cfg: BatcherConfig,
        l2: B,
        rollup: S,
        l1: H,
        tx_manager: Arc<T>,
        cfg_provider: Box<dyn ChannelConfigProvider>,
    ) -> Result<Self, DriverError> {
        cfg.check()?;
        let manager = ChannelManager::new(
            cfg.default_channel_config(),
            cfg_provider,
            Arc::new(SingleBatchEncoder),
        )?;
        let kill = CancellationToken::new();
        let queue = TxQueue::new(tx_manager, cfg.max_pending_transactions, kill.clone());
        let (receipts_tx, receipts_rx) = mpsc::unbounded_channel();
        Ok(Self {
            da_permits: Arc::new(Semaphore::new(cfg.max_concurrent_da_requests as usize)),
            cfg,
            l2,
            rollup,
            l1,
            queue,
            manager: Arc::new(Mutex::new(manager)),
            txpool: TxpoolWatchdog::new(),
            alt_da: None,
            da_tasks: TaskTracker::new(),
            last_stored_block: None,
            receipts_tx,
            receipts_rx,
            shutdown: CancellationToken::new(),
            kill,
        })
    }

    /// Stores frames on the given alt-DA layer, publishing only their commitments.
    pub fn with_alt_da(mut self, client: Arc<dyn AltDaClient>) -> Self {
        self.alt_da = Some(client);
        self
    }

    /// The token stopping the loop gracefully.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The token aborting all work in flight.
    pub fn kill_token(&self) -> CancellationToken {
        self.kill.clone()
    }

    /// The channel manager.
    pub fn manager(&self) -> Arc<Mutex<ChannelManager>> {
        Arc::clone(&self.manager)
    }

    /// The txpool watchdog.
    pub const fn txpool(&self) -> &TxpoolWatchdog {
        &self.txpool
    }

    /// The last block added to the channel manager.
    pub const fn last_stored_block(&self) -> Option<BlockId> {
        self.last_stored_block
    }

    /// Runs the driver loop until the shutdown token is cancelled.
    ///
    /// Returns an error only if the batch submitter cannot continue.
    pub async fn run(mut self) -> Result<(), DriverError> {
        if self.cfg.use_alt_da && self.alt_da.is_none() {
            return Err(DriverError::Fatal("alt-DA enabled without a client".to_string()));
        }
        info!(
            target: "batcher",
            "Starting batch submitter, DA type {}, alt-DA {}",
            self.cfg.data_availability,
            self.cfg.use_alt_da
        );
        self.clear_state().await;
        self.last_stored_block = None;

        let mut ticker = tokio::time::interval(self.cfg.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                Some(receipt) = self.receipts_rx.recv() => self.handle_receipt(receipt).await,
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        if e.is_fatal() {
                            error!(target: "batcher", "Stopping batch submitter: {e}");
                            return Err(e);
                        }
                        warn!(target: "batcher", "Tick failed: {e}");
                    }
                }
            }
        }

        if self.kill.is_cancelled() {
            warn!(target: "batcher", "Batch submitter killed, skipping drain");
        } else if self.queue.manager().is_closed() {
            warn!(target: "batcher", "Transaction manager closed, skipping drain");
        } else {
            info!(target: "batcher", "Draining state before shutdown");
            self.close_and_drain().await;
        }
        info!(target: "batcher", "Batch submitter stopped");
        Ok(())
    }

    /// Runs one iteration of the driver loop: loads new unsafe blocks and publishes all available
    /// transaction data.
    pub async fn tick(&mut self) -> Result<(), DriverError> {
        if !self.check_txpool().await {
            debug!(target: "batcher", "Txpool blocked, skipping tick");
            return Ok(());
        }
        match self.load_blocks_into_state().await {
            Ok(()) => {}
            Err(DriverError::Reorg) => {
                self.handle_reorg().await;
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        self.publish_state_to_l1().await
    }

    /// Sends a cancel transaction if the txpool is blocked. Returns `true` if batch transactions
    /// may be sent.
    async fn check_txpool(&mut self) -> bool {
        if let Some(blocked_blob) = self.txpool.begin_cancel() {
            self.send_cancel_tx(!blocked_blob).await;
        }
        self.txpool.is_good()
    }

    /// Sends an empty transaction of the given type to replace a stuck one in the mempool.
    async fn send_cancel_tx(&self, is_blob: bool) {
        warn!(target: "batcher", "Sending cancel transaction, blob: {is_blob}");
        let to = self.cfg.batch_inbox_address;
        let candidate = if is_blob {
            TxCandidate::blob(to, vec![Blob::ZERO])
        } else {
            TxCandidate::calldata(to, Bytes::new())
        };
        let candidate = candidate.with_gas_limit(intrinsic_gas(&[]));
        self.queue.send(TxRef::cancel(is_blob), candidate, self.receipts_tx.clone()).await;
        crate::inc!(CANCEL_TXS);
    }

    /// Adds the unsafe blocks after the last stored block to the channel manager.
    async fn load_blocks_into_state(&mut self) -> Result<(), DriverError> {
        let Some((start, end)) = self.l2_block_range().await? else {
            return Ok(());
        };

        for number in start.number + 1..=end.number {
            let block = with_timeout(
                self.cfg.network_timeout,
                "fetching L2 block",
                self.l2.block_by_number(number),
            )
            .await?;
            let id = block.id();
            let tx_count = block.transactions.len();
            let added = self.manager.lock().await.add_l2_block(block);
            match added {
                Ok(()) => {}
                Err(ChannelManagerError::Reorg) => {
                    warn!(target: "batcher", "Found L2 reorg at block {id}");
                    self.last_stored_block = None;
                    return Err(DriverError::Reorg);
                }
                Err(e) => return Err(e.into()),
            }
            debug!(target: "batcher", "Added L2 block {id} with {tx_count} transactions");
            crate::inc!(L2_BLOCKS_LOADED);
            self.last_stored_block = Some(id);
        }
        info!(
            target: "batcher",
            "Loaded L2 blocks {} to {} into state",
            start.number + 1,
            end.number
        );
        Ok(())
    }

    /// Returns the exclusive start and inclusive end of the blocks to load, `None` if there are
    /// none.
    async fn l2_block_range(&mut self) -> Result<Option<(BlockId, BlockId)>, DriverError> {
        let status = with_timeout(
            self.cfg.network_timeout,
            "fetching sync status",
            self.rollup.sync_status(),
        )
        .await?;
        if status.head_l1.is_zero() {
            return Err(DriverError::Transient("empty sync status".to_string()));
        }

        let safe = status.safe_l2.id();
        let start = match self.last_stored_block {
            None => {
                info!(target: "batcher", "Starting batch submission at safe head {safe}");
                safe
            }
            Some(last) if last.number < safe.number => {
                warn!(
                    target: "batcher",
                    "Last stored block {last} lags behind safe head {safe}, continuing from the \
                     safe head"
                );
                safe
            }
            Some(last) => last,
        };
        self.last_stored_block = Some(start);

        let end = status.unsafe_l2.id();
        if safe.number >= end.number || start.number >= end.number {
            trace!(target: "batcher", "No unsafe blocks to load, unsafe head {end}");
            return Ok(None);
        }
        Ok(Some((start, end)))
    }

    /// Publishes the data of the manager until it runs out, or until a send fails.
    async fn publish_state_to_l1(&mut self) -> Result<(), DriverError> {
        loop {
            if !self.txpool.is_good() {
                debug!(target: "batcher", "Txpool blocked, pausing publishing");
                return Ok(());
            }
            let l1_tip = self.l1_tip().await?;
            if !self.publish_tx(l1_tip).await? {
                return Ok(());
            }
        }
    }

    async fn l1_tip(&mut self) -> Result<BlockId, DriverError> {
        let header = with_timeout(
            self.cfg.network_timeout,
            "fetching L1 tip",
            self.l1.latest_header(),
        )
        .await?;
        crate::set!(L1_TIP, header.number as i64);
        Ok(header.id())
    }

    /// Hands the next transaction of the manager to the queue. Returns `false` if there was none
    /// to send.
    async fn publish_tx(&mut self, l1_tip: BlockId) -> Result<bool, DriverError> {
        // Frames are only handed out with a free DA slot.
        let da_permit = match &self.alt_da {
            Some(_) => match Arc::clone(&self.da_permits).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    debug!(target: "batcher", "Max concurrent DA requests reached");
                    return Ok(false);
                }
            },
            None => None,
        };

        let tx = self.manager.lock().await.tx_data(l1_tip).await;
        let tx = match tx {
            Ok(tx) => tx,
            Err(ChannelManagerError::Eof) => {
                trace!(target: "batcher", "No transaction data available");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        if let (Some(client), Some(permit)) = (&self.alt_da, da_permit) {
            self.spawn_alt_da_request(Arc::clone(client), permit, tx);
            return Ok(true);
        }

        let id = tx.id();
        let to = self.cfg.batch_inbox_address;
        let candidate = if tx.as_blob {
            match tx.blobs() {
                Ok(blobs) => TxCandidate::blob(to, blobs),
                Err(e) => {
                    error!(target: "batcher", "Failed to encode blobs of {id}: {e}");
                    self.manager.lock().await.tx_failed(&id);
                    return Err(DriverError::Transient(format!("blob encoding failed: {e}")));
                }
            }
        } else {
            TxCandidate::calldata(to, tx.call_data())
        };
        let candidate = with_intrinsic_gas(candidate);

        info!(
            target: "batcher",
            "Sending transaction {id}, {} frames, {} bytes, blob: {}",
            tx.frames.len(),
            tx.len(),
            tx.as_blob
        );
        self.queue.send(TxRef::new(id, tx.as_blob), candidate, self.receipts_tx.clone()).await;
        crate::inc!(BATCHER_TXS, &["submitted"]);
        Ok(true)
    }

    /// Stores the calldata of `tx` on the alt-DA layer in the background and sends the returned
    /// commitment. A failed request hands the frames back to the manager.
    fn spawn_alt_da_request(
        &self,
        client: Arc<dyn AltDaClient>,
        permit: OwnedSemaphorePermit,
        tx: TxData,
    ) {
        let queue = self.queue.clone();
        let manager = Arc::clone(&self.manager);
        let receipts = self.receipts_tx.clone();
        let to = self.cfg.batch_inbox_address;
        let kill = self.kill.clone();
        self.da_tasks.spawn(async move {
            let id = tx.id();
            let result = tokio::select! {
                result = client.set_input(tx.call_data()) => result,
                _ = kill.cancelled() => Err(AltDaError::Cancelled),
            };
            match result {
                Ok(commitment) => {
                    debug!(target: "batcher", "Stored {id} on alt-DA, sending commitment");
                    let candidate = with_intrinsic_gas(commitment_candidate(to, &commitment));
                    queue.send(TxRef::new(id, false), candidate, receipts).await;
                    crate::inc!(BATCHER_TXS, &["submitted"]);
                }
                Err(e) => {
                    warn!(target: "batcher", "Alt-DA request for {id} failed: {e}");
                    crate::inc!(FAILED_DA_REQUESTS);
                    manager.lock().await.tx_failed(&id);
                }
            }
            drop(permit);
        });
    }

    /// Routes a receipt to the txpool watchdog and the channel manager.
    async fn handle_receipt(&mut self, receipt: TxReceipt<TxRef>) {
        let TxReceipt { id, result } = receipt;
        self.txpool.on_receipt(&id, &result);
        if id.is_cancel {
            return;
        }
        match result {
            Ok(receipt) => {
                let block = receipt.block_id();
                info!(target: "batcher", "Transaction {id} confirmed in block {block}");
                self.manager.lock().await.tx_confirmed(&id.id, block);
            }
            Err(e) => {
                warn!(target: "batcher", "Transaction {id} failed: {e}");
                self.manager.lock().await.tx_failed(&id.id);
            }
        }
    }

    /// Publishes what is left after an L2 reorg and starts over from the safe head.
    async fn handle_reorg(&mut self) {
        crate::inc!(REORGS);
        self.close_and_drain().await;
        self.clear_state().await;
    }

    /// Closes the manager, publishes its remaining data and waits for all receipts.
    async fn close_and_drain(&mut self) {
        match self.manager.lock().await.close() {
            Ok(()) => {}
            Err(ChannelManagerError::PendingAfterClose) => {
                warn!(target: "batcher", "Closed channel manager with pending channels")
            }
            Err(e) => error!(target: "batcher", "Failed to close channel manager: {e}"),
        }
        if let Err(e) = self.publish_state_to_l1().await {
            warn!(target: "batcher", "Failed to publish remaining state: {e}");
        }
        self.wait_in_flight().await;
    }

    /// Waits for all alt-DA requests and sends in flight, then handles their receipts.
    async fn wait_in_flight(&mut self) {
        self.da_tasks.close();
        self.da_tasks.wait().await;
        self.da_tasks.reopen();
        self.queue.wait().await;
        while let Ok(receipt) = self.receipts_rx.try_recv() {
            self.handle_receipt(receipt).await;
        }
    }

    /// Clears the manager, continuing from the L1 origin of the safe head. Retries until the
    /// origin is known or the shutdown token is cancelled.
    async fn clear_state(&mut self) {
        loop {
            match self.safe_l1_origin().await {
                Ok(origin) => {
                    info!(target: "batcher", "Clearing state with safe L1 origin {origin}");
                    self.manager.lock().await.clear(origin);
                    return;
                }
                Err(e) => warn!(target: "batcher", "Failed to query safe L1 origin, retrying: {e}"),
            }
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    warn!(target: "batcher", "Clearing state without safe L1 origin");
                    self.manager.lock().await.clear(BlockId::default());
                    return;
                }
                _ = tokio::time::sleep(self.cfg.safe_origin_retry_interval) => {}
            }
        }
    }

    async fn safe_l1_origin(&mut self) -> Result<BlockId, DriverError> {
        let status = with_timeout(
            self.cfg.network_timeout,
            "fetching sync status",
            self.rollup.sync_status(),
        )
        .await?;
        if status.safe_l2.number == 0 {
            debug!(target: "batcher", "Safe head at genesis, using genesis L1 block");
            return Ok(self.cfg.genesis_l1);
        }
        Ok(status.safe_l2.l1_origin)
    }
}

/// Awaits `fut` for at most `timeout`, mapping its failure to a transient error.
async fn with_timeout<F, V, E>(timeout: Duration, what: &str, fut: F) -> Result<V, DriverError>
where
    F: Future<Output = Result<V, E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(DriverError::Transient(format!("{what}: {e}"))),
        Err(_) => Err(DriverError::Transient(format!("{what}: timed out"))),
    }
}

fn with_intrinsic_gas(candidate: TxCandidate) -> TxCandidate {
    let gas = intrinsic_gas(&candidate.data);
    candidate.with_gas_limit(gas)
}

fn commitment_candidate(to: Address, commitment: &[u8]) -> TxCandidate {
    let mut data = Vec::with_capacity(1 + commitment.len());
    data.push(ALT_DA_TX_DATA_VERSION);
    data.extend_from_slice(commitment);
    TxCandidate::calldata(to, data.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::DaType,
        errors::TxManagerError,
        test_utils::{
            child_block, test_l2_blocks, CollectingLayer, TestAltDaClient, TestGasOracle,
            TestL1HeaderSource, TestL2BlockSource, TestRollupStatus, TestTxManager, TraceStorage,
        },
        types::{GasCaps, SyncStatus},
    };
    use alloy_primitives::{keccak256, B256};
    use kona_channel::{ChannelConfig, Frame, L2Block, L2BlockRef, DERIVATION_VERSION_0};
    use kona_compression::CompressorKind;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    type TestSubmitter =
        BatchSubmitter<TestL2BlockSource, TestRollupStatus, TestL1HeaderSource, TestTxManager>;

    struct Harness {
        submitter: TestSubmitter,
        tx_manager: Arc<TestTxManager>,
        l2: TestL2BlockSource,
        rollup: TestRollupStatus,
    }

    fn l1(number: u64) -> BlockId {
        BlockId::new(keccak256(number.to_be_bytes()), number)
    }

    /// Channels time out two L1 blocks after the genesis L1 block 5, so the first tick at L1
    /// block 10 publishes all loaded blocks.
    fn config(data_availability: DaType) -> BatcherConfig {
        BatcherConfig {
            max_pending_transactions: 0,
            batch_inbox_address: Address::repeat_byte(0xff),
            genesis_l1: l1(5),
            data_availability,
            channel: ChannelConfig { max_channel_duration: 2, ..Default::default() },
            ..Default::default()
        }
    }

    fn status(unsafe_l2: &L2Block) -> SyncStatus {
        SyncStatus { head_l1: l1(10), safe_l2: L2BlockRef::default(), unsafe_l2: unsafe_l2.info }
    }

    fn harness(cfg: BatcherConfig, blocks: Vec<L2Block>) -> Harness {
        let cfg_provider = Box::new(cfg.default_channel_config());
        harness_with_provider(cfg, blocks, cfg_provider)
    }

    fn harness_with_provider(
        cfg: BatcherConfig,
        blocks: Vec<L2Block>,
        cfg_provider: Box<dyn ChannelConfigProvider>,
    ) -> Harness {
        let tx_manager = Arc::new(TestTxManager::default());
        tx_manager.set_inclusion_block(11);
        let rollup = TestRollupStatus::new(status(&blocks[blocks.len() - 1]));
        let l2 = TestL2BlockSource::new(blocks);
        let submitter = BatchSubmitter::new(
            cfg,
            l2.clone(),
            rollup.clone(),
            TestL1HeaderSource::new(10),
            Arc::clone(&tx_manager),
            cfg_provider,
        )
        .unwrap();
        Harness { submitter, tx_manager, l2, rollup }
    }

    /// A chain that does not share any block with [test_l2_blocks].
    fn forked_chain(count: usize) -> Vec<L2Block> {
        let mut parent = L2BlockRef { hash: B256::repeat_byte(0xee), ..Default::default() };
        (0..count)
            .map(|_| {
                let block = child_block(&parent, 5, Vec::new());
                parent = block.info;
                block
            })
            .collect()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let cfg = BatcherConfig { network_timeout: Duration::ZERO, ..Default::default() };
        let result = BatchSubmitter::new(
            cfg.clone(),
            TestL2BlockSource::default(),
            TestRollupStatus::default(),
            TestL1HeaderSource::default(),
            Arc::new(TestTxManager::default()),
            Box::new(cfg.default_channel_config()),
        );
        assert!(result.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_tick_publishes_calldata() {
        let blocks = test_l2_blocks(3, 5, 2, 100, 0);
        let Harness { mut submitter, tx_manager, .. } =
            harness(config(DaType::Calldata), blocks.clone());
        submitter.clear_state().await;

        submitter.tick().await.unwrap();
        assert_eq!(submitter.last_stored_block(), Some(blocks[2].id()));
        submitter.wait_in_flight().await;

        let sent = tx_manager.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, Address::repeat_byte(0xff));
        assert!(!sent[0].is_blob());
        assert_eq!(sent[0].data[0], DERIVATION_VERSION_0);
        assert_eq!(sent[0].gas_limit, Some(intrinsic_gas(&sent[0].data)));
        let frames = Frame::parse_frames(&sent[0].data).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_last);

        // The confirmed channel is done.
        assert!(submitter.manager().lock().await.channels().is_empty());

        // Nothing new to load or publish.
        submitter.tick().await.unwrap();
        submitter.wait_in_flight().await;
        assert_eq!(tx_manager.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_auto_da_switches_to_calldata() {
        let cfg = config(DaType::Auto);
        let caps = GasCaps { tip_cap: 1_000, base_fee: 1_000_000, blob_base_fee: 1_000_000_000 };
        let cfg_provider = cfg.channel_config_provider(TestGasOracle::new(vec![Some(caps)]));
        let Harness { mut submitter, tx_manager, .. } =
            harness_with_provider(cfg, test_l2_blocks(2, 5, 1, 100, 5), cfg_provider);
        assert!(submitter.manager().lock().await.default_config().use_blobs);
        submitter.clear_state().await;

        submitter.tick().await.unwrap();
        submitter.wait_in_flight().await;
        let sent = tx_manager.sent();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].is_blob());
        assert_eq!(sent[0].data[0], DERIVATION_VERSION_0);
        let manager = submitter.manager();
        let manager = manager.lock().await;
        assert!(!manager.default_config().use_blobs);
        assert!(manager.channels().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_status_is_transient() {
        let Harness { mut submitter, rollup, .. } =
            harness(config(DaType::Calldata), test_l2_blocks(1, 5, 1, 10, 0));
        rollup.set_status(None);
        let err = submitter.tick().await.unwrap_err();
        assert!(matches!(err, DriverError::Transient(_)));
        assert!(!err.is_fatal());

        rollup.set_status(Some(SyncStatus::default()));
        let err = submitter.tick().await.unwrap_err();
        assert!(matches!(err, DriverError::Transient(_)));
    }

    #[tokio::test]
    async fn test_blocked_txpool_is_cancelled() {
        let blocks = test_l2_blocks(2, 5, 1, 100, 1);
        let Harness { mut submitter, tx_manager, .. } = harness(config(DaType::Blobs), blocks);
        submitter.clear_state().await;
        tx_manager.push_result(Err(TxManagerError::AlreadyReserved));

        // The blob transaction runs into a calldata transaction in the mempool.
        submitter.tick().await.unwrap();
        submitter.wait_in_flight().await;
        assert!(!submitter.txpool().is_good());

        // A calldata cancel transaction is sent instead of batch data.
        submitter.tick().await.unwrap();
        submitter.wait_in_flight().await;
        let sent = tx_manager.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].is_blob());
        assert!(!sent[1].is_blob());
        assert!(sent[1].data.is_empty());
        assert!(submitter.txpool().is_good());

        // The failed frames are resubmitted as blobs.
        submitter.tick().await.unwrap();
        submitter.wait_in_flight().await;
        let sent = tx_manager.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2].blobs, sent[0].blobs);
        assert!(submitter.manager().lock().await.channels().is_empty());
    }

    #[tokio::test]
    async fn test_reorg_clears_state() {
        let storage = TraceStorage::default();
        let subscriber =
            tracing_subscriber::Registry::default().with(CollectingLayer::new(storage.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let blocks = test_l2_blocks(3, 5, 1, 100, 2);
        let Harness { mut submitter, l2, rollup, .. } =
            harness(config(DaType::Calldata), blocks.clone());
        submitter.clear_state().await;
        submitter.tick().await.unwrap();
        submitter.wait_in_flight().await;

        // Block 4 builds on another block 3.
        let fork = forked_chain(4);
        l2.set_blocks(fork.clone());
        rollup.set_status(Some(status(&fork[3])));
        submitter.tick().await.unwrap();
        assert!(storage.messages("batcher", Level::WARN)[0].starts_with("Found L2 reorg at block"));
        assert_eq!(submitter.last_stored_block(), None);
        {
            let manager = submitter.manager();
            let manager = manager.lock().await;
            assert_eq!(manager.tip(), B256::ZERO);
            assert_eq!(manager.pending_blocks(), 0);
            assert!(manager.channels().is_empty());
            assert!(!manager.is_closed());
            assert_eq!(manager.l1_origin_last_closed_channel(), l1(5));
        }

        // The next tick starts over from the safe head.
        submitter.tick().await.unwrap();
        assert_eq!(submitter.last_stored_block(), Some(fork[3].id()));
    }

    #[tokio::test]
    async fn test_alt_da_publishes_commitments() {
        let cfg = BatcherConfig { use_alt_da: true, ..config(DaType::Calldata) };
        let Harness { submitter, tx_manager, .. } = harness(cfg, test_l2_blocks(2, 5, 1, 100, 3));
        let client = Arc::new(TestAltDaClient::default());
        let mut submitter = submitter.with_alt_da(client.clone());
        submitter.clear_state().await;
        client.push_failure(AltDaError::Request("unavailable".to_string()));

        // The failed request hands the frames back.
        submitter.tick().await.unwrap();
        submitter.wait_in_flight().await;
        assert!(tx_manager.sent().is_empty());
        assert!(client.inputs().is_empty());

        submitter.tick().await.unwrap();
        submitter.wait_in_flight().await;
        let inputs = client.inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0][0], DERIVATION_VERSION_0);

        let sent = tx_manager.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].data[0], ALT_DA_TX_DATA_VERSION);
        assert_eq!(&sent[0].data[1..], TestAltDaClient::commitment(&inputs[0]).as_slice());
        assert!(submitter.manager().lock().await.channels().is_empty());
    }

    #[tokio::test]
    async fn test_alt_da_requests_are_bounded() {
        let cfg = BatcherConfig {
            use_alt_da: true,
            max_concurrent_da_requests: 2,
            channel: ChannelConfig {
                max_channel_duration: 2,
                max_frame_size: 1_000,
                compressor_kind: CompressorKind::None,
                ..Default::default()
            },
            ..config(DaType::Calldata)
        };
        let Harness { submitter, tx_manager, .. } = harness(cfg, test_l2_blocks(1, 5, 1, 6_000, 4));
        let client = Arc::new(TestAltDaClient::with_delay(Duration::from_millis(50)));
        let mut submitter = submitter.with_alt_da(client.clone());
        submitter.clear_state().await;

        // A tick hands out no more frames than there are DA slots.
        submitter.tick().await.unwrap();
        submitter.wait_in_flight().await;
        assert_eq!(client.inputs().len(), 2);
        assert_eq!(tx_manager.sent().len(), 2);
        assert_eq!(client.max_in_flight(), 2);

        let frames = submitter.manager().lock().await.channels()[0].builder().total_frames();
        assert!(frames > 4);
        for _ in 0..frames {
            submitter.tick().await.unwrap();
            submitter.wait_in_flight().await;
        }
        assert_eq!(client.inputs().len(), frames);
        assert_eq!(tx_manager.sent().len(), frames);
        assert_eq!(client.max_in_flight(), 2);
        assert!(submitter.manager().lock().await.channels().is_empty());
    }

    #[tokio::test]
    async fn test_alt_da_requires_client() {
        let cfg = BatcherConfig { use_alt_da: true, ..config(DaType::Calldata) };
        let Harness { submitter, .. } = harness(cfg, test_l2_blocks(1, 5, 1, 10, 0));
        assert!(submitter.run().await.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_shutdown_drains_open_channel() {
        // Without a duration limit the channel stays open until shutdown.
        let mut cfg = config(DaType::Calldata);
        cfg.channel.max_channel_duration = 0;
        cfg.poll_interval = Duration::from_millis(10);
        let Harness { submitter, tx_manager, .. } = harness(cfg, test_l2_blocks(3, 5, 1, 100, 4));
        let manager = submitter.manager();
        let shutdown = submitter.shutdown_token();

        let (result, _) = tokio::join!(submitter.run(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            shutdown.cancel();
        });
        assert!(result.is_ok());

        let sent = tx_manager.sent();
        assert_eq!(sent.len(), 1);
        let frames = Frame::parse_frames(&sent[0].data).unwrap();
        assert!(frames[0].is_last);
        let manager = manager.lock().await;
        assert!(manager.is_closed());
        assert!(manager.channels().is_empty());
    }
}

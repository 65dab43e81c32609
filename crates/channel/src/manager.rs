//! This module contains the [ChannelManager].

use crate::{
    errors::{ChannelBuilderError, ChannelManagerError},
    frame::ChannelId,
    tx_data::{TxData, TxId},
    BatchEncoder, BlockId, Channel, ChannelConfig, ChannelConfigError, ChannelConfigProvider,
    L2Block,
};
use alloy_primitives::{hex, B256};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
};
use tracing::{debug, info, warn};

/// Keeps one channel open for new L2 blocks and hands out the transaction data of all channels,
/// oldest channel first.
///
/// Receipts are routed back to the channel that produced the transaction. A channel is dropped
/// once fully submitted. A timed out channel is dropped together with every channel after it,
/// and their blocks are requeued for new channels.
#[derive(Debug)]
pub struct ChannelManager {
    cfg_provider: Box<dyn ChannelConfigProvider>,
    default_cfg: ChannelConfig,
    encoder: Arc<dyn BatchEncoder>,
    /// Blocks not yet added to a channel.
    blocks: VecDeque<L2Block>,
    /// The hash of the last block added, used to detect reorgs.
    tip: B256,
    /// The channel new blocks are added to.
    current_channel: Option<ChannelId>,
    /// Channels with frames left to submit or transactions awaiting confirmation, oldest first.
    channel_queue: Vec<Channel>,
    /// The channel of every transaction in flight.
    tx_channels: HashMap<TxId, ChannelId>,
    closed: bool,
    l1_origin_last_closed_channel: BlockId,
}

impl ChannelManager {
    /// Creates a new [ChannelManager].
    pub fn new(
        default_cfg: ChannelConfig,
        cfg_provider: Box<dyn ChannelConfigProvider>,
        encoder: Arc<dyn BatchEncoder>,
    ) -> Result<Self, ChannelManagerError> {
        default_cfg.check()?;
        if default_cfg.batch_type != encoder.batch_type() {
            return Err(ChannelConfigError::BatchTypeMismatch {
                config: default_cfg.batch_type,
                encoder: encoder.batch_type(),
            }
            .into());
        }
        Ok(Self {
            cfg_provider,
            default_cfg,
            encoder,
            blocks: VecDeque::new(),
            tip: B256::ZERO,
            current_channel: None,
            channel_queue: Vec::new(),
            tx_channels: HashMap::new(),
            closed: false,
            l1_origin_last_closed_channel: BlockId::default(),
        })
    }

    /// The config new channels are created with.
    pub const fn default_config(&self) -> &ChannelConfig {
        &self.default_cfg
    }

    /// The number of blocks not yet added to a channel.
    pub fn pending_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// The hash of the last block added.
    pub const fn tip(&self) -> B256 {
        self.tip
    }

    /// The latest L1 origin of the last closed channel.
    pub const fn l1_origin_last_closed_channel(&self) -> BlockId {
        self.l1_origin_last_closed_channel
    }

    /// Returns `true` once [ChannelManager::close] was called.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// The queued channels, oldest first.
    pub fn channels(&self) -> &[Channel] {
        &self.channel_queue
    }

    /// Clears all state. The manager continues with the given L1 origin as the origin of the last
    /// closed channel.
    pub fn clear(&mut self, l1_origin_last_closed_channel: BlockId) {
        debug!(target: "channel-manager", "Clearing channel manager state");
        self.blocks.clear();
        self.l1_origin_last_closed_channel = l1_origin_last_closed_channel;
        self.tip = B256::ZERO;
        self.closed = false;
        self.current_channel = None;
        self.channel_queue.clear();
        self.tx_channels.clear();
        crate::set!(PENDING_BLOCKS, 0);
    }

    /// Queues a block for submission.
    ///
    /// Returns [ChannelManagerError::Reorg] if the block does not extend the last added block.
    /// The manager is unchanged in that case.
    pub fn add_l2_block(&mut self, block: L2Block) -> Result<(), ChannelManagerError> {
        if self.tip != B256::ZERO && self.tip != block.parent_hash() {
            return Err(ChannelManagerError::Reorg);
        }
        self.tip = block.hash();
        self.blocks.push_back(block);
        crate::set!(PENDING_BLOCKS, self.blocks.len() as i64);
        Ok(())
    }

    /// Returns the data of the next transaction to submit.
    ///
    /// Before the first transaction of a channel is handed out, the [ChannelConfigProvider] is
    /// consulted. If it switches between calldata and blobs, all channels that have not submitted
    /// anything are rebuilt under the new config.
    ///
    /// Returns [ChannelManagerError::Eof] if there is nothing to submit.
    pub async fn tx_data(&mut self, l1_head: BlockId) -> Result<TxData, ChannelManagerError> {
        let index = self.ready_channel(l1_head)?;
        if !self.channel_queue[index].none_submitted() {
            return self.next_tx_data(index);
        }

        let cfg = self.cfg_provider.channel_config().await;
        if cfg.use_blobs == self.default_cfg.use_blobs {
            debug!(
                target: "channel-manager",
                "Keeping DA type, use blobs: {}",
                self.default_cfg.use_blobs
            );
            return self.next_tx_data(index);
        }
        if let Err(e) = cfg.check() {
            warn!(target: "channel-manager", "Ignoring invalid channel config: {e}");
            return self.next_tx_data(index);
        }

        info!(
            target: "channel-manager",
            "Switching DA type, use blobs: {} -> {}, requeueing blocks",
            self.default_cfg.use_blobs,
            cfg.use_blobs
        );
        self.requeue(cfg)?;
        let index = self.ready_channel(l1_head)?;
        self.next_tx_data(index)
    }

    /// Records the inclusion of a transaction.
    pub fn tx_confirmed(&mut self, id: &TxId, inclusion_block: BlockId) {
        let Some(index) = self.take_tx_channel(id) else {
            warn!(
                target: "channel-manager",
                "Transaction {id} from unknown channel marked as confirmed"
            );
            return;
        };

        let channel = &mut self.channel_queue[index];
        let (done, blocks) = channel.tx_confirmed(id, inclusion_block);
        if !done {
            return;
        }
        if channel.is_timed_out() {
            self.invalidate(index, blocks);
        } else {
            self.remove_channel(index);
        }
    }

    /// Records the failure of a transaction. Its frames are submitted again.
    pub fn tx_failed(&mut self, id: &TxId) {
        let Some(index) = self.take_tx_channel(id) else {
            warn!(
                target: "channel-manager",
                "Transaction {id} from unknown channel marked as failed"
            );
            return;
        };

        let channel = &mut self.channel_queue[index];
        channel.tx_failed(id);
        if self.closed && channel.none_submitted() {
            info!(
                target: "channel-manager",
                "Channel {} has no submitted transactions, clearing for shutdown",
                hex::encode(channel.id())
            );
            self.remove_channel(index);
        }
    }

    /// Closes the manager. No new channels are created afterwards.
    ///
    /// Channels that never submitted a transaction are dropped. The current channel is closed and
    /// its remaining data output as frames. Returns [ChannelManagerError::PendingAfterClose] if it
    /// still has data to submit.
    pub fn close(&mut self) -> Result<(), ChannelManagerError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        info!(target: "channel-manager", "Channel manager is closing");

        self.channel_queue.retain(|channel| {
            if channel.none_submitted() {
                info!(
                    target: "channel-manager",
                    "Dropping channel {} with no past or pending submission",
                    hex::encode(channel.id())
                );
                return false;
            }
            info!(
                target: "channel-manager",
                "Channel {} is in flight, {} confirmed and {} pending transactions",
                hex::encode(channel.id()),
                channel.confirmed_txs(),
                channel.pending_txs()
            );
            true
        });
        info!(
            target: "channel-manager",
            "Reviewed all pending channels on close, {} remaining",
            self.channel_queue.len()
        );

        let Some(index) = self.current_index() else {
            self.current_channel = None;
            return Ok(());
        };
        if !self.channel_queue[index].is_full() {
            self.channel_queue[index].builder_mut().close();
            self.output_frames(index)?;
        }
        if self.channel_queue[index].has_tx_data() {
            return Err(ChannelManagerError::PendingAfterClose);
        }
        Ok(())
    }

    /// Returns the index of the oldest channel with transaction data, building frames from the
    /// pending blocks if there is none.
    fn ready_channel(&mut self, l1_head: BlockId) -> Result<usize, ChannelManagerError> {
        if let Some(index) = self.channel_queue.iter().position(Channel::has_tx_data) {
            return Ok(index);
        }
        debug!(
            target: "channel-manager",
            "Requested tx data at L1 head {l1_head}, {} blocks pending",
            self.blocks.len()
        );
        if self.closed || self.blocks.is_empty() {
            return Err(ChannelManagerError::Eof);
        }

        let index = self.ensure_channel_with_space(l1_head)?;
        self.process_blocks(index)?;
        // Registered after all pending blocks were added, so a timeout still includes them.
        self.channel_queue[index].builder_mut().register_l1_block(l1_head.number);
        self.output_frames(index)?;

        if self.channel_queue[index].has_tx_data() {
            return Ok(index);
        }
        Err(ChannelManagerError::Eof)
    }

    fn next_tx_data(&mut self, index: usize) -> Result<TxData, ChannelManagerError> {
        let channel = &mut self.channel_queue[index];
        if !channel.has_tx_data() {
            return Err(ChannelManagerError::Eof);
        }
        let tx = channel.next_tx_data();
        self.tx_channels.insert(tx.id(), channel.id());
        Ok(tx)
    }

    fn ensure_channel_with_space(
        &mut self,
        l1_head: BlockId,
    ) -> Result<usize, ChannelManagerError> {
        if let Some(index) = self.current_index() {
            if !self.channel_queue[index].is_full() {
                return Ok(index);
            }
        }

        let cfg = self.default_cfg;
        let channel = Channel::new(
            cfg,
            Arc::clone(&self.encoder),
            self.l1_origin_last_closed_channel.number,
        )?;
        info!(
            target: "channel-manager",
            "Created channel {} at L1 head {l1_head}, last closed origin {}, {} blocks pending, \
             batch type {}, compression {}, {} target frames of {} bytes, use blobs {}",
            hex::encode(channel.id()),
            self.l1_origin_last_closed_channel,
            self.blocks.len(),
            cfg.batch_type,
            cfg.compression_algo,
            cfg.target_num_frames,
            cfg.max_frame_size,
            cfg.use_blobs
        );
        crate::inc!(CHANNEL_EVENTS, &["opened"]);

        self.current_channel = Some(channel.id());
        self.channel_queue.push(channel);
        Ok(self.channel_queue.len() - 1)
    }

    /// Adds pending blocks to the channel at `index` until it is full.
    fn process_blocks(&mut self, index: usize) -> Result<(), ChannelManagerError> {
        let channel = &mut self.channel_queue[index];
        let mut added = 0;
        while let Some(block) = self.blocks.front() {
            match channel.builder_mut().add_block(block) {
                Ok(()) => {}
                Err(ChannelBuilderError::Full(_)) => break,
                Err(e) => return Err(e.into()),
            }
            debug!(
                target: "channel-manager",
                "Added block {} to channel {}",
                block.id(),
                hex::encode(channel.id())
            );
            self.blocks.pop_front();
            added += 1;
            if channel.is_full() {
                break;
            }
        }

        debug!(
            target: "channel-manager",
            "Added {added} blocks to channel {}, {} blocks pending",
            hex::encode(channel.id()),
            self.blocks.len()
        );
        crate::set!(PENDING_BLOCKS, self.blocks.len() as i64);
        Ok(())
    }

    /// Outputs the frames of the channel at `index` and records its closing if it is full.
    fn output_frames(&mut self, index: usize) -> Result<(), ChannelManagerError> {
        let channel = &mut self.channel_queue[index];
        channel.builder_mut().output_frames()?;
        if !channel.is_full() {
            return Ok(());
        }

        let builder = channel.builder();
        let latest_l1_origin = builder.latest_l1_origin();
        if latest_l1_origin.number > self.l1_origin_last_closed_channel.number {
            self.l1_origin_last_closed_channel = latest_l1_origin;
        }

        let reason = builder.full_reason().map(|r| r.to_string()).unwrap_or_default();
        info!(
            target: "channel-manager",
            "Channel {} closed: {reason}, {} blocks pending, {} frames, {} input bytes, \
             {} output bytes, compression ratio {:.4}, L1 origins {}..{}, L2 blocks {}..{}",
            hex::encode(builder.id()),
            self.blocks.len(),
            builder.total_frames(),
            builder.input_bytes(),
            builder.output_bytes(),
            builder.compression_ratio(),
            builder.oldest_l1_origin().number,
            latest_l1_origin.number,
            builder.oldest_l2().number,
            builder.latest_l2().number
        );
        #[cfg(feature = "metrics")]
        if let Some(reason) = builder.full_reason() {
            crate::inc!(CHANNEL_CLOSED, &[reason.as_str()]);
        }
        crate::set!(CHANNEL_INPUT_BYTES, builder.input_bytes() as i64);
        crate::set!(CHANNEL_OUTPUT_BYTES, builder.output_bytes() as i64);
        crate::set!(CHANNEL_COMPRESSION_RATIO, builder.compression_ratio());
        crate::observe!(CHANNEL_FRAMES, builder.total_frames() as f64);
        Ok(())
    }

    /// Rebuilds every channel that has not submitted anything under `cfg`.
    fn requeue(&mut self, cfg: ChannelConfig) -> Result<(), ChannelManagerError> {
        let mut requeued = Vec::new();
        let mut kept = Vec::new();
        for mut channel in self.channel_queue.drain(..) {
            if channel.none_submitted() {
                requeued.extend(channel.builder_mut().take_blocks());
            } else {
                kept.push(channel);
            }
        }
        requeued.extend(self.blocks.drain(..));
        self.blocks = requeued.into();
        self.channel_queue = kept;
        self.default_cfg = cfg;

        // A kept channel that is still open would never fill up again.
        if let Some(index) = self.current_index() {
            if !self.channel_queue[index].is_full() {
                self.channel_queue[index].builder_mut().close();
                self.output_frames(index)?;
            }
        }
        self.current_channel = None;
        crate::set!(PENDING_BLOCKS, self.blocks.len() as i64);
        Ok(())
    }

    /// Drops the channel at `index` and all channels after it, requeueing their blocks ahead of
    /// the pending ones.
    fn invalidate(&mut self, index: usize, blocks: Vec<L2Block>) {
        let mut requeued = blocks;
        let mut dropped = HashSet::new();
        for mut channel in self.channel_queue.drain(index..) {
            requeued.extend(channel.builder_mut().take_blocks());
            dropped.insert(channel.id());
        }
        self.tx_channels.retain(|_, channel_id| !dropped.contains(channel_id));
        warn!(
            target: "channel-manager",
            "Channel timed out, dropped {} channels and requeued {} blocks",
            dropped.len(),
            requeued.len()
        );

        requeued.extend(self.blocks.drain(..));
        self.blocks = requeued.into();
        self.current_channel = None;
        crate::set!(PENDING_BLOCKS, self.blocks.len() as i64);
    }

    fn remove_channel(&mut self, index: usize) {
        let channel = self.channel_queue.remove(index);
        if self.current_channel == Some(channel.id()) {
            self.current_channel = None;
        }
    }

    fn current_index(&self) -> Option<usize> {
        let current = self.current_channel?;
        self.channel_queue.iter().position(|c| c.id() == current)
    }

    /// Removes the transaction's channel mapping, returning the channel's index.
    fn take_tx_channel(&mut self, id: &TxId) -> Option<usize> {
        let channel_id = self.tx_channels.remove(id)?;
        self.channel_queue.iter().position(|c| c.id() == channel_id)
    }
}

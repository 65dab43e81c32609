//! This module contains the [Channel] type.

use crate::{
    errors::ChannelBuilderError,
    frame::ChannelId,
    tx_data::{TxData, TxId},
    BatchEncoder, BlockId, ChannelBuilder, ChannelConfig, L2Block,
};
use alloy_primitives::hex;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, trace, warn};

/// A channel together with the transactions submitting its frames.
///
/// Transactions move from pending to confirmed as receipts arrive. A failed transaction returns
/// its frames to the builder so they are submitted again.
#[derive(Debug)]
pub struct Channel {
    builder: ChannelBuilder,
    /// Transactions in flight, by id.
    pending: HashMap<TxId, TxData>,
    /// Confirmed transactions and the L1 block they were included in.
    confirmed: HashMap<TxId, BlockId>,
    min_inclusion_block: u64,
    max_inclusion_block: u64,
}

impl Channel {
    /// Creates a new [Channel].
    pub fn new(
        cfg: ChannelConfig,
        encoder: Arc<dyn BatchEncoder>,
        l1_origin_last_closed: u64,
    ) -> Result<Self, ChannelBuilderError> {
        Ok(Self {
            builder: ChannelBuilder::new(cfg, encoder, l1_origin_last_closed)?,
            pending: HashMap::new(),
            confirmed: HashMap::new(),
            min_inclusion_block: u64::MAX,
            max_inclusion_block: 0,
        })
    }

    /// The channel id.
    pub const fn id(&self) -> ChannelId {
        self.builder.id()
    }

    /// The channel config.
    pub const fn config(&self) -> &ChannelConfig {
        self.builder.config()
    }

    /// The underlying [ChannelBuilder].
    pub const fn builder(&self) -> &ChannelBuilder {
        &self.builder
    }

    /// The underlying [ChannelBuilder], mutably.
    pub fn builder_mut(&mut self) -> &mut ChannelBuilder {
        &mut self.builder
    }

    /// The number of transactions in flight.
    pub fn pending_txs(&self) -> usize {
        self.pending.len()
    }

    /// The number of confirmed transactions.
    pub fn confirmed_txs(&self) -> usize {
        self.confirmed.len()
    }

    /// Returns `true` once the channel accepts no more blocks.
    pub const fn is_full(&self) -> bool {
        self.builder.is_full()
    }

    /// Returns `true` if no transaction of this channel was ever submitted.
    pub fn none_submitted(&self) -> bool {
        self.pending.is_empty() && self.confirmed.is_empty()
    }

    /// Returns `true` if the frames of the confirmed transactions span at least the channel
    /// timeout.
    pub fn is_timed_out(&self) -> bool {
        !self.confirmed.is_empty() &&
            self.max_inclusion_block - self.min_inclusion_block >=
                self.config().channel_timeout
    }

    /// Returns `true` if the channel is full and every frame was confirmed.
    pub fn is_fully_submitted(&self) -> bool {
        self.is_full() && self.pending.is_empty() && self.builder.pending_frames() == 0
    }

    /// Returns `true` if a transaction can be built. Blob transactions of a channel that is still
    /// open wait until enough frames for a full transaction are ready.
    pub fn has_tx_data(&self) -> bool {
        if self.is_full() || !self.config().use_blobs {
            return self.builder.has_frame();
        }
        self.builder.pending_frames() >= self.config().max_frames_per_tx()
    }

    /// Takes up to [ChannelConfig::max_frames_per_tx] frames into a new pending transaction.
    pub fn next_tx_data(&mut self) -> TxData {
        let max_frames = self.config().max_frames_per_tx();
        let mut frames = Vec::with_capacity(max_frames);
        while frames.len() < max_frames {
            match self.builder.next_frame() {
                Some(frame) => frames.push(frame),
                None => break,
            }
        }

        let tx = TxData { frames, as_blob: self.config().use_blobs };
        let id = tx.id();
        debug!(
            target: "channel",
            "Returning next tx data {id} with {} frames (as blob: {})",
            tx.frames.len(),
            tx.as_blob
        );
        self.pending.insert(id, tx.clone());
        tx
    }

    /// Returns the frames of a failed transaction to the builder.
    ///
    /// Returns `false` if the transaction was not pending in this channel.
    pub fn tx_failed(&mut self, id: &TxId) -> bool {
        let Some(tx) = self.pending.remove(id) else {
            warn!(target: "channel", "Unknown transaction {id} marked as failed");
            return false;
        };
        trace!(target: "channel", "Marked transaction {id} as failed");
        for frame in tx.frames {
            self.builder.push_frame(frame);
        }
        crate::inc!(BATCH_TXS, &["failed"]);
        true
    }

    /// Records the inclusion of a transaction in `inclusion_block`.
    ///
    /// Returns whether the channel is done, and, if it timed out, the blocks to rebuild into a
    /// new channel.
    pub fn tx_confirmed(&mut self, id: &TxId, inclusion_block: BlockId) -> (bool, Vec<L2Block>) {
        if self.pending.remove(id).is_none() {
            warn!(
                target: "channel",
                "Unknown transaction {id} marked as confirmed in block {inclusion_block}"
            );
            return (false, Vec::new());
        }
        self.confirmed.insert(id.clone(), inclusion_block);
        self.builder.frame_published(inclusion_block.number);
        crate::inc!(BATCH_TXS, &["confirmed"]);

        self.min_inclusion_block = self.min_inclusion_block.min(inclusion_block.number);
        self.max_inclusion_block = self.max_inclusion_block.max(inclusion_block.number);

        if self.is_timed_out() {
            warn!(
                target: "channel",
                "Channel {} timed out, min inclusion block {}, max inclusion block {}",
                hex::encode(self.id()),
                self.min_inclusion_block,
                self.max_inclusion_block
            );
            crate::inc!(CHANNEL_EVENTS, &["timed_out"]);
            return (true, self.builder.take_blocks());
        }
        if self.is_fully_submitted() {
            info!(
                target: "channel",
                "Channel {} fully submitted, min inclusion block {}, max inclusion block {}",
                hex::encode(self.id()),
                self.min_inclusion_block,
                self.max_inclusion_block
            );
            crate::inc!(CHANNEL_EVENTS, &["fully_submitted"]);
            return (true, Vec::new());
        }
        (false, Vec::new())
    }
}

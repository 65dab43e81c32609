//! This module contains the [ChannelBuilder], which turns L2 blocks into the frames of a single
//! channel.

use crate::{
    errors::{ChannelBuilderError, ChannelConfigError, FullReason},
    frame::{random_channel_id, ChannelId, Frame, FRAME_OVERHEAD},
    tx_data::{FrameData, FrameId},
    BatchEncoder, BlockId, ChannelConfig, L2Block,
};
use alloy_primitives::hex;
use kona_compression::Compressor;
use std::{collections::VecDeque, sync::Arc};
use tracing::{debug, trace, warn};

/// Builds a single channel.
///
/// Blocks are encoded into batches and written to a streaming compressor. The compressed output
/// is sliced into frames of at most [ChannelConfig::max_frame_size] bytes, which are queued until
/// the [Channel](crate::Channel) takes them into transactions.
///
/// A channel is full once one of the [FullReason]s occurred. Three of them are L1 block-height
/// timeouts: the max channel duration, the consensus channel timeout counted from the first
/// published frame, and the sequencer window of the oldest L1 origin in the channel. Only the
/// earliest timeout is tracked.
#[derive(Debug)]
pub struct ChannelBuilder {
    cfg: ChannelConfig,
    encoder: Arc<dyn BatchEncoder>,
    id: ChannelId,
    compressor: Compressor,
    /// Blocks added to the channel, retained to rebuild the channel after a timeout.
    blocks: Vec<L2Block>,
    /// Frames that were output but not yet taken into a transaction.
    frames: VecDeque<FrameData>,
    /// The number of the next frame to output.
    next_frame: usize,
    timeout: Option<u64>,
    timeout_reason: Option<FullReason>,
    full: Option<FullReason>,
    closed: bool,
    last_frame_emitted: bool,
    rlp_length: u64,
    output_bytes: u64,
    oldest_l1_origin: BlockId,
    latest_l1_origin: BlockId,
    oldest_l2: BlockId,
    latest_l2: BlockId,
}

impl ChannelBuilder {
    /// Creates a new [ChannelBuilder].
    ///
    /// When the L1 origin of the last closed channel is known, it seeds the max duration timeout.
    pub fn new(
        cfg: ChannelConfig,
        encoder: Arc<dyn BatchEncoder>,
        l1_origin_last_closed: u64,
    ) -> Result<Self, ChannelBuilderError> {
        cfg.check()?;
        if cfg.batch_type != encoder.batch_type() {
            return Err(ChannelConfigError::BatchTypeMismatch {
                config: cfg.batch_type,
                encoder: encoder.batch_type(),
            }
            .into());
        }
        let compressor = Compressor::new(cfg.compressor_config())?;

        let mut builder = Self {
            cfg,
            encoder,
            id: random_channel_id(),
            compressor,
            blocks: Vec::new(),
            frames: VecDeque::new(),
            next_frame: 0,
            timeout: None,
            timeout_reason: None,
            full: None,
            closed: false,
            last_frame_emitted: false,
            rlp_length: 0,
            output_bytes: 0,
            oldest_l1_origin: BlockId::default(),
            latest_l1_origin: BlockId::default(),
            oldest_l2: BlockId::default(),
            latest_l2: BlockId::default(),
        };
        if l1_origin_last_closed > 0 {
            builder.update_duration_timeout(l1_origin_last_closed);
        }
        Ok(builder)
    }

    /// The channel id.
    pub const fn id(&self) -> ChannelId {
        self.id
    }

    /// The channel config.
    pub const fn config(&self) -> &ChannelConfig {
        &self.cfg
    }

    /// The blocks added to the channel.
    pub fn blocks(&self) -> &[L2Block] {
        &self.blocks
    }

    /// Takes the blocks out of the builder.
    pub fn take_blocks(&mut self) -> Vec<L2Block> {
        core::mem::take(&mut self.blocks)
    }

    /// Returns `true` once the channel accepts no more blocks.
    pub const fn is_full(&self) -> bool {
        self.full.is_some()
    }

    /// The reason the channel became full, if it is.
    pub const fn full_reason(&self) -> Option<FullReason> {
        self.full
    }

    /// The earliest L1 block number at which the channel times out.
    pub const fn timeout(&self) -> Option<u64> {
        self.timeout
    }

    /// The reason belonging to [ChannelBuilder::timeout].
    pub const fn timeout_reason(&self) -> Option<FullReason> {
        self.timeout_reason
    }

    /// The RLP bytes of all batches written to the compressor.
    pub const fn input_bytes(&self) -> u64 {
        self.rlp_length
    }

    /// The encoded bytes of all frames output so far.
    pub const fn output_bytes(&self) -> u64 {
        self.output_bytes
    }

    /// The compressed bytes ready to be framed.
    pub fn ready_bytes(&self) -> usize {
        self.compressor.len()
    }

    /// The number of frames output so far.
    pub const fn total_frames(&self) -> usize {
        self.next_frame
    }

    /// The number of frames waiting to be taken into a transaction.
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// The ratio of output bytes to input bytes.
    pub fn compression_ratio(&self) -> f64 {
        if self.rlp_length == 0 {
            return 0.0;
        }
        self.output_bytes as f64 / self.rlp_length as f64
    }

    /// The oldest L1 origin of the blocks in the channel.
    pub const fn oldest_l1_origin(&self) -> BlockId {
        self.oldest_l1_origin
    }

    /// The latest L1 origin of the blocks in the channel.
    pub const fn latest_l1_origin(&self) -> BlockId {
        self.latest_l1_origin
    }

    /// The oldest L2 block in the channel.
    pub const fn oldest_l2(&self) -> BlockId {
        self.oldest_l2
    }

    /// The latest L2 block in the channel.
    pub const fn latest_l2(&self) -> BlockId {
        self.latest_l2
    }

    /// Adds a block to the channel.
    ///
    /// Returns [ChannelBuilderError::Full] if the channel was already full, or if the block
    /// did not fit. In both cases the block was not added. A block that was added but filled
    /// the compressor marks the channel full without returning an error.
    pub fn add_block(&mut self, block: &L2Block) -> Result<(), ChannelBuilderError> {
        if let Some(reason) = self.full {
            return Err(ChannelBuilderError::Full(reason));
        }

        let batch = self.encoder.encode_block(block)?;
        if self.rlp_length + batch.len() as u64 > self.cfg.max_rlp_bytes_per_channel {
            self.set_full(FullReason::MaxRlpBytesExceeded);
            return Err(ChannelBuilderError::Full(FullReason::MaxRlpBytesExceeded));
        }
        if let Err(e) = self.compressor.write(&batch) {
            if e.is_full() {
                self.set_full(FullReason::InputTargetReached);
                return Err(ChannelBuilderError::Full(FullReason::InputTargetReached));
            }
            return Err(e.into());
        }
        self.rlp_length += batch.len() as u64;

        let origin = block.info.l1_origin;
        self.update_sw_timeout(origin.number);
        if origin.number > self.latest_l1_origin.number {
            self.latest_l1_origin = origin;
        }
        if self.oldest_l1_origin.number == 0 || origin.number < self.oldest_l1_origin.number {
            self.oldest_l1_origin = origin;
        }
        let l2 = block.id();
        if l2.number > self.latest_l2.number {
            self.latest_l2 = l2;
        }
        if self.oldest_l2.number == 0 || l2.number < self.oldest_l2.number {
            self.oldest_l2 = l2;
        }
        trace!(
            target: "channel-builder",
            "Added L2 block {} to channel {} ({} batch bytes)",
            block.number(),
            hex::encode(self.id),
            batch.len()
        );
        self.blocks.push(block.clone());

        if self.compressor.is_full() {
            self.set_full(FullReason::InputTargetReached);
        }
        Ok(())
    }

    /// Registers a new L1 head: updates the max duration timeout, then checks all timeouts.
    pub fn register_l1_block(&mut self, l1_number: u64) {
        self.update_duration_timeout(l1_number);
        self.check_timeout(l1_number);
    }

    /// Records the inclusion of a frame in L1 block `l1_number`, starting the consensus channel
    /// timeout.
    pub fn frame_published(&mut self, l1_number: u64) {
        let timeout =
            (l1_number + self.cfg.channel_timeout).saturating_sub(self.cfg.sub_safety_margin);
        self.update_timeout(timeout, FullReason::ChannelTimeoutClose);
    }

    /// Marks the channel full if `l1_number` reached the timeout.
    pub fn check_timeout(&mut self, l1_number: u64) {
        if let (Some(timeout), Some(reason)) = (self.timeout, self.timeout_reason) {
            if l1_number >= timeout {
                self.set_full(reason);
            }
        }
    }

    /// Closes the channel. Its remaining data is output as frames by the next
    /// [ChannelBuilder::output_frames].
    pub fn close(&mut self) {
        self.set_full(FullReason::Terminated);
    }

    /// Outputs frames. A full channel is closed and all its remaining data is output. Otherwise
    /// only full-size frames are output and any remainder stays in the compressor.
    pub fn output_frames(&mut self) -> Result<(), ChannelBuilderError> {
        if self.is_full() {
            return self.close_and_output_all_frames();
        }

        let max_frame_size = self.cfg.max_frame_size as usize;
        while !self.last_frame_emitted && self.compressor.len() + FRAME_OVERHEAD >= max_frame_size
        {
            self.output_frame()?;
        }
        Ok(())
    }

    fn close_and_output_all_frames(&mut self) -> Result<(), ChannelBuilderError> {
        if self.last_frame_emitted {
            return Ok(());
        }
        self.compressor.close()?;
        self.closed = true;
        while !self.last_frame_emitted {
            self.output_frame()?;
        }
        Ok(())
    }

    fn output_frame(&mut self) -> Result<(), ChannelBuilderError> {
        let number =
            u16::try_from(self.next_frame).map_err(|_| ChannelBuilderError::FrameNumberOverflow)?;

        // The max frame number always ends the channel.
        let final_number = number == u16::MAX;
        if final_number && !self.closed {
            self.set_full(FullReason::MaxFrameIndex);
            self.compressor.close()?;
            self.closed = true;
        }

        let max_data = self.cfg.max_frame_size as usize - FRAME_OVERHEAD;
        let ready = self.compressor.len();
        let is_last = final_number || (self.closed && ready <= max_data);
        let mut data = vec![0u8; ready.min(max_data)];
        self.compressor.read(&mut data);
        if final_number && ready > max_data {
            warn!(
                target: "channel-builder",
                "Channel {} reached the max frame index, dropping {} compressed bytes",
                hex::encode(self.id),
                ready - max_data
            );
            self.compressor.reset();
        }

        let frame = Frame { id: self.id, number, data, is_last };
        let encoded = frame.encode();
        self.output_bytes += encoded.len() as u64;
        self.frames.push_back(FrameData {
            data: encoded,
            id: FrameId { channel_id: self.id, number },
        });
        self.next_frame += 1;
        self.last_frame_emitted = is_last;
        Ok(())
    }

    /// Returns `true` if a frame is waiting to be taken into a transaction.
    pub fn has_frame(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Takes the next frame.
    pub fn next_frame(&mut self) -> Option<FrameData> {
        self.frames.pop_front()
    }

    /// Returns a frame to the queue, keeping the queue ordered by frame number.
    pub fn push_frame(&mut self, frame: FrameData) {
        let index = self.frames.partition_point(|f| f.id.number < frame.id.number);
        self.frames.insert(index, frame);
    }

    fn set_full(&mut self, reason: FullReason) {
        if self.full.is_none() {
            debug!(
                target: "channel-builder",
                "Channel {} full: {reason}",
                hex::encode(self.id)
            );
            self.full = Some(reason);
        }
    }

    fn update_duration_timeout(&mut self, l1_number: u64) {
        if self.cfg.max_channel_duration == 0 {
            return;
        }
        let timeout = l1_number + self.cfg.max_channel_duration;
        self.update_timeout(timeout, FullReason::MaxDurationReached);
    }

    fn update_sw_timeout(&mut self, l1_origin: u64) {
        let timeout =
            (l1_origin + self.cfg.seq_window_size).saturating_sub(self.cfg.sub_safety_margin);
        self.update_timeout(timeout, FullReason::SeqWindowClose);
    }

    /// Moves the timeout to `timeout` if that is earlier than the current one.
    fn update_timeout(&mut self, timeout: u64, reason: FullReason) {
        if self.timeout.map_or(true, |current| timeout < current) {
            self.timeout = Some(timeout);
            self.timeout_reason = Some(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_utils::test_l2_blocks, SingleBatchEncoder};
    use kona_compression::{decompress_channel, CompressorKind};
    use proptest::prelude::*;

    fn builder(cfg: ChannelConfig) -> ChannelBuilder {
        ChannelBuilder::new(cfg, Arc::new(SingleBatchEncoder), 0).unwrap()
    }

    fn drain_frames(builder: &mut ChannelBuilder) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = builder.next_frame() {
            let (_, decoded) = Frame::decode(&frame.data).unwrap();
            assert_eq!(decoded.number, frame.id.number);
            frames.push(decoded);
        }
        frames
    }

    #[test]
    fn test_rejects_invalid_config() {
        let cfg = ChannelConfig { max_frame_size: 10, ..Default::default() };
        assert!(matches!(
            ChannelBuilder::new(cfg, Arc::new(SingleBatchEncoder), 0),
            Err(ChannelBuilderError::Config(ChannelConfigError::MaxFrameSizeTooSmall(10)))
        ));

        let cfg = ChannelConfig { batch_type: crate::BatchType::Span, ..Default::default() };
        assert!(matches!(
            ChannelBuilder::new(cfg, Arc::new(SingleBatchEncoder), 0),
            Err(ChannelBuilderError::Config(ChannelConfigError::BatchTypeMismatch { .. }))
        ));
    }

    #[test]
    fn test_single_block_single_frame() {
        let mut builder = builder(ChannelConfig::default());
        let block = test_l2_blocks(1, 10, 2, 100, 0).remove(0);
        builder.add_block(&block).unwrap();
        assert!(!builder.is_full());

        // Nothing ready for a full-size frame yet.
        builder.output_frames().unwrap();
        assert!(!builder.has_frame());

        builder.close();
        builder.output_frames().unwrap();
        assert_eq!(builder.full_reason(), Some(FullReason::Terminated));
        let frames = drain_frames(&mut builder);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_last);
        assert_eq!(frames[0].id, builder.id());
        assert_eq!(builder.output_bytes(), frames[0].size() as u64);

        // A second call does not output anything else.
        builder.output_frames().unwrap();
        assert!(!builder.has_frame());
    }

    #[test]
    fn test_full_after_second_block() {
        let cfg = ChannelConfig {
            max_frame_size: 100_000,
            compressor_kind: CompressorKind::None,
            ..Default::default()
        };
        let mut builder = builder(cfg);
        let mut blocks = test_l2_blocks(3, 10, 1, 80_000, 1).into_iter();

        builder.add_block(&blocks.next().unwrap()).unwrap();
        assert!(!builder.is_full());
        builder.add_block(&blocks.next().unwrap()).unwrap();
        assert_eq!(builder.full_reason(), Some(FullReason::InputTargetReached));
        assert_eq!(builder.blocks().len(), 2);

        // The next block is refused.
        let err = builder.add_block(&blocks.next().unwrap()).unwrap_err();
        assert_eq!(err.full_reason(), Some(FullReason::InputTargetReached));
        assert_eq!(builder.blocks().len(), 2);

        builder.output_frames().unwrap();
        let frames = drain_frames(&mut builder);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].number, 0);
        assert!(!frames[0].is_last);
        assert_eq!(frames[0].size(), 100_000);
        assert_eq!(frames[1].number, 1);
        assert!(frames[1].is_last);

        let payload: Vec<u8> = frames.iter().flat_map(|f| f.data.clone()).collect();
        let decompressed = decompress_channel(&payload, 1_000_000).unwrap();
        assert_eq!(decompressed.len() as u64, builder.input_bytes());
    }

    #[test]
    fn test_max_rlp_bytes_exceeded() {
        let cfg = ChannelConfig { max_rlp_bytes_per_channel: 1_000, ..Default::default() };
        let mut builder = builder(cfg);
        let mut blocks = test_l2_blocks(2, 10, 1, 600, 2).into_iter();

        builder.add_block(&blocks.next().unwrap()).unwrap();
        let err = builder.add_block(&blocks.next().unwrap()).unwrap_err();
        assert_eq!(err.full_reason(), Some(FullReason::MaxRlpBytesExceeded));
        assert_eq!(builder.blocks().len(), 1);
        assert_eq!(builder.full_reason(), Some(FullReason::MaxRlpBytesExceeded));
    }

    #[test]
    fn test_timeouts() {
        let cfg = ChannelConfig {
            seq_window_size: 100,
            sub_safety_margin: 4,
            channel_timeout: 40,
            max_channel_duration: 10,
            ..Default::default()
        };

        // The sequencer window of the oldest origin.
        let mut b = builder(cfg);
        b.add_block(&test_l2_blocks(1, 50, 1, 10, 3).remove(0)).unwrap();
        assert_eq!(b.timeout(), Some(146));
        assert_eq!(b.timeout_reason(), Some(FullReason::SeqWindowClose));

        // The max duration is earlier.
        b.register_l1_block(120);
        assert_eq!(b.timeout(), Some(130));
        assert_eq!(b.timeout_reason(), Some(FullReason::MaxDurationReached));
        b.register_l1_block(125);
        assert_eq!(b.timeout(), Some(130));
        assert!(!b.is_full());

        // A later channel timeout does not move the timeout back.
        b.frame_published(125);
        assert_eq!(b.timeout(), Some(130));
        b.frame_published(80);
        assert_eq!(b.timeout(), Some(116));
        assert_eq!(b.timeout_reason(), Some(FullReason::ChannelTimeoutClose));

        b.register_l1_block(130);
        assert_eq!(b.full_reason(), Some(FullReason::ChannelTimeoutClose));
    }

    #[test]
    fn test_channel_timeout_after_inclusion() {
        let cfg = ChannelConfig {
            seq_window_size: 10_000,
            channel_timeout: 40,
            sub_safety_margin: 4,
            max_channel_duration: 0,
            ..Default::default()
        };
        let mut b = builder(cfg);
        b.add_block(&test_l2_blocks(1, 990, 1, 10, 4).remove(0)).unwrap();
        b.frame_published(1000);
        b.register_l1_block(1035);
        assert!(!b.is_full());
        b.register_l1_block(1037);
        assert_eq!(b.full_reason(), Some(FullReason::ChannelTimeoutClose));
    }

    #[test]
    fn test_duration_seeded_from_last_closed_origin() {
        let cfg = ChannelConfig { max_channel_duration: 5, ..Default::default() };
        let b = ChannelBuilder::new(cfg, Arc::new(SingleBatchEncoder), 100).unwrap();
        assert_eq!(b.timeout(), Some(105));
        assert_eq!(b.timeout_reason(), Some(FullReason::MaxDurationReached));

        let b = ChannelBuilder::new(cfg, Arc::new(SingleBatchEncoder), 0).unwrap();
        assert_eq!(b.timeout(), None);
    }

    #[test]
    fn test_push_frame_restores_order() {
        let cfg = ChannelConfig {
            max_frame_size: 1_000,
            compressor_kind: CompressorKind::None,
            ..Default::default()
        };
        let mut b = builder(cfg);
        // Target is 977 bytes; one 3000 byte block fills it and spans several frames.
        b.add_block(&test_l2_blocks(1, 10, 1, 3_000, 5).remove(0)).unwrap();
        assert!(b.is_full());
        b.output_frames().unwrap();
        assert!(b.pending_frames() >= 4);

        let first = b.next_frame().unwrap();
        let second = b.next_frame().unwrap();
        b.push_frame(second);
        b.push_frame(first);
        let numbers: Vec<u16> = drain_frames(&mut b).iter().map(|f| f.number).collect();
        let expected: Vec<u16> = (0..numbers.len() as u16).collect();
        assert_eq!(numbers, expected);
    }

    fn last_of_frames(builder: &mut ChannelBuilder) -> (usize, Frame) {
        let mut count = 0;
        let mut last = None;
        while let Some(frame) = builder.next_frame() {
            let (_, decoded) = Frame::decode(&frame.data).unwrap();
            assert_eq!(decoded.number as usize, count);
            assert!(last.as_ref().map_or(true, |f: &Frame| !f.is_last));
            count += 1;
            last = Some(decoded);
        }
        (count, last.unwrap())
    }

    #[test]
    fn test_max_frame_index_ends_channel() {
        // One byte of payload per frame, and a block larger than 65536 frames.
        let cfg = ChannelConfig {
            max_frame_size: FRAME_OVERHEAD as u64 + 1,
            target_num_frames: 100_000,
            compressor_kind: CompressorKind::None,
            ..Default::default()
        };
        let mut b = builder(cfg);
        b.add_block(&test_l2_blocks(1, 10, 1, 70_000, 7).remove(0)).unwrap();
        assert!(!b.is_full());

        b.output_frames().unwrap();
        assert_eq!(b.full_reason(), Some(FullReason::MaxFrameIndex));
        assert_eq!(b.total_frames(), u16::MAX as usize + 1);
        let (count, last) = last_of_frames(&mut b);
        assert_eq!(count, u16::MAX as usize + 1);
        assert_eq!(last.number, u16::MAX);
        assert!(last.is_last);

        // Nothing follows the last frame.
        b.output_frames().unwrap();
        assert!(!b.has_frame());
        assert_eq!(b.total_frames(), u16::MAX as usize + 1);
    }

    #[test]
    fn test_max_frame_index_after_full() {
        let cfg = ChannelConfig {
            max_frame_size: FRAME_OVERHEAD as u64 + 1,
            compressor_kind: CompressorKind::None,
            ..Default::default()
        };
        let mut b = builder(cfg);
        // The first block is admitted even though it overfills the one byte target.
        b.add_block(&test_l2_blocks(1, 10, 1, 70_000, 8).remove(0)).unwrap();
        assert_eq!(b.full_reason(), Some(FullReason::InputTargetReached));

        b.output_frames().unwrap();
        let (count, last) = last_of_frames(&mut b);
        assert_eq!(count, u16::MAX as usize + 1);
        assert!(last.is_last);
        assert!(b.output_frames().is_ok());
        assert!(!b.has_frame());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Register(u64),
        Published(u64),
        AddBlock(u64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u64..10_000).prop_map(Op::Register),
            (0u64..10_000).prop_map(Op::Published),
            (1u64..10_000).prop_map(Op::AddBlock),
        ]
    }

    proptest! {
        #[test]
        fn test_timeout_never_increases(
            ops in proptest::collection::vec(op(), 1..32),
            duration in 0u64..100,
        ) {
            let cfg = ChannelConfig {
                max_channel_duration: duration,
                seq_window_size: 200,
                channel_timeout: 50,
                sub_safety_margin: 5,
                ..Default::default()
            };
            let mut b = builder(cfg);
            let mut parent = test_l2_blocks(1, 1, 0, 0, 6).remove(0).info;
            let mut previous = b.timeout();
            for op in ops {
                match op {
                    Op::Register(n) => b.register_l1_block(n),
                    Op::Published(n) => b.frame_published(n),
                    Op::AddBlock(origin) => {
                        let block = crate::test_utils::child_block(&parent, origin, vec![]);
                        parent = block.info;
                        let _ = b.add_block(&block);
                    }
                }
                let current = b.timeout();
                if let Some(prev) = previous {
                    prop_assert!(current.is_some_and(|c| c <= prev));
                }
                previous = current;
            }
        }
    }
}

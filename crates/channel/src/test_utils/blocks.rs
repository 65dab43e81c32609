//! Generators for linked chains of test L2 blocks.

use crate::{BlockId, L2Block, L2BlockRef};
use alloy_primitives::{keccak256, Bytes, B256};
use rand::{rngs::StdRng, RngCore, SeedableRng};

/// Returns an EIP-1559 typed transaction of `len` random bytes.
pub fn random_tx(rng: &mut impl RngCore, len: usize) -> Bytes {
    let mut tx = vec![0u8; len.max(1)];
    rng.fill_bytes(&mut tx);
    tx[0] = 0x02;
    tx.into()
}

/// Builds the child of `parent` with the given L1 origin number and transactions.
pub fn child_block(parent: &L2BlockRef, l1_origin: u64, transactions: Vec<Bytes>) -> L2Block {
    let number = parent.number + 1;
    let mut preimage = parent.hash.to_vec();
    preimage.extend_from_slice(&number.to_be_bytes());
    let info = L2BlockRef {
        hash: keccak256(&preimage),
        number,
        parent_hash: parent.hash,
        timestamp: parent.timestamp + 2,
        l1_origin: BlockId::new(keccak256(l1_origin.to_be_bytes()), l1_origin),
        sequence_number: if parent.l1_origin.number == l1_origin {
            parent.sequence_number + 1
        } else {
            0
        },
    };
    L2Block::new(info, transactions)
}

/// Builds `count` linked L2 blocks on top of a zero-hash genesis. Every block carries
/// `tx_count` random transactions of `tx_len` bytes and has L1 origin `l1_origin`.
pub fn test_l2_blocks(
    count: usize,
    l1_origin: u64,
    tx_count: usize,
    tx_len: usize,
    seed: u64,
) -> Vec<L2Block> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut parent =
        L2BlockRef { hash: B256::ZERO, timestamp: 1_700_000_000, ..Default::default() };
    let mut blocks = Vec::with_capacity(count);
    for _ in 0..count {
        let txs = (0..tx_count).map(|_| random_tx(&mut rng, tx_len)).collect();
        let block = child_block(&parent, l1_origin, txs);
        parent = block.info;
        blocks.push(block);
    }
    blocks
}

use thiserror::Error;

use crate::block::Block;

#[derive(Debug, Error)]
pub enum BlockError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("no pending transactions to confirm")]
    EmptyPending,

    #[error("pending batch of {0} cannot be padded to a power of two")]
    BadBatch(usize),

    #[error("mined block {index} was rejected by the local chain")]
    Rejected { index: u64 },

    #[error("transaction {transaction_index} of block {block_index} not found")]
    TransactionNotFound {
        block_index: usize,
        transaction_index: usize,
    },

    #[error("block error: {0}")]
    Block(#[from] BlockError),

    #[error("merkle error: {0}")]
    Merkle(#[from] ac_merkle::MerkleError),
}

/// A block that failed validation while rebuilding a chain from a remote
/// dump. Carries the block so the caller can run the tamper diagnostic over
/// its transactions.
#[derive(Debug, Error)]
#[error("block {} rejected during chain rebuild", block.index)]
pub struct RejectedBlock {
    pub block: Block,
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("please, set the node's name first")]
    NameUnset,

    #[error("node is already registered")]
    DuplicatePeer,

    #[error("no transactions found for this merkle root")]
    NoMatchingBlock,

    #[error("block error: {0}")]
    Block(#[from] ac_blockchain::BlockError),

    #[error("blockchain error: {0}")]
    Blockchain(#[from] ac_blockchain::BlockchainError),

    #[error("merkle error: {0}")]
    Merkle(#[from] ac_merkle::MerkleError),

    #[error("peer error: {0}")]
    Peer(#[from] ac_peer::PeerError),

    #[error("sync error: {0}")]
    Sync(#[from] ac_sync::SyncError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("tree is empty")]
    Empty,

    #[error("leaf index {index} out of bounds for {leaves} leaves")]
    OutOfBounds { index: usize, leaves: usize },

    #[error("transaction error: {0}")]
    Transaction(#[from] ac_transaction::TransactionError),
}

use thiserror::Error;

use crate::tamper::TamperedTransaction;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("remote node unreachable: {0}")]
    Unreachable(#[from] ac_peer::TransportError),

    #[error("remote chain is malformed: {0}")]
    MalformedChain(String),

    /// The remote chain failed validation during a rebuild. `tampered`
    /// holds every transaction of the rejected block that failed its
    /// Merkle audit; it is empty when no witness peer could be reached or
    /// when the block is broken at the chain-link level rather than in its
    /// transactions.
    #[error("remote chain is tampered ({} transactions failed their merkle audit)", tampered.len())]
    ChainTampered { tampered: Vec<TamperedTransaction> },
}

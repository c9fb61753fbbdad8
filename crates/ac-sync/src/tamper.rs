use ac_blockchain::Block;
use ac_merkle::MerkleProof;
use ac_peer::{Peer, PeerTransport};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A transaction that failed its Merkle audit: the block that carries it
/// commits (through `merkle_root`) to a different leaf than the one this
/// copy hashes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TamperedTransaction {
    /// Canonical JSON of the suspect transaction as received.
    pub transaction: String,

    /// Position of the transaction inside the rejected block.
    pub index: usize,

    /// The Merkle root the audit ran against.
    pub merkle_root: String,
}

/// Audit every transaction of a rejected block against Merkle proofs
/// obtained from `witnesses` (peers other than whoever supplied the chain).
///
/// For each transaction the first witness that answers supplies the audit
/// path; the leaf hash is always computed locally from the received copy,
/// so a tampered transaction cannot be laundered by the peer that altered
/// it. Transactions with no reachable witness are left unclassified.
pub async fn diagnose_block(
    transport: &dyn PeerTransport,
    witnesses: &[Peer],
    block: &Block,
) -> Vec<TamperedTransaction> {
    let Some(merkle_root) = block.merkle_root.as_deref() else {
        // Nothing was committed to, so there is nothing to audit.
        return Vec::new();
    };

    let mut tampered = Vec::new();

    for (index, transaction) in block.transactions.iter().enumerate() {
        let Some(proof) = proof_from_any_witness(transport, witnesses, index, merkle_root).await
        else {
            debug!(index, "no witness reachable, transaction left unclassified");
            continue;
        };

        let Ok(leaf) = transaction.hash() else {
            continue;
        };

        if !proof.verify_hex(&leaf, merkle_root) {
            tampered.push(TamperedTransaction {
                transaction: transaction.canonical().unwrap_or_default(),
                index,
                merkle_root: merkle_root.to_string(),
            });
        }
    }

    tampered
}

async fn proof_from_any_witness(
    transport: &dyn PeerTransport,
    witnesses: &[Peer],
    transaction_index: usize,
    merkle_root: &str,
) -> Option<MerkleProof> {
    for peer in witnesses {
        match transport
            .request_proof(peer, transaction_index, merkle_root)
            .await
        {
            Ok(proof) => return Some(proof),
            Err(error) => {
                warn!(peer = %peer.address, %error, "merkle proof request failed");
            }
        }
    }
    None
}

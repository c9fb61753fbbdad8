use ac_transaction::Transaction;
use sha2::{Digest, Sha256};

use crate::{
    error::MerkleError,
    proof::{MerkleProof, ProofSide, ProofStep},
};

/// A binary Merkle tree built from a slice of [`Transaction`]s.
///
/// Leaf hashes are the SHA-256 digests of each transaction's canonical JSON.
/// Parent hashes are SHA-256 of `left_child || right_child`. When a level
/// has an odd number of nodes the last node is duplicated, so rebuilding
/// over the same transaction list always yields the same root.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// All levels of the tree, `levels[0]` = leaf hashes,
    /// `levels[last]` = single root hash.
    levels: Vec<Vec<[u8; 32]>>,
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut v = left.to_vec();
    v.extend_from_slice(right);
    Sha256::digest(&v).into()
}

impl MerkleTree {
    /// Build a Merkle tree from `transactions`. Returns an error if the
    /// slice is empty or any transaction cannot be hashed.
    pub fn new(transactions: &[Transaction]) -> Result<Self, MerkleError> {
        if transactions.is_empty() {
            return Err(MerkleError::Empty);
        }

        let leaves: Vec<[u8; 32]> = transactions
            .iter()
            .map(|tx| tx.hash().map_err(MerkleError::from))
            .collect::<Result<_, _>>()?;

        Ok(Self::from_leaves(leaves))
    }

    /// Build a tree from pre-hashed leaves.
    pub fn from_leaves(leaves: Vec<[u8; 32]>) -> Self {
        let mut levels: Vec<Vec<[u8; 32]>> = vec![leaves.clone()];
        let mut current = leaves;

        while current.len() > 1 {
            // Duplicate last node when the level has an odd count.
            if current.len() % 2 != 0 {
                let last = *current.last().unwrap();
                current.push(last);
            }

            let parent_level: Vec<[u8; 32]> = current
                .chunks(2)
                .map(|chunk| hash_pair(&chunk[0], &chunk[1]))
                .collect();

            levels.push(parent_level.clone());
            current = parent_level;
        }

        Self { levels }
    }

    /// Number of leaves the tree was built over (before any duplication).
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map(|l| l.len()).unwrap_or(0)
    }

    /// The Merkle root hash. Returns an error if the tree is empty
    /// (shouldn't happen after a successful `new` call, but guarded).
    pub fn root_hash(&self) -> Result<[u8; 32], MerkleError> {
        self.levels
            .last()
            .and_then(|l| l.first())
            .copied()
            .ok_or(MerkleError::Empty)
    }

    /// Hex-encoded root hash.
    pub fn root_hash_hex(&self) -> Result<String, MerkleError> {
        Ok(hex::encode(self.root_hash()?))
    }

    /// Build the audit path for the leaf at `leaf_index`.
    pub fn proof(&self, leaf_index: usize) -> Result<MerkleProof, MerkleError> {
        let leaves = self.leaf_count();
        if leaf_index >= leaves {
            return Err(MerkleError::OutOfBounds {
                index: leaf_index,
                leaves,
            });
        }

        let mut path = Vec::new();
        let mut index = leaf_index;

        for level in &self.levels[..self.levels.len() - 1] {
            // Pad the level to even length, mirroring the build logic.
            let mut padded = level.clone();
            if padded.len() % 2 != 0 {
                let last = *padded.last().unwrap();
                padded.push(last);
            }

            let sibling_index = if index % 2 == 0 { index + 1 } else { index - 1 };
            let position = if index % 2 == 0 {
                ProofSide::Right
            } else {
                ProofSide::Left
            };

            path.push(ProofStep {
                hash: padded[sibling_index],
                position,
            });

            index /= 2;
        }

        Ok(MerkleProof { path })
    }
}

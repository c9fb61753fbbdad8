use ac_merkle::MerkleTree;
use ac_transaction::Transaction;
use chrono::Utc;

use crate::{
    block::Block,
    error::{BlockchainError, RejectedBlock},
    miner,
};

/// Leading zero characters required of every mined block hash.
pub const DEFAULT_DIFFICULTY: usize = 2;

/// The append-only chain of [`Block`]s plus the queue of transactions
/// accepted but not yet mined.
///
/// Invariants maintained by this type:
/// - Always contains at least the genesis block.
/// - Every committed block carries a `hash` that re-hashes from its
///   canonical form and links to the previous block's hash.
/// - A rejected block never mutates the chain.
#[derive(Debug, Clone)]
pub struct Blockchain {
    difficulty: usize,
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Initialise a new chain with only the genesis block.
    pub fn new() -> Self {
        Self::with_difficulty(DEFAULT_DIFFICULTY)
    }

    /// Initialise a chain with a specific proof-of-work difficulty.
    /// Difficulty is fixed for the lifetime of the engine.
    pub fn with_difficulty(difficulty: usize) -> Self {
        Self {
            difficulty,
            blocks: vec![Block::genesis()],
            pending: Vec::new(),
        }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Number of blocks in the chain (including genesis).
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The most recent block.
    pub fn last_block(&self) -> &Block {
        // Safety: always at least one block (genesis).
        self.blocks.last().unwrap()
    }

    /// All blocks in the chain.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Consume the engine, keeping only its blocks.
    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Queue a transaction for the next mined block.
    pub fn add_pending(&mut self, transaction: Transaction) {
        self.pending.push(transaction);
    }

    /// Transactions accepted but not yet mined.
    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Append `block` if `proof` is its valid hash and it links to the
    /// current last block. On success the proof is attached as the block's
    /// hash. A rejected block leaves the chain untouched.
    pub fn add_block(&mut self, mut block: Block, proof: &str) -> bool {
        let Some(previous_hash) = self.last_block().hash.clone() else {
            return false;
        };

        if previous_hash != block.previous_hash {
            return false;
        }

        if !miner::is_valid_proof_of_work(&block, proof, self.difficulty) {
            return false;
        }

        block.hash = Some(proof.to_string());
        self.blocks.push(block);
        true
    }

    /// Mine the pending queue into one new block and append it.
    ///
    /// The Merkle tree wants a power-of-two leaf count: a batch of `n`
    /// transactions is accepted as-is when `n` is a power of two, padded by
    /// duplicating the last transaction when `n + 1` is, and refused
    /// otherwise. The queue is drained on success. Returns the new block's
    /// index.
    pub fn mine_pending(&mut self) -> Result<u64, BlockchainError> {
        if self.pending.is_empty() {
            return Err(BlockchainError::EmptyPending);
        }

        let n = self.pending.len();
        if n.is_power_of_two() {
            // Batch already fits the tree.
        } else if (n + 1).is_power_of_two() {
            let last = self.pending[n - 1].clone();
            self.pending.push(last);
        } else {
            return Err(BlockchainError::BadBatch(n));
        }

        let tree = MerkleTree::new(&self.pending)?;
        let merkle_root = tree.root_hash_hex()?;

        let last = self.last_block();
        let previous_hash = last.compute_hash()?;

        let mut block = Block::new(
            last.index + 1,
            self.pending.clone(),
            now_unix(),
            previous_hash,
            Some(merkle_root),
        );

        let proof = miner::proof_of_work(&mut block, self.difficulty)?;
        let index = block.index;

        if !self.add_block(block, &proof) {
            return Err(BlockchainError::Rejected { index });
        }

        self.pending.clear();
        Ok(index)
    }

    /// Validate a full chain dump without mutating it.
    pub fn check_chain_validity(&self, chain: &[Block]) -> bool {
        check_chain_validity(chain, self.difficulty)
    }

    /// Replace the local chain wholesale. Callers are responsible for
    /// validating the replacement first (see the consensus rule).
    pub fn replace_chain(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
    }

    /// Rebuild a fresh engine from a remote chain dump, re-validating every
    /// block after genesis. The first rejected block aborts the rebuild and
    /// is handed back for diagnosis.
    pub fn rebuild_from(
        blocks: Vec<Block>,
        difficulty: usize,
    ) -> Result<Self, Box<RejectedBlock>> {
        let mut chain = Self::with_difficulty(difficulty);

        for block in blocks {
            // The local genesis stands in for the remote one.
            if block.index == 0 {
                continue;
            }

            let Some(proof) = block.hash.clone() else {
                return Err(Box::new(RejectedBlock { block }));
            };

            if !chain.add_block(block.clone(), &proof) {
                return Err(Box::new(RejectedBlock { block }));
            }
        }

        Ok(chain)
    }

    /// Transactions of the first block whose Merkle root matches `root`.
    pub fn transactions_by_merkle_root(&self, root: &str) -> Option<&[Transaction]> {
        self.blocks
            .iter()
            .find(|block| block.merkle_root.as_deref() == Some(root))
            .map(|block| block.transactions.as_slice())
    }

    /// Overwrite a committed transaction in place. Debug facility backing
    /// the tamper endpoint; this deliberately breaks the chain so the
    /// detection paths can be exercised.
    pub fn tamper_transaction(
        &mut self,
        block_index: usize,
        transaction_index: usize,
        author: String,
        content: String,
    ) -> Result<(), BlockchainError> {
        let transaction = self
            .blocks
            .get_mut(block_index)
            .and_then(|block| block.transactions.get_mut(transaction_index))
            .ok_or(BlockchainError::TransactionNotFound {
                block_index,
                transaction_index,
            })?;

        transaction.author = author;
        transaction.content = content;
        Ok(())
    }
}

/// Validate a chain dump against the stated difficulty:
/// - the first block must be a byte-exact genesis whose stored hash
///   re-hashes from its canonical form;
/// - every later block's stored hash must re-hash from its canonical form,
///   carry the difficulty prefix, and link to the previous stored hash.
///
/// The input is never mutated.
pub fn check_chain_validity(chain: &[Block], difficulty: usize) -> bool {
    let Some(first) = chain.first() else {
        return false;
    };

    if !is_genesis(first) {
        return false;
    }

    let target = "0".repeat(difficulty);
    let mut previous_hash = first.hash.clone().unwrap_or_default();

    for block in &chain[1..] {
        let Some(stored) = block.hash.as_deref() else {
            return false;
        };
        let Ok(computed) = block.compute_hash() else {
            return false;
        };

        if stored != computed || !stored.starts_with(&target) || block.previous_hash != previous_hash
        {
            return false;
        }

        previous_hash = stored.to_string();
    }

    true
}

fn is_genesis(block: &Block) -> bool {
    block.index == 0
        && block.transactions.is_empty()
        && block.timestamp == 0.0
        && block.previous_hash == "0"
        && block.merkle_root.is_none()
        && match (&block.hash, block.compute_hash()) {
            (Some(stored), Ok(computed)) => *stored == computed,
            _ => false,
        }
}

/// Current wall clock as fractional seconds since the epoch.
fn now_unix() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(author: &str, content: &str) -> Transaction {
        Transaction::with_timestamp(author, content, 1.0)
    }

    fn mined_chain(batches: &[usize]) -> Blockchain {
        let mut chain = Blockchain::new();
        for (b, count) in batches.iter().enumerate() {
            for i in 0..*count {
                chain.add_pending(tx(&format!("author-{b}"), &format!("content-{i}")));
            }
            chain.mine_pending().unwrap();
        }
        chain
    }

    #[test]
    fn new_chain_holds_only_genesis() {
        let chain = Blockchain::new();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.last_block().previous_hash, "0");
        assert_eq!(
            chain.last_block().hash.as_deref(),
            Some(chain.last_block().compute_hash().unwrap().as_str())
        );
    }

    #[test]
    fn mine_two_transactions() {
        let mut chain = Blockchain::new();
        chain.add_pending(tx("a", "x"));
        chain.add_pending(tx("b", "y"));

        let index = chain.mine_pending().unwrap();
        assert_eq!(index, 1);
        assert_eq!(chain.len(), 2);

        let block = chain.last_block();
        assert_eq!(block.transactions.len(), 2);
        assert!(block.hash.as_deref().unwrap().starts_with("00"));

        let expected_root = MerkleTree::new(&block.transactions)
            .unwrap()
            .root_hash_hex()
            .unwrap();
        assert_eq!(block.merkle_root.as_deref(), Some(expected_root.as_str()));
        assert!(chain.pending().is_empty());
    }

    #[test]
    fn three_transactions_pad_to_four() {
        let mut chain = Blockchain::new();
        for i in 0..3 {
            chain.add_pending(tx("a", &i.to_string()));
        }

        chain.mine_pending().unwrap();
        let block = chain.last_block();
        assert_eq!(block.transactions.len(), 4);
        assert_eq!(block.transactions[2], block.transactions[3]);
    }

    #[test]
    fn five_transactions_are_a_bad_batch() {
        let mut chain = Blockchain::new();
        for i in 0..5 {
            chain.add_pending(tx("a", &i.to_string()));
        }

        assert!(matches!(
            chain.mine_pending(),
            Err(BlockchainError::BadBatch(5))
        ));
        // The queue is kept so callers can inspect or extend it.
        assert_eq!(chain.pending().len(), 5);
    }

    #[test]
    fn mining_an_empty_queue_fails() {
        let mut chain = Blockchain::new();
        assert!(matches!(
            chain.mine_pending(),
            Err(BlockchainError::EmptyPending)
        ));
    }

    #[test]
    fn rejected_block_leaves_chain_unchanged() {
        let mut chain = Blockchain::new();
        let mut block = Block::new(1, vec![tx("a", "x")], 3.0, "bogus".into(), None);
        let proof = miner::proof_of_work(&mut block, chain.difficulty()).unwrap();

        assert!(!chain.add_block(block, &proof));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn mined_chain_passes_validity_scan() {
        let chain = mined_chain(&[2, 1]);
        assert_eq!(chain.len(), 3);
        assert!(chain.check_chain_validity(chain.blocks()));
    }

    #[test]
    fn every_committed_block_rehashes_and_links() {
        let chain = mined_chain(&[2, 1, 4]);

        for window in chain.blocks().windows(2) {
            let (prev, next) = (&window[0], &window[1]);
            let stored = next.hash.as_deref().unwrap();

            assert_eq!(stored, next.compute_hash().unwrap());
            assert!(stored.starts_with("00"));
            assert_eq!(next.previous_hash, prev.hash.clone().unwrap());
            assert_eq!(next.index, prev.index + 1);
        }
    }

    #[test]
    fn tampered_transaction_fails_validity_scan() {
        let mut chain = mined_chain(&[2]);
        assert!(chain.check_chain_validity(chain.blocks()));

        chain
            .tamper_transaction(1, 0, "mallory".into(), "forged".into())
            .unwrap();
        assert!(!chain.check_chain_validity(chain.blocks()));
    }

    #[test]
    fn validity_scan_does_not_mutate_the_chain() {
        let chain = mined_chain(&[2]);
        let before = chain.blocks().to_vec();
        let _ = chain.check_chain_validity(chain.blocks());
        assert_eq!(chain.blocks(), before.as_slice());
    }

    #[test]
    fn rebuild_accepts_a_valid_dump() {
        let source = mined_chain(&[2, 4]);
        let rebuilt =
            Blockchain::rebuild_from(source.blocks().to_vec(), source.difficulty()).unwrap();
        assert_eq!(rebuilt.len(), source.len());
        assert_eq!(rebuilt.last_block().hash, source.last_block().hash);
    }

    #[test]
    fn rebuild_reports_the_tampered_block() {
        let mut source = mined_chain(&[2, 2]);
        source
            .tamper_transaction(1, 1, "mallory".into(), "forged".into())
            .unwrap();

        let err = Blockchain::rebuild_from(source.blocks().to_vec(), source.difficulty())
            .unwrap_err();
        assert_eq!(err.block.index, 1);
    }

    #[test]
    fn transactions_are_found_by_merkle_root() {
        let chain = mined_chain(&[2]);
        let root = chain.last_block().merkle_root.clone().unwrap();
        assert_eq!(
            chain.transactions_by_merkle_root(&root).unwrap().len(),
            2
        );
        assert!(chain.transactions_by_merkle_root(&"0".repeat(64)).is_none());
    }

    #[test]
    fn foreign_genesis_is_rejected_by_validity_scan() {
        let mut foreign = Block::genesis();
        foreign.timestamp = 5.0;
        let hash = foreign.compute_hash().unwrap();
        foreign.hash = Some(hash);

        assert!(!check_chain_validity(&[foreign], DEFAULT_DIFFICULTY));
    }
}
